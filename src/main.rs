use actix_web::{
    http::header,
    middleware::{Compress, DefaultHeaders, Logger},
    web, App, HttpResponse, HttpServer, Responder,
};
use actix_cors::Cors;
use actix_governor::{Governor, GovernorConfigBuilder};
use dotenv::dotenv;
use fusionx_bookings::services::{EmailService, PaymentService};
use fusionx_bookings::{api_info, configure_routes};
use log::{error, info, warn};
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use std::{env, time::Duration};

// Health check endpoint for load balancers and monitoring
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "fusionx-bookings",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

// 404 handler for undefined routes
async fn not_found() -> impl Responder {
    HttpResponse::NotFound().json(json!({
        "error": "Endpoint not found",
        "message": "The requested resource does not exist",
        "available_endpoints": "/api for API documentation"
    }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    info!("Starting FusionX Booking API v{}", env!("CARGO_PKG_VERSION"));

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let server_port = env::var("SERVER_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse::<u16>()
        .expect("SERVER_PORT must be a valid port number");

    validate_environment_variables();

    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&database_url)
        .await
        .expect("Failed to create database pool");

    match sqlx::query("SELECT 1").fetch_one(&db_pool).await {
        Ok(_) => info!("Database connection successful"),
        Err(e) => {
            error!("Database connection failed: {}", e);
            std::process::exit(1);
        }
    }

    info!("Running database migrations...");
    match sqlx::migrate!("./migrations").run(&db_pool).await {
        Ok(_) => info!("Database migrations completed successfully"),
        Err(e) => {
            error!("Database migration failed: {}", e);
            std::process::exit(1);
        }
    }

    let payment_service = match PaymentService::from_env() {
        Ok(service) => service,
        Err(e) => {
            error!("Payment gateway configuration invalid: {}", e);
            std::process::exit(1);
        }
    };

    // Non-fatal: a dead mail relay should show up in the logs at boot, not at
    // the first confirmation email.
    match EmailService::global().await {
        Ok(email) => match email.health_check().await {
            Ok(true) => info!("Email provider is reachable"),
            Ok(false) => warn!("Email provider reported unhealthy; confirmations may fail"),
            Err(e) => warn!("Email provider health check failed: {}", e),
        },
        Err(e) => warn!("Email service not configured: {}", e),
    }

    // Rate limiting: 100 requests per minute per IP with a small burst
    let governor_conf = GovernorConfigBuilder::default()
        .requests_per_minute(100)
        .burst_size(20)
        .finish()
        .unwrap();

    info!("Starting HTTP server on {}:{}", server_host, server_port);
    info!("Health check available at: http://{}:{}/health", server_host, server_port);

    HttpServer::new(move || {
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        // Production reflects only the configured allowlist; everywhere else
        // any origin may call the API. Preflight responses cache for a day.
        let cors = if app_env == "production" {
            let cors_origins = env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "https://fusionx.events".to_string());

            Cors::default()
                .allowed_origin_fn(move |origin, _req_head| {
                    cors_origins
                        .split(',')
                        .any(|allowed| allowed.trim() == origin.to_str().unwrap_or(""))
                })
                .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                .allowed_headers(vec![
                    header::CONTENT_TYPE,
                    header::AUTHORIZATION,
                    header::ACCEPT,
                ])
                .max_age(86400)
                .supports_credentials()
        } else {
            Cors::permissive().max_age(86400)
        };

        App::new()
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(web::Data::new(payment_service.clone()))
            .app_data(
                web::JsonConfig::default()
                    .limit(256 * 1024)
                    .error_handler(|err, _req| {
                        error!("JSON payload error: {}", err);
                        actix_web::error::InternalError::from_response(
                            err,
                            HttpResponse::BadRequest().json(json!({
                                "error": "Invalid JSON payload",
                                "message": "Request body contains invalid JSON or exceeds size limit"
                            })),
                        )
                        .into()
                    }),
            )
            .wrap(cors)
            .wrap(Governor::new(&governor_conf))
            .wrap(Compress::default())
            .wrap(Logger::new(r#"%a "%r" %s %b "%{User-Agent}i" %T"#))
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
                    .add(("Referrer-Policy", "strict-origin-when-cross-origin"))
                    .add((
                        "Strict-Transport-Security",
                        "max-age=31536000; includeSubDomains",
                    )),
            )
            .service(web::scope("/api").configure(configure_routes))
            .route("/health", web::get().to(health_check))
            .route("/api", web::get().to(api_info))
            .default_service(web::route().to(not_found))
    })
    .bind(format!("{}:{}", server_host, server_port))?
    .workers(num_cpus::get())
    .shutdown_timeout(30)
    .run()
    .await
}

// Validate that all required environment variables are set
fn validate_environment_variables() {
    let required_vars = ["DATABASE_URL", "JWT_SECRET", "PAYGATE_KEY_ID", "PAYGATE_KEY_SECRET"];

    let optional_vars = [
        "SERVER_HOST",
        "SERVER_PORT",
        "APP_ENV",
        "CORS_ALLOWED_ORIGINS",
        "PAYGATE_BASE_URL",
        "BOOKING_PENDING_TTL_HOURS",
        "SMTP_HOST",
        "SMTP_PORT",
        "SMTP_USERNAME",
        "SMTP_PASSWORD",
        "SENDGRID_API_KEY",
        "EMAIL_FROM",
        "STORAGE_URL",
        "STORAGE_SERVICE_KEY",
        "STORAGE_BUCKET",
    ];

    let mut missing_required = Vec::new();
    for var in required_vars.iter() {
        if env::var(var).is_err() {
            missing_required.push(*var);
        }
    }

    if !missing_required.is_empty() {
        error!(
            "Missing required environment variables: {}",
            missing_required.join(", ")
        );
        error!("Please set these variables in your .env file or environment");
        std::process::exit(1);
    }

    let mut missing_optional = Vec::new();
    for var in optional_vars.iter() {
        if env::var(var).is_err() {
            missing_optional.push(*var);
        }
    }

    if !missing_optional.is_empty() {
        warn!(
            "Optional environment variables not set: {}",
            missing_optional.join(", ")
        );
        warn!("Some features may not work without these variables");
    }

    if let Ok(jwt_secret) = env::var("JWT_SECRET") {
        if jwt_secret.len() < 32 {
            error!("JWT_SECRET must be at least 32 characters long for security");
            std::process::exit(1);
        }
    }

    info!("Environment validation completed successfully");
}
