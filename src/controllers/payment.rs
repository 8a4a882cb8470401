use crate::services::payments::{
    CreateOrderRequest, PaymentError, PaymentService, VerifyPaymentRequest,
};
use crate::services::ClientMeta;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn client_meta(req: &HttpRequest) -> ClientMeta {
    ClientMeta {
        user_agent: req
            .headers()
            .get(actix_web::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string()),
        ip_address: req
            .connection_info()
            .realip_remote_addr()
            .map(|s| s.to_string()),
    }
}

fn payment_error_response(context: &str, e: PaymentError) -> HttpResponse {
    match e {
        PaymentError::BookingNotFound => HttpResponse::NotFound().json(ErrorResponse {
            error: "Booking not found".to_string(),
        }),
        PaymentError::PaymentNotFound => HttpResponse::NotFound().json(ErrorResponse {
            error: "No payment order found".to_string(),
        }),
        PaymentError::AlreadyPaid => HttpResponse::Conflict().json(ErrorResponse {
            error: "Booking has already been paid for".to_string(),
        }),
        PaymentError::InvalidAmount(_) => HttpResponse::BadRequest().json(ErrorResponse {
            error: "Booking amount is not chargeable".to_string(),
        }),
        PaymentError::SignatureMismatch => HttpResponse::BadRequest().json(ErrorResponse {
            error: "Payment verification failed".to_string(),
        }),
        PaymentError::Gateway(e) => {
            error!("{}: gateway error: {}", context, e);
            HttpResponse::BadGateway().json(ErrorResponse {
                error: "Payment gateway is unavailable. Please try again.".to_string(),
            })
        }
        e => {
            error!("{}: {}", context, e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Something went wrong. Please try again.".to_string(),
            })
        }
    }
}

pub async fn create_order(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    payments: web::Data<PaymentService>,
    body: web::Json<CreateOrderRequest>,
) -> impl Responder {
    let meta = client_meta(&req);
    match payments
        .create_order(&pool, &body.booking_code, meta)
        .await
    {
        Ok(order) => HttpResponse::Created().json(order),
        Err(e) => payment_error_response("Failed to create payment order", e),
    }
}

pub async fn verify_payment(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    payments: web::Data<PaymentService>,
    body: web::Json<VerifyPaymentRequest>,
) -> impl Responder {
    let meta = client_meta(&req);
    match payments.verify_payment(&pool, &body, meta).await {
        Ok(booking) => HttpResponse::Ok().json(serde_json::json!({
            "message": "Payment verified",
            "booking": booking,
        })),
        Err(e) => payment_error_response("Payment verification error", e),
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub booking_code: Option<String>,
    pub order_id: Option<String>,
}

pub async fn payment_status(
    pool: web::Data<PgPool>,
    payments: web::Data<PaymentService>,
    query: web::Query<StatusQuery>,
) -> impl Responder {
    let result = match (&query.booking_code, &query.order_id) {
        (Some(code), _) => payments.get_status(&pool, code).await,
        (None, Some(order_id)) => payments.get_status_by_order(&pool, order_id).await,
        (None, None) => {
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: "Provide booking_code or order_id".to_string(),
            })
        }
    };

    match result {
        Ok(status) => HttpResponse::Ok().json(status),
        Err(e) => payment_error_response("Failed to fetch payment status", e),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payments")
            .route("/order", web::post().to(create_order))
            .route("/verify", web::post().to(verify_payment))
            .route("/status", web::get().to(payment_status)),
    );
}
