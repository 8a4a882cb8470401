use crate::models::{Booking, BookingError, CreateBookingRequest};
use actix_web::{web, HttpResponse, Responder};
use log::{error, info, warn};
use serde::Serialize;
use sqlx::PgPool;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub async fn create_booking(
    pool: web::Data<PgPool>,
    body: web::Json<CreateBookingRequest>,
) -> impl Responder {
    match Booking::create(&pool, body.into_inner()).await {
        Ok(booking) => {
            info!(
                "🎉 Booking {} created for event {} ({} members)",
                booking.code,
                booking.event_id,
                booking.members.0.len()
            );
            HttpResponse::Created().json(booking)
        }
        Err(BookingError::Validation(errors)) => {
            warn!("Booking rejected with {} validation errors", errors.len());
            HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Validation failed",
                "errors": errors,
            }))
        }
        Err(BookingError::EventNotFound) => HttpResponse::NotFound().json(ErrorResponse {
            error: "Event not found".to_string(),
        }),
        Err(BookingError::TierSoldOut) => HttpResponse::Conflict().json(ErrorResponse {
            error: "Not enough seats left in the selected tier".to_string(),
        }),
        Err(e) => {
            error!("Failed to create booking: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to create booking. Please try again.".to_string(),
            })
        }
    }
}

pub async fn get_booking(pool: web::Data<PgPool>, code: web::Path<String>) -> impl Responder {
    match Booking::find_by_code(&pool, &code).await {
        Ok(Some(booking)) => HttpResponse::Ok().json(booking),
        Ok(None) => HttpResponse::NotFound().json(ErrorResponse {
            error: "Booking not found".to_string(),
        }),
        Err(e) => {
            error!("Failed to fetch booking {}: {}", code, e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to fetch booking. Please try again.".to_string(),
            })
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/bookings")
            .route("", web::post().to(create_booking))
            .route("/{code}", web::get().to(get_booking)),
    );
}
