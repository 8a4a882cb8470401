use crate::middleware::AuthenticatedStaff;
use crate::models::Booking;
use actix_web::{web, HttpResponse, Responder};
use log::{error, info};
use serde::Serialize;
use sqlx::PgPool;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn pending_ttl_hours() -> i64 {
    std::env::var("BOOKING_PENDING_TTL_HOURS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(48)
}

/// Repair endpoint for bookings whose member codes were lost or corrupted by
/// manual edits. Regeneration is deterministic, so running it twice yields
/// the same codes and already-issued tickets stay valid.
pub async fn regenerate_member_codes(
    pool: web::Data<PgPool>,
    staff: AuthenticatedStaff,
    code: web::Path<String>,
) -> impl Responder {
    if let Err(e) = staff.require_admin() {
        return HttpResponse::from_error(e);
    }

    let booking = match Booking::find_by_code(&pool, &code).await {
        Ok(Some(booking)) => booking,
        Ok(None) => {
            return HttpResponse::NotFound().json(ErrorResponse {
                error: "Booking not found".to_string(),
            })
        }
        Err(e) => {
            error!("Failed to fetch booking {}: {}", code, e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to fetch booking.".to_string(),
            });
        }
    };

    match booking.regenerate_member_codes(&pool).await {
        Ok(updated) => {
            info!("🔧 Member codes regenerated for booking {} by {}", code, staff.staff_id);
            HttpResponse::Ok().json(serde_json::json!({
                "message": "Member codes regenerated",
                "booking": updated,
            }))
        }
        Err(e) => {
            error!("Failed to regenerate codes for {}: {}", code, e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to regenerate member codes.".to_string(),
            })
        }
    }
}

/// Cancels pending bookings older than the TTL and returns their seats.
pub async fn reap_stale_bookings(
    pool: web::Data<PgPool>,
    staff: AuthenticatedStaff,
) -> impl Responder {
    if let Err(e) = staff.require_admin() {
        return HttpResponse::from_error(e);
    }

    let ttl_hours = pending_ttl_hours();
    match Booking::reap_stale_pending(&pool, ttl_hours).await {
        Ok(reaped) => {
            info!(
                "🧹 {} stale pending bookings reaped (ttl {}h) by {}",
                reaped, ttl_hours, staff.staff_id
            );
            HttpResponse::Ok().json(serde_json::json!({
                "reaped": reaped,
                "ttl_hours": ttl_hours,
            }))
        }
        Err(e) => {
            error!("Failed to reap stale bookings: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to reap stale bookings.".to_string(),
            })
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin/bookings")
            .route(
                "/{code}/regenerate-codes",
                web::post().to(regenerate_member_codes),
            )
            .route("/reap-stale", web::post().to(reap_stale_bookings)),
    );
}
