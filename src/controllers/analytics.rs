use crate::middleware::AuthenticatedStaff;
use crate::models::{Booking, BookingListFilter, Payment, TransactionLog};
use crate::services::analytics::{AnalyticsFilter, AnalyticsService};
use actix_web::{web, HttpResponse, Responder};
use log::error;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Paginated booking list together with the revenue aggregates for the same
/// range. The list shows every status combination; only the aggregates apply
/// the confirmed-sale filter.
pub async fn booking_analytics(
    pool: web::Data<PgPool>,
    staff: AuthenticatedStaff,
    query: web::Query<BookingListFilter>,
) -> impl Responder {
    if let Err(e) = staff.require_admin() {
        return HttpResponse::from_error(e);
    }

    let filter = query.into_inner();
    let analytics_filter = AnalyticsFilter {
        from: filter.from,
        to: filter.to,
        event_id: filter.event_id,
    };

    let bookings = Booking::list(&pool, &filter).await;
    let report = AnalyticsService::report(&pool, &analytics_filter).await;

    match (bookings, report) {
        (Ok((bookings, total)), Ok(report)) => HttpResponse::Ok().json(serde_json::json!({
            "bookings": bookings,
            "total": total,
            "analytics": report,
        })),
        (Err(e), _) | (_, Err(e)) => {
            error!("Failed to build booking analytics: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to fetch analytics.".to_string(),
            })
        }
    }
}

/// Full payment trail for one booking: the booking row, every gateway order
/// raised against it and the append-only transaction log, oldest first.
pub async fn booking_transactions(
    pool: web::Data<PgPool>,
    staff: AuthenticatedStaff,
    booking_id: web::Path<Uuid>,
) -> impl Responder {
    if let Err(e) = staff.require_admin() {
        return HttpResponse::from_error(e);
    }

    let booking = match Booking::find_by_id(&pool, *booking_id).await {
        Ok(Some(booking)) => booking,
        Ok(None) => {
            return HttpResponse::NotFound().json(ErrorResponse {
                error: "Booking not found".to_string(),
            })
        }
        Err(e) => {
            error!("Failed to fetch booking {}: {}", booking_id, e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to fetch booking.".to_string(),
            });
        }
    };

    let payments = Payment::find_by_booking(&pool, booking.id).await;
    let logs = TransactionLog::find_by_booking(&pool, booking.id).await;

    match (payments, logs) {
        (Ok(payments), Ok(logs)) => HttpResponse::Ok().json(serde_json::json!({
            "booking": booking,
            "payments": payments,
            "transactions": logs,
        })),
        (Err(e), _) | (_, Err(e)) => {
            error!("Failed to fetch transactions for {}: {}", booking_id, e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to fetch transaction history.".to_string(),
            })
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/analytics")
            .route("/bookings", web::get().to(booking_analytics))
            .route(
                "/transactions/{booking_id}",
                web::get().to(booking_transactions),
            ),
    );
}
