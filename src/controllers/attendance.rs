use crate::middleware::AuthenticatedStaff;
use crate::models::Attendance;
use crate::services::checkin::{CheckInError, CheckInService, ValidateRequest};
use crate::services::ClientMeta;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub async fn validate_member(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    staff: AuthenticatedStaff,
    body: web::Json<ValidateRequest>,
) -> impl Responder {
    let meta = ClientMeta {
        user_agent: req
            .headers()
            .get(actix_web::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string()),
        ip_address: req
            .connection_info()
            .realip_remote_addr()
            .map(|s| s.to_string()),
    };

    match CheckInService::validate(&pool, &body, &staff.staff_id, meta).await {
        Ok(result) => HttpResponse::Ok().json(serde_json::json!({
            "message": "Checked in",
            "attendance": result,
        })),
        Err(e) => checkin_error_response(e),
    }
}

fn checkin_error_response(e: CheckInError) -> HttpResponse {
    match e {
        // Unknown codes and wrong emails get the same answer, so the endpoint
        // cannot be used to confirm which entry codes exist.
        CheckInError::MemberNotFound | CheckInError::EmailMismatch => {
            HttpResponse::NotFound().json(ErrorResponse {
                error: "No booking found for this entry code and email".to_string(),
            })
        }
        CheckInError::NotPaid => HttpResponse::Conflict().json(ErrorResponse {
            error: "Booking has not been paid for".to_string(),
        }),
        CheckInError::AlreadyCheckedIn => HttpResponse::Conflict().json(ErrorResponse {
            error: "This member has already been checked in".to_string(),
        }),
        e => {
            error!("Check-in failed: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Check-in failed. Please try again.".to_string(),
            })
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AttendanceListQuery {
    pub event_id: Option<Uuid>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

pub async fn list_attendance(
    pool: web::Data<PgPool>,
    staff: AuthenticatedStaff,
    query: web::Query<AttendanceListQuery>,
) -> impl Responder {
    if let Err(e) = staff.require_admin() {
        return HttpResponse::from_error(e);
    }

    match Attendance::list(
        &pool,
        query.event_id,
        query.page.unwrap_or(1),
        query.per_page.unwrap_or(50),
    )
    .await
    {
        Ok((records, total)) => HttpResponse::Ok().json(serde_json::json!({
            "attendance": records,
            "total": total,
        })),
        Err(e) => {
            error!("Failed to list attendance: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to fetch attendance records.".to_string(),
            })
        }
    }
}

pub async fn attendance_stats(
    pool: web::Data<PgPool>,
    staff: AuthenticatedStaff,
) -> impl Responder {
    if let Err(e) = staff.require_admin() {
        return HttpResponse::from_error(e);
    }

    match Attendance::stats_by_event(&pool).await {
        Ok(stats) => HttpResponse::Ok().json(stats),
        Err(e) => {
            error!("Failed to compute attendance stats: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to fetch attendance stats.".to_string(),
            })
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin/attendance")
            .route("/validate", web::post().to(validate_member))
            .route("", web::get().to(list_attendance))
            .route("/stats", web::get().to(attendance_stats)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn unknown_code_and_wrong_email_are_indistinguishable() {
        let not_found = checkin_error_response(CheckInError::MemberNotFound);
        let mismatch = checkin_error_response(CheckInError::EmailMismatch);
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(mismatch.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn unpaid_and_duplicate_checkins_are_conflicts() {
        assert_eq!(
            checkin_error_response(CheckInError::NotPaid).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            checkin_error_response(CheckInError::AlreadyCheckedIn).status(),
            StatusCode::CONFLICT
        );
    }
}
