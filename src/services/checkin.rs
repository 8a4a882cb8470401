use crate::models::{Attendance, Booking, BookingMember, NewAttendance};
use crate::services::ClientMeta;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckInError {
    #[error("No booking found for this entry code")]
    MemberNotFound,
    #[error("Email does not match the booking record")]
    EmailMismatch,
    #[error("Booking has not been paid for")]
    NotPaid,
    #[error("This member has already been checked in")]
    AlreadyCheckedIn,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub member_code: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub member_code: String,
    pub member_name: String,
    pub booking_code: String,
    pub event_title: String,
    pub validated_at: chrono::DateTime<chrono::Utc>,
}

/// Door validation. At-most-once admission is enforced by the unique index
/// on (member_code, member_email), not by a read-then-write check, so two
/// scanners racing on the same code cannot both succeed.
pub struct CheckInService;

impl CheckInService {
    pub async fn validate(
        pool: &PgPool,
        req: &ValidateRequest,
        validated_by: &str,
        meta: ClientMeta,
    ) -> Result<ValidateResponse, CheckInError> {
        let member_code = req.member_code.trim().to_uppercase();

        let booking = Booking::find_by_member_code(pool, &member_code)
            .await?
            .ok_or(CheckInError::MemberNotFound)?;

        let member = booking
            .members
            .0
            .iter()
            .find(|m| m.member_code.as_deref() == Some(member_code.as_str()))
            .cloned()
            .ok_or(CheckInError::MemberNotFound)?;

        // Members without their own address are admitted against the
        // booking's contact address.
        let expected_email = Self::admission_email(&member, &booking);
        if !req.email.trim().eq_ignore_ascii_case(&expected_email) {
            log::warn!(
                "🚫 Email mismatch on entry code {} (booking {})",
                member_code, booking.code
            );
            return Err(CheckInError::EmailMismatch);
        }

        if !booking.is_confirmed_sale() {
            log::warn!(
                "🚫 Check-in refused for unpaid booking {} (entry code {})",
                booking.code, member_code
            );
            return Err(CheckInError::NotPaid);
        }

        let record = Attendance::create(
            pool,
            NewAttendance {
                booking_id: booking.id,
                booking_code: booking.code.clone(),
                event_id: booking.event_id,
                event_title: booking.event_title.clone(),
                member_code: member_code.clone(),
                member_name: member.name.clone(),
                member_email: expected_email,
                validated_by: validated_by.to_string(),
                ip_address: meta.ip_address,
                user_agent: meta.user_agent,
            },
        )
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                CheckInError::AlreadyCheckedIn
            }
            _ => CheckInError::Db(e),
        })?;

        log::info!(
            "🎟️ {} checked in for booking {} by {}",
            member_code, booking.code, validated_by
        );

        Ok(ValidateResponse {
            member_code: record.member_code,
            member_name: record.member_name,
            booking_code: record.booking_code,
            event_title: record.event_title,
            validated_at: record.validated_at,
        })
    }

    fn admission_email(member: &BookingMember, booking: &Booking) -> String {
        member
            .email
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(&booking.contact_email)
            .trim()
            .to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::Utc;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn booking_with_contact(contact_email: &str) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            code: "AAAAAA".to_string(),
            event_id: Uuid::new_v4(),
            event_title: "Showcase".to_string(),
            selected_date: "2026-09-12".to_string(),
            selected_time: "18:00".to_string(),
            price_tier: "standard".to_string(),
            total_amount: BigDecimal::from(1000),
            members: Json(vec![]),
            contact_name: "Lead".to_string(),
            contact_email: contact_email.to_string(),
            contact_phone: "1234567".to_string(),
            status: "confirmed".to_string(),
            payment_status: "paid".to_string(),
            email_sent: false,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn member_with_email(email: Option<&str>) -> BookingMember {
        BookingMember {
            name: "Guest".to_string(),
            email: email.map(|e| e.to_string()),
            phone: None,
            member_code: Some("AAAAAA-01".to_string()),
        }
    }

    #[test]
    fn member_email_is_preferred_and_normalized() {
        let booking = booking_with_contact("lead@example.com");
        let member = member_with_email(Some("  Guest@Example.COM "));
        assert_eq!(
            CheckInService::admission_email(&member, &booking),
            "guest@example.com"
        );
    }

    #[test]
    fn missing_or_blank_member_email_falls_back_to_contact() {
        let booking = booking_with_contact("Lead@Example.com");
        for member in [member_with_email(None), member_with_email(Some("  "))] {
            assert_eq!(
                CheckInService::admission_email(&member, &booking),
                "lead@example.com"
            );
        }
    }
}
