use anyhow::Result;
use bigdecimal::{BigDecimal, Signed};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{PgPool, QueryBuilder};
use thiserror::Error;
use uuid::Uuid;

use crate::models::event::FusionXEvent;

const CODE_LENGTH: usize = 6;
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_MAX_ATTEMPTS: u32 = 5;

pub const MIN_MEMBERS: usize = 1;
pub const MAX_MEMBERS: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingMember {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub member_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub code: String,
    pub event_id: Uuid,
    pub event_title: String,
    pub selected_date: String,
    pub selected_time: String,
    pub price_tier: String,
    pub total_amount: BigDecimal,
    pub members: Json<Vec<BookingMember>>,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub status: String,         // "pending", "confirmed", "cancelled", "completed"
    pub payment_status: String, // "pending", "paid", "failed", "refunded"
    pub email_sent: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub event_id: Uuid,
    pub selected_date: String,
    pub selected_time: String,
    pub price_tier: String,
    pub total_amount: BigDecimal,
    pub members: Vec<BookingMember>,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BookingListFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub event_id: Option<Uuid>,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("booking validation failed")]
    Validation(Vec<String>),
    #[error("event not found")]
    EventNotFound,
    #[error("selected tier has no remaining capacity")]
    TierSoldOut,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Derive the check-in code for one member of a booking. Pure function of the
/// booking code and the member's position, so the codes can be regenerated at
/// any time without touching the booking code.
pub fn derive_member_code(booking_code: &str, index: usize, member_count: usize) -> String {
    debug_assert!(index < member_count);
    format!("{}-{:02}", booking_code, index + 1)
}

fn is_valid_email(email: &str) -> bool {
    let mut parts = email.splitn(2, '@');
    match (parts.next(), parts.next()) {
        (Some(local), Some(domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        _ => false,
    }
}

fn is_valid_phone(phone: &str) -> bool {
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    (7..=15).contains(&digits)
        && phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'))
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(CODE_CHARSET[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

impl Booking {
    /// Field-level validation. Returns every problem found, not just the
    /// first, so the caller can surface them per field.
    pub fn validate(req: &CreateBookingRequest) -> Vec<String> {
        let mut errors = Vec::new();

        if req.members.len() < MIN_MEMBERS || req.members.len() > MAX_MEMBERS {
            errors.push(format!(
                "members: a booking must have between {} and {} members, got {}",
                MIN_MEMBERS,
                MAX_MEMBERS,
                req.members.len()
            ));
        }

        for (i, member) in req.members.iter().enumerate() {
            if member.name.trim().is_empty() {
                errors.push(format!("members[{}].name: name is required", i));
            }
            if let Some(email) = member.email.as_deref() {
                if !email.is_empty() && !is_valid_email(email) {
                    errors.push(format!("members[{}].email: invalid email format", i));
                }
            }
            if let Some(phone) = member.phone.as_deref() {
                if !phone.is_empty() && !is_valid_phone(phone) {
                    errors.push(format!("members[{}].phone: invalid phone format", i));
                }
            }
        }

        // duplicate member emails, case-insensitive
        let mut seen: Vec<String> = Vec::new();
        for (i, member) in req.members.iter().enumerate() {
            if let Some(email) = member.email.as_deref() {
                if email.is_empty() {
                    continue;
                }
                let lowered = email.to_lowercase();
                if seen.contains(&lowered) {
                    errors.push(format!(
                        "members[{}].email: duplicate email within booking",
                        i
                    ));
                } else {
                    seen.push(lowered);
                }
            }
        }

        if req.contact_name.trim().is_empty() {
            errors.push("contact_name: contact name is required".to_string());
        }
        if req.contact_email.trim().is_empty() {
            errors.push("contact_email: contact email is required".to_string());
        } else if !is_valid_email(&req.contact_email) {
            errors.push("contact_email: invalid email format".to_string());
        }
        if req.contact_phone.trim().is_empty() {
            errors.push("contact_phone: contact phone is required".to_string());
        } else if !is_valid_phone(&req.contact_phone) {
            errors.push("contact_phone: invalid phone format".to_string());
        }

        if req.total_amount.is_negative() {
            errors.push("total_amount: amount cannot be negative".to_string());
        }

        errors
    }

    /// Generate a unique 6-character booking code. Retries a bounded number of
    /// times against the store, then falls back to a timestamp-derived suffix
    /// to force uniqueness.
    pub async fn generate_code(pool: &PgPool) -> Result<String, sqlx::Error> {
        for _ in 0..CODE_MAX_ATTEMPTS {
            let candidate = Self::random_code();
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM bookings WHERE code = $1)")
                    .bind(&candidate)
                    .fetch_one(pool)
                    .await?;
            if !exists {
                return Ok(candidate);
            }
        }

        let millis = Utc::now().timestamp_millis().unsigned_abs();
        let encoded = to_base36(millis);
        let tail: String = encoded
            .chars()
            .rev()
            .take(CODE_LENGTH)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        Ok(format!("{:0>width$}", tail, width = CODE_LENGTH))
    }

    fn random_code() -> String {
        let mut rng = rand::rng();
        (0..CODE_LENGTH)
            .map(|_| CODE_CHARSET[rng.random_range(0..CODE_CHARSET.len())] as char)
            .collect()
    }

    /// Create a pending/pending booking. Reserves tier capacity atomically
    /// before inserting; no email or payment side effects happen here.
    pub async fn create(pool: &PgPool, req: CreateBookingRequest) -> Result<Self, BookingError> {
        let errors = Self::validate(&req);
        if !errors.is_empty() {
            return Err(BookingError::Validation(errors));
        }

        let event = sqlx::query_as::<_, FusionXEvent>("SELECT * FROM events WHERE id = $1")
            .bind(req.event_id)
            .fetch_optional(pool)
            .await?
            .ok_or(BookingError::EventNotFound)?;

        let member_count = req.members.len() as i32;
        let reserved =
            FusionXEvent::reserve_tier_capacity(pool, event.id, &req.price_tier, member_count)
                .await?;
        if !reserved {
            return Err(BookingError::TierSoldOut);
        }

        let code = match Self::generate_code(pool).await {
            Ok(code) => code,
            Err(e) => {
                let _ =
                    FusionXEvent::release_tier_capacity(pool, event.id, &req.price_tier, member_count)
                        .await;
                return Err(BookingError::Db(e));
            }
        };

        let members: Vec<BookingMember> = req
            .members
            .iter()
            .enumerate()
            .map(|(i, m)| BookingMember {
                name: m.name.trim().to_string(),
                email: m.email.clone(),
                phone: m.phone.clone(),
                member_code: Some(derive_member_code(&code, i, req.members.len())),
            })
            .collect();

        let now = Utc::now();
        let insert = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO bookings (
                id, code, event_id, event_title, selected_date, selected_time,
                price_tier, total_amount, members, contact_name, contact_email,
                contact_phone, status, payment_status, email_sent, notes,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                    'pending', 'pending', FALSE, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&code)
        .bind(event.id)
        .bind(&event.title)
        .bind(&req.selected_date)
        .bind(&req.selected_time)
        .bind(&req.price_tier)
        .bind(&req.total_amount)
        .bind(Json(members))
        .bind(req.contact_name.trim())
        .bind(&req.contact_email)
        .bind(&req.contact_phone)
        .bind(&req.notes)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await;

        match insert {
            Ok(booking) => {
                if let Err(e) = event.update_sold_out_status(pool).await {
                    log::warn!("Failed to refresh sold-out flag for event {}: {}", event.id, e);
                }
                Ok(booking)
            }
            Err(e) => {
                let _ =
                    FusionXEvent::release_tier_capacity(pool, event.id, &req.price_tier, member_count)
                        .await;
                Err(BookingError::Db(e))
            }
        }
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let booking = sqlx::query_as::<_, Self>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(booking)
    }

    pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<Self>> {
        let booking = sqlx::query_as::<_, Self>("SELECT * FROM bookings WHERE code = $1")
            .bind(code.to_uppercase())
            .fetch_optional(pool)
            .await?;

        Ok(booking)
    }

    pub async fn find_by_member_code(pool: &PgPool, member_code: &str) -> Result<Option<Self>> {
        let booking = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM bookings
            WHERE EXISTS (
                SELECT 1 FROM jsonb_array_elements(members) m
                WHERE m->>'member_code' = $1
            )
            "#,
        )
        .bind(member_code.to_uppercase())
        .fetch_optional(pool)
        .await?;

        Ok(booking)
    }

    /// The one predicate revenue and attendance reporting are allowed to use:
    /// a booking only counts as a sale when both axes agree.
    pub fn is_confirmed_sale(&self) -> bool {
        self.status == "confirmed" && self.payment_status == "paid"
    }

    /// Flip the booking to confirmed/paid after a verified payment.
    pub async fn mark_paid_and_confirmed(&self, pool: &PgPool) -> Result<Self> {
        let booking = sqlx::query_as::<_, Self>(
            r#"
            UPDATE bookings
            SET status = 'confirmed', payment_status = 'paid', updated_at = $1
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(Utc::now())
        .bind(self.id)
        .fetch_one(pool)
        .await?;

        Ok(booking)
    }

    pub async fn set_email_sent(&self, pool: &PgPool) -> Result<Self> {
        let booking = sqlx::query_as::<_, Self>(
            "UPDATE bookings SET email_sent = TRUE, updated_at = $1 WHERE id = $2 RETURNING *",
        )
        .bind(Utc::now())
        .bind(self.id)
        .fetch_one(pool)
        .await?;

        Ok(booking)
    }

    /// Admin repair: re-derive every member code from the booking code and
    /// persist the whole members array in one write. The derivation is
    /// deterministic, so running this twice yields byte-identical codes.
    pub async fn regenerate_member_codes(&self, pool: &PgPool) -> Result<Self> {
        let count = self.members.0.len();
        let members: Vec<BookingMember> = self
            .members
            .0
            .iter()
            .enumerate()
            .map(|(i, m)| BookingMember {
                name: m.name.clone(),
                email: m.email.clone(),
                phone: m.phone.clone(),
                member_code: Some(derive_member_code(&self.code, i, count)),
            })
            .collect();

        // full column write; mutating the array element-by-element would not
        // be picked up as a change by the persistence layer
        let booking = sqlx::query_as::<_, Self>(
            "UPDATE bookings SET members = $1, updated_at = $2 WHERE id = $3 RETURNING *",
        )
        .bind(Json(members))
        .bind(Utc::now())
        .bind(self.id)
        .fetch_one(pool)
        .await?;

        Ok(booking)
    }

    /// Filtered, paginated listing for the back office. Raw rows; callers that
    /// need revenue figures must go through the analytics aggregations.
    pub async fn list(pool: &PgPool, filter: &BookingListFilter) -> Result<(Vec<Self>, i64)> {
        let page = filter.page.unwrap_or(1).max(1);
        let per_page = filter.per_page.unwrap_or(20).clamp(1, 100);

        let mut count_qb: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM bookings WHERE 1=1");
        let mut list_qb: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("SELECT * FROM bookings WHERE 1=1");

        for qb in [&mut count_qb, &mut list_qb] {
            if let Some(from) = filter.from {
                qb.push(" AND created_at >= ").push_bind(from);
            }
            if let Some(to) = filter.to {
                qb.push(" AND created_at <= ").push_bind(to);
            }
            if let Some(event_id) = filter.event_id {
                qb.push(" AND event_id = ").push_bind(event_id);
            }
            if let Some(status) = &filter.status {
                qb.push(" AND status = ").push_bind(status.clone());
            }
            if let Some(payment_status) = &filter.payment_status {
                qb.push(" AND payment_status = ").push_bind(payment_status.clone());
            }
        }

        let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

        list_qb
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(per_page)
            .push(" OFFSET ")
            .push_bind((page - 1) * per_page);

        let bookings = list_qb.build_query_as::<Self>().fetch_all(pool).await?;

        Ok((bookings, total))
    }

    /// Cancel pending/pending bookings older than `ttl_hours` and return their
    /// reserved seats. Invoked from the admin surface; there is no background
    /// scheduler for this.
    pub async fn reap_stale_pending(pool: &PgPool, ttl_hours: i64) -> Result<u64> {
        let cutoff = Utc::now() - Duration::hours(ttl_hours);
        let stale = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM bookings
            WHERE status = 'pending' AND payment_status = 'pending' AND created_at < $1
            "#,
        )
        .bind(cutoff)
        .fetch_all(pool)
        .await?;

        let mut reaped = 0u64;
        for booking in stale {
            let updated = sqlx::query(
                r#"
                UPDATE bookings
                SET status = 'cancelled', updated_at = $1
                WHERE id = $2 AND status = 'pending' AND payment_status = 'pending'
                "#,
            )
            .bind(Utc::now())
            .bind(booking.id)
            .execute(pool)
            .await?;

            if updated.rows_affected() > 0 {
                FusionXEvent::release_tier_capacity(
                    pool,
                    booking.event_id,
                    &booking.price_tier,
                    booking.members.0.len() as i32,
                )
                .await?;
                reaped += 1;
            }
        }

        Ok(reaped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn member(name: &str, email: Option<&str>) -> BookingMember {
        BookingMember {
            name: name.to_string(),
            email: email.map(|e| e.to_string()),
            phone: None,
            member_code: None,
        }
    }

    fn request_with_members(members: Vec<BookingMember>) -> CreateBookingRequest {
        CreateBookingRequest {
            event_id: Uuid::new_v4(),
            selected_date: "2026-09-12".to_string(),
            selected_time: "18:00".to_string(),
            price_tier: "standard".to_string(),
            total_amount: BigDecimal::from_str("2000").unwrap(),
            members,
            contact_name: "Asha Nair".to_string(),
            contact_email: "asha@example.com".to_string(),
            contact_phone: "+91 98765 43210".to_string(),
            notes: None,
        }
    }

    mod validation {
        use super::*;

        #[test]
        fn accepts_boundary_member_counts() {
            for count in [1usize, 5] {
                let members = (0..count)
                    .map(|i| member(&format!("Member {}", i), None))
                    .collect();
                let errors = Booking::validate(&request_with_members(members));
                assert!(errors.is_empty(), "count {} should pass: {:?}", count, errors);
            }
        }

        #[test]
        fn rejects_member_counts_outside_range() {
            for count in [0usize, 6] {
                let members = (0..count)
                    .map(|i| member(&format!("Member {}", i), None))
                    .collect();
                let errors = Booking::validate(&request_with_members(members));
                assert!(
                    errors.iter().any(|e| e.starts_with("members:")),
                    "count {} should fail",
                    count
                );
            }
        }

        #[test]
        fn rejects_duplicate_member_emails_case_insensitively() {
            let members = vec![
                member("One", Some("dup@example.com")),
                member("Two", Some("DUP@Example.COM")),
            ];
            let errors = Booking::validate(&request_with_members(members));
            assert!(errors.iter().any(|e| e.contains("duplicate email")));
        }

        #[test]
        fn allows_distinct_member_emails() {
            let members = vec![
                member("One", Some("one@example.com")),
                member("Two", Some("two@example.com")),
            ];
            let errors = Booking::validate(&request_with_members(members));
            assert!(errors.is_empty(), "{:?}", errors);
        }

        #[test]
        fn rejects_malformed_member_email() {
            let members = vec![member("One", Some("not-an-email"))];
            let errors = Booking::validate(&request_with_members(members));
            assert!(errors.iter().any(|e| e.contains("members[0].email")));
        }

        #[test]
        fn rejects_missing_member_name() {
            let members = vec![member("  ", None)];
            let errors = Booking::validate(&request_with_members(members));
            assert!(errors.iter().any(|e| e.contains("members[0].name")));
        }

        #[test]
        fn rejects_negative_total_amount() {
            let mut req = request_with_members(vec![member("One", None)]);
            req.total_amount = BigDecimal::from_str("-1").unwrap();
            let errors = Booking::validate(&req);
            assert!(errors.iter().any(|e| e.starts_with("total_amount:")));
        }

        #[test]
        fn rejects_missing_contact_fields() {
            let mut req = request_with_members(vec![member("One", None)]);
            req.contact_name = String::new();
            req.contact_email = String::new();
            req.contact_phone = String::new();
            let errors = Booking::validate(&req);
            assert_eq!(
                errors
                    .iter()
                    .filter(|e| e.starts_with("contact_"))
                    .count(),
                3
            );
        }
    }

    mod codes {
        use super::*;

        #[test]
        fn random_code_matches_required_format() {
            for _ in 0..100 {
                let code = Booking::random_code();
                assert_eq!(code.len(), 6);
                assert!(code
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
            }
        }

        #[test]
        fn member_code_derivation_is_deterministic() {
            let first = derive_member_code("GF8X2K", 0, 3);
            let again = derive_member_code("GF8X2K", 0, 3);
            assert_eq!(first, again);
            assert_eq!(first, "GF8X2K-01");
            assert_eq!(derive_member_code("GF8X2K", 2, 3), "GF8X2K-03");
        }

        #[test]
        fn timestamp_fallback_stays_in_charset() {
            let encoded = to_base36(Utc::now().timestamp_millis().unsigned_abs());
            assert!(encoded
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    mod confirmed_sale {
        use super::*;

        fn booking_with(status: &str, payment_status: &str) -> Booking {
            Booking {
                id: Uuid::new_v4(),
                code: "AAAAAA".to_string(),
                event_id: Uuid::new_v4(),
                event_title: "Showcase".to_string(),
                selected_date: "2026-09-12".to_string(),
                selected_time: "18:00".to_string(),
                price_tier: "standard".to_string(),
                total_amount: BigDecimal::from(1000),
                members: Json(vec![member("One", None)]),
                contact_name: "C".to_string(),
                contact_email: "c@example.com".to_string(),
                contact_phone: "1234567".to_string(),
                status: status.to_string(),
                payment_status: payment_status.to_string(),
                email_sent: false,
                notes: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }
        }

        #[test]
        fn only_confirmed_and_paid_counts_as_sale() {
            for status in ["pending", "confirmed", "cancelled", "completed"] {
                for payment in ["pending", "paid", "failed", "refunded"] {
                    let expected = status == "confirmed" && payment == "paid";
                    assert_eq!(
                        booking_with(status, payment).is_confirmed_sale(),
                        expected,
                        "{}/{}",
                        status,
                        payment
                    );
                }
            }
        }
    }
}
