use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

/// One row per gateway order attempt. Failed or cancelled rows are superseded
/// by a fresh order (and a fresh row) on retry; rows are never deleted.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub signature: Option<String>,
    pub amount: i64, // smallest currency unit
    pub currency: String,
    pub status: String, // "pending", "completed", "failed", "cancelled"
    pub method: Option<String>,
    pub failure_reason: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub metadata: Option<Json<serde_json::Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub async fn create(
        pool: &PgPool,
        booking_id: Uuid,
        gateway_order_id: &str,
        amount: i64,
        currency: &str,
    ) -> Result<Self> {
        if amount < 0 {
            anyhow::bail!("Payment amount cannot be negative");
        }

        let now = Utc::now();
        let payment = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO payments (
                id, booking_id, gateway_order_id, amount, currency, status,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(booking_id)
        .bind(gateway_order_id)
        .bind(amount)
        .bind(currency)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(payment)
    }

    pub async fn find_by_order_id(pool: &PgPool, gateway_order_id: &str) -> Result<Option<Self>> {
        let payment =
            sqlx::query_as::<_, Self>("SELECT * FROM payments WHERE gateway_order_id = $1")
                .bind(gateway_order_id)
                .fetch_optional(pool)
                .await?;

        Ok(payment)
    }

    pub async fn find_by_booking(pool: &PgPool, booking_id: Uuid) -> Result<Vec<Self>> {
        let payments = sqlx::query_as::<_, Self>(
            "SELECT * FROM payments WHERE booking_id = $1 ORDER BY created_at DESC",
        )
        .bind(booking_id)
        .fetch_all(pool)
        .await?;

        Ok(payments)
    }

    pub async fn latest_for_booking(pool: &PgPool, booking_id: Uuid) -> Result<Option<Self>> {
        let payment = sqlx::query_as::<_, Self>(
            "SELECT * FROM payments WHERE booking_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(booking_id)
        .fetch_optional(pool)
        .await?;

        Ok(payment)
    }

    /// Record a verified capture: gateway payment id and signature come from
    /// the verification step, never from the client unchecked.
    pub async fn mark_completed(
        &self,
        pool: &PgPool,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<Self> {
        let now = Utc::now();
        // The status guard lives in the statement itself, so two concurrent
        // verifications cannot both record a capture.
        let payment = sqlx::query_as::<_, Self>(
            r#"
            UPDATE payments
            SET status = 'completed', gateway_payment_id = $1, signature = $2,
                completed_at = $3, updated_at = $3
            WHERE id = $4 AND status <> 'completed'
            RETURNING *
            "#,
        )
        .bind(gateway_payment_id)
        .bind(signature)
        .bind(now)
        .bind(self.id)
        .fetch_optional(pool)
        .await?;

        payment.ok_or_else(|| anyhow::anyhow!("Payment has already been completed"))
    }

    pub async fn mark_failed(&self, pool: &PgPool, reason: &str) -> Result<Self> {
        let payment = sqlx::query_as::<_, Self>(
            r#"
            UPDATE payments
            SET status = 'failed', failure_reason = $1, updated_at = $2
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(reason)
        .bind(Utc::now())
        .bind(self.id)
        .fetch_one(pool)
        .await?;

        Ok(payment)
    }
}
