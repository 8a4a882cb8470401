use anyhow::Result;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

/// Append-only audit trail of payment lifecycle transitions. Rows are never
/// mutated and are never used as the source of truth for booking or payment
/// state; they exist for analytics and failure diagnosis.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct TransactionLog {
    pub id: Uuid,
    pub transaction_id: String,
    pub booking_id: Uuid,
    pub event_id: Option<Uuid>,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub gateway_signature: Option<String>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub event_type: String, // "order_created", "payment_attempted", "payment_success", "payment_failed", "payment_refunded"
    pub status: String,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub failure_reason: Option<String>,
    pub gateway_response: Option<Json<serde_json::Value>>,
    pub metadata: Option<Json<serde_json::Value>>,
    pub created_at: DateTime<Utc>,
}

/// Everything a log entry may carry besides its identifiers. Most call sites
/// fill only a few fields.
#[derive(Debug, Default)]
pub struct LogEntry {
    pub event_id: Option<Uuid>,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub gateway_signature: Option<String>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub failure_reason: Option<String>,
    pub gateway_response: Option<serde_json::Value>,
    pub metadata: Option<serde_json::Value>,
}

impl TransactionLog {
    fn generate_transaction_id() -> String {
        const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
        let mut rng = rand::rng();
        let suffix: String = (0..8)
            .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
            .collect();
        format!("TXN-{}-{}", Utc::now().format("%Y%m%d"), suffix)
    }

    pub async fn record(
        pool: &PgPool,
        booking_id: Uuid,
        event_type: &str,
        status: &str,
        entry: LogEntry,
    ) -> Result<Self> {
        let log = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO transaction_logs (
                id, transaction_id, booking_id, event_id, gateway_order_id,
                gateway_payment_id, gateway_signature, amount, currency,
                event_type, status, user_agent, ip_address, error_code,
                error_message, failure_reason, gateway_response, metadata,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18, $19)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(Self::generate_transaction_id())
        .bind(booking_id)
        .bind(entry.event_id)
        .bind(entry.gateway_order_id)
        .bind(entry.gateway_payment_id)
        .bind(entry.gateway_signature)
        .bind(entry.amount)
        .bind(entry.currency)
        .bind(event_type)
        .bind(status)
        .bind(entry.user_agent)
        .bind(entry.ip_address)
        .bind(entry.error_code)
        .bind(entry.error_message)
        .bind(entry.failure_reason)
        .bind(entry.gateway_response.map(Json))
        .bind(entry.metadata.map(Json))
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;

        Ok(log)
    }

    pub async fn find_by_booking(pool: &PgPool, booking_id: Uuid) -> Result<Vec<Self>> {
        let logs = sqlx::query_as::<_, Self>(
            "SELECT * FROM transaction_logs WHERE booking_id = $1 ORDER BY created_at ASC",
        )
        .bind(booking_id)
        .fetch_all(pool)
        .await?;

        Ok(logs)
    }

    pub async fn count_by_type(pool: &PgPool, booking_id: Uuid, event_type: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM transaction_logs WHERE booking_id = $1 AND event_type = $2",
        )
        .bind(booking_id)
        .bind(event_type)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_id_has_expected_shape() {
        let id = TransactionLog::generate_transaction_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "TXN");
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}
