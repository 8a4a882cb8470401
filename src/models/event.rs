use anyhow::Result;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FusionXEvent {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub venue: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub base_price: BigDecimal,
    pub current_price: BigDecimal,
    pub price_step: BigDecimal,
    pub price_step_every: i32,
    pub sold_out: bool,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventTier {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub capacity: i32,
    pub booked: i32,
}

impl FusionXEvent {
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let event = sqlx::query_as::<_, Self>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(event)
    }

    /// Recompute `current_price` from seats booked so far. Idempotent; callers
    /// run this before trusting `current_price`.
    pub async fn apply_dynamic_pricing(&self, pool: &PgPool) -> Result<Self> {
        let booked: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(booked), 0) FROM event_tiers WHERE event_id = $1",
        )
        .bind(self.id)
        .fetch_one(pool)
        .await?;

        let steps = if self.price_step_every > 0 {
            booked / self.price_step_every as i64
        } else {
            0
        };
        let price = &self.base_price + &self.price_step * BigDecimal::from(steps);

        let event = sqlx::query_as::<_, Self>(
            "UPDATE events SET current_price = $1, updated_at = $2 WHERE id = $3 RETURNING *",
        )
        .bind(price)
        .bind(Utc::now())
        .bind(self.id)
        .fetch_one(pool)
        .await?;

        Ok(event)
    }

    /// Recompute the `sold_out` flag from remaining tier capacity. Idempotent.
    pub async fn update_sold_out_status(&self, pool: &PgPool) -> Result<Self> {
        let remaining: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(capacity - booked), 0) FROM event_tiers WHERE event_id = $1",
        )
        .bind(self.id)
        .fetch_one(pool)
        .await?;

        let event = sqlx::query_as::<_, Self>(
            "UPDATE events SET sold_out = $1, updated_at = $2 WHERE id = $3 RETURNING *",
        )
        .bind(remaining <= 0)
        .bind(Utc::now())
        .bind(self.id)
        .fetch_one(pool)
        .await?;

        Ok(event)
    }

    /// Reserve `count` seats on a tier with one conditional update. Returns
    /// false when the tier lacks capacity. The availability check and the
    /// decrement are a single atomic statement, so concurrent bookings cannot
    /// oversell the tier.
    pub async fn reserve_tier_capacity(
        pool: &PgPool,
        event_id: Uuid,
        tier_name: &str,
        count: i32,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE event_tiers
            SET booked = booked + $1
            WHERE event_id = $2 AND name = $3 AND booked + $1 <= capacity
            "#,
        )
        .bind(count)
        .bind(event_id)
        .bind(tier_name)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Return previously reserved seats, e.g. when reaping stale bookings.
    pub async fn release_tier_capacity(
        pool: &PgPool,
        event_id: Uuid,
        tier_name: &str,
        count: i32,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE event_tiers
            SET booked = GREATEST(booked - $1, 0)
            WHERE event_id = $2 AND name = $3
            "#,
        )
        .bind(count)
        .bind(event_id)
        .bind(tier_name)
        .execute(pool)
        .await?;

        Ok(())
    }
}
