use anyhow::Result;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Revenue rows count only settled sales. Both flags are required because a
/// booking can be confirmed without settlement (manual override) or paid
/// without confirmation (cancelled after refund window), and neither is
/// realized revenue.
const CONFIRMED_SALE_SQL: &str = "status = 'confirmed' AND payment_status = 'paid'";

#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub event_id: Option<Uuid>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct RevenueSummary {
    pub total_revenue: BigDecimal,
    pub confirmed_bookings: i64,
    pub total_members: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct PaymentStatusCount {
    pub payment_status: String,
    pub bookings: i64,
    pub total_amount: BigDecimal,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct MonthlyRevenue {
    pub month: DateTime<Utc>,
    pub revenue: BigDecimal,
    pub confirmed_bookings: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct EventRevenue {
    pub event_id: Uuid,
    pub event_title: String,
    pub revenue: BigDecimal,
    pub confirmed_bookings: i64,
    pub total_members: i64,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsReport {
    pub summary: RevenueSummary,
    pub payment_status_breakdown: Vec<PaymentStatusCount>,
    pub monthly_trend: Vec<MonthlyRevenue>,
    pub top_events: Vec<EventRevenue>,
}

pub struct AnalyticsService;

impl AnalyticsService {
    pub async fn report(pool: &PgPool, filter: &AnalyticsFilter) -> Result<AnalyticsReport> {
        let summary = Self::revenue_summary(pool, filter).await?;
        let payment_status_breakdown = Self::payment_status_breakdown(pool, filter).await?;
        let monthly_trend = Self::monthly_trend(pool, filter).await?;
        let top_events = Self::event_ranking(pool, filter).await?;

        Ok(AnalyticsReport {
            summary,
            payment_status_breakdown,
            monthly_trend,
            top_events,
        })
    }

    pub async fn revenue_summary(
        pool: &PgPool,
        filter: &AnalyticsFilter,
    ) -> Result<RevenueSummary> {
        let sql = format!(
            r#"
            SELECT
                COALESCE(SUM(total_amount), 0) AS total_revenue,
                COUNT(*) AS confirmed_bookings,
                COALESCE(SUM(jsonb_array_length(members)), 0)::BIGINT AS total_members
            FROM bookings
            WHERE {CONFIRMED_SALE_SQL}
              AND ($1::timestamptz IS NULL OR created_at >= $1)
              AND ($2::timestamptz IS NULL OR created_at <= $2)
              AND ($3::uuid IS NULL OR event_id = $3)
            "#
        );

        let summary = sqlx::query_as::<_, RevenueSummary>(&sql)
            .bind(filter.from)
            .bind(filter.to)
            .bind(filter.event_id)
            .fetch_one(pool)
            .await?;

        Ok(summary)
    }

    /// Breakdown over all bookings in range, not only settled ones, so the
    /// pending/failed share stays visible next to the revenue numbers.
    pub async fn payment_status_breakdown(
        pool: &PgPool,
        filter: &AnalyticsFilter,
    ) -> Result<Vec<PaymentStatusCount>> {
        let rows = sqlx::query_as::<_, PaymentStatusCount>(
            r#"
            SELECT
                payment_status,
                COUNT(*) AS bookings,
                COALESCE(SUM(total_amount), 0) AS total_amount
            FROM bookings
            WHERE ($1::timestamptz IS NULL OR created_at >= $1)
              AND ($2::timestamptz IS NULL OR created_at <= $2)
              AND ($3::uuid IS NULL OR event_id = $3)
            GROUP BY payment_status
            ORDER BY bookings DESC
            "#,
        )
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.event_id)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    pub async fn monthly_trend(
        pool: &PgPool,
        filter: &AnalyticsFilter,
    ) -> Result<Vec<MonthlyRevenue>> {
        let sql = format!(
            r#"
            SELECT
                date_trunc('month', created_at) AS month,
                COALESCE(SUM(total_amount), 0) AS revenue,
                COUNT(*) AS confirmed_bookings
            FROM bookings
            WHERE {CONFIRMED_SALE_SQL}
              AND created_at >= date_trunc('month', NOW()) - INTERVAL '11 months'
              AND ($1::uuid IS NULL OR event_id = $1)
            GROUP BY month
            ORDER BY month
            "#
        );

        let rows = sqlx::query_as::<_, MonthlyRevenue>(&sql)
            .bind(filter.event_id)
            .fetch_all(pool)
            .await?;

        Ok(rows)
    }

    pub async fn event_ranking(
        pool: &PgPool,
        filter: &AnalyticsFilter,
    ) -> Result<Vec<EventRevenue>> {
        let sql = format!(
            r#"
            SELECT
                event_id,
                event_title,
                COALESCE(SUM(total_amount), 0) AS revenue,
                COUNT(*) AS confirmed_bookings,
                COALESCE(SUM(jsonb_array_length(members)), 0)::BIGINT AS total_members
            FROM bookings
            WHERE {CONFIRMED_SALE_SQL}
              AND ($1::timestamptz IS NULL OR created_at >= $1)
              AND ($2::timestamptz IS NULL OR created_at <= $2)
            GROUP BY event_id, event_title
            ORDER BY revenue DESC
            LIMIT 10
            "#
        );

        let rows = sqlx::query_as::<_, EventRevenue>(&sql)
            .bind(filter.from)
            .bind(filter.to)
            .fetch_all(pool)
            .await?;

        Ok(rows)
    }
}
