use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// One row per validated (booking member, event) pair. Created exactly once at
/// check-in; the unique index on (member_code, member_email) is what makes the
/// at-most-once guarantee hold under concurrent validators.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attendance {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub booking_code: String,
    pub member_code: String,
    pub member_name: String,
    pub member_email: String,
    pub event_id: Uuid,
    pub event_title: String,
    pub validated_by: String,
    pub validated_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug)]
pub struct NewAttendance {
    pub booking_id: Uuid,
    pub booking_code: String,
    pub member_code: String,
    pub member_name: String,
    pub member_email: String,
    pub event_id: Uuid,
    pub event_title: String,
    pub validated_by: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AttendanceEventStats {
    pub event_id: Uuid,
    pub event_title: String,
    pub checked_in: i64,
}

impl Attendance {
    /// Plain insert; no prior existence check. A concurrent duplicate surfaces
    /// as a unique violation (SQLSTATE 23505) which the caller maps to a
    /// duplicate-check-in error.
    pub async fn create(pool: &PgPool, new: NewAttendance) -> Result<Self, sqlx::Error> {
        let attendance = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO attendance (
                id, booking_id, booking_code, member_code, member_name,
                member_email, event_id, event_title, validated_by,
                validated_at, ip_address, user_agent
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.booking_id)
        .bind(&new.booking_code)
        .bind(&new.member_code)
        .bind(&new.member_name)
        .bind(new.member_email.to_lowercase())
        .bind(new.event_id)
        .bind(&new.event_title)
        .bind(&new.validated_by)
        .bind(Utc::now())
        .bind(&new.ip_address)
        .bind(&new.user_agent)
        .fetch_one(pool)
        .await?;

        Ok(attendance)
    }

    pub async fn list(
        pool: &PgPool,
        event_id: Option<Uuid>,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<Self>, i64)> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);

        let (rows, total) = if let Some(event_id) = event_id {
            let rows = sqlx::query_as::<_, Self>(
                r#"
                SELECT * FROM attendance WHERE event_id = $1
                ORDER BY validated_at DESC LIMIT $2 OFFSET $3
                "#,
            )
            .bind(event_id)
            .bind(per_page)
            .bind((page - 1) * per_page)
            .fetch_all(pool)
            .await?;
            let total: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM attendance WHERE event_id = $1")
                    .bind(event_id)
                    .fetch_one(pool)
                    .await?;
            (rows, total)
        } else {
            let rows = sqlx::query_as::<_, Self>(
                "SELECT * FROM attendance ORDER BY validated_at DESC LIMIT $1 OFFSET $2",
            )
            .bind(per_page)
            .bind((page - 1) * per_page)
            .fetch_all(pool)
            .await?;
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance")
                .fetch_one(pool)
                .await?;
            (rows, total)
        };

        Ok((rows, total))
    }

    pub async fn stats_by_event(pool: &PgPool) -> Result<Vec<AttendanceEventStats>> {
        let stats = sqlx::query_as::<_, AttendanceEventStats>(
            r#"
            SELECT event_id, event_title, COUNT(*) AS checked_in
            FROM attendance
            GROUP BY event_id, event_title
            ORDER BY checked_in DESC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(stats)
    }
}
