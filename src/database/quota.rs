use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    errors::{AppError, Result},
    models::{DailyUsageEntry, DailyUsageRow, UserQuotaState},
    quota::store::QuotaStore,
};

/// Postgres-backed quota store. The cycle reset is a single conditional
/// UPDATE and usage deltas are single in-place increments, so concurrent
/// writers for the same user serialize on the row without losing updates.
pub struct PgQuotaStore {
    pool: PgPool,
}

impl PgQuotaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuotaStore for PgQuotaStore {
    async fn find_state(&self, user_id: Uuid) -> Result<Option<UserQuotaState>> {
        let state = sqlx::query_as::<_, UserQuotaState>(
            "SELECT user_id, used_bytes, max_bytes, cycle_resets_at FROM user_quotas WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(state)
    }

    async fn insert_state(
        &self,
        user_id: Uuid,
        username: &str,
        max_bytes: i64,
        resets_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO users (id, username) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING")
            .bind(user_id)
            .bind(username)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO user_quotas (user_id, used_bytes, max_bytes, cycle_resets_at)
            VALUES ($1, 0, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(max_bytes)
        .bind(resets_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn begin_cycle(
        &self,
        user_id: Uuid,
        observed: Option<DateTime<Utc>>,
        next_reset: DateTime<Utc>,
    ) -> Result<bool> {
        // IS NOT DISTINCT FROM makes the precondition hold for NULL anchors
        // as well.
        let result = sqlx::query(
            r#"
            UPDATE user_quotas
            SET used_bytes = 0, cycle_resets_at = $3
            WHERE user_id = $1 AND cycle_resets_at IS NOT DISTINCT FROM $2
            "#,
        )
        .bind(user_id)
        .bind(observed)
        .bind(next_reset)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn adjust_usage(&self, user_id: Uuid, delta_bytes: i64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE user_quotas SET used_bytes = used_bytes + $2 WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(delta_bytes)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::UserNotFound(user_id));
        }
        Ok(())
    }

    async fn add_daily_usage(&self, user_id: Uuid, day: NaiveDate, delta_bytes: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO daily_usage (user_id, day, bytes_used)
            VALUES ($1, $2, GREATEST($3, 0))
            ON CONFLICT (user_id, day)
            DO UPDATE SET bytes_used = GREATEST(daily_usage.bytes_used + $3, 0)
            "#,
        )
        .bind(user_id)
        .bind(day)
        .bind(delta_bytes)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_daily_entry(
        &self,
        user_id: Uuid,
        day: NaiveDate,
    ) -> Result<Option<DailyUsageEntry>> {
        let entry = sqlx::query_as::<_, DailyUsageEntry>(
            "SELECT user_id, day, bytes_used FROM daily_usage WHERE user_id = $1 AND day = $2",
        )
        .bind(user_id)
        .bind(day)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    async fn daily_totals(&self, day: NaiveDate) -> Result<Vec<DailyUsageRow>> {
        let rows = sqlx::query_as::<_, DailyUsageRow>(
            r#"
            SELECT d.user_id, u.username, d.bytes_used
            FROM daily_usage d
            JOIN users u ON u.id = d.user_id
            WHERE d.day = $1
            "#,
        )
        .bind(day)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
