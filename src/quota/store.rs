use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{DailyUsageEntry, DailyUsageRow, UserQuotaState};

/// Durable quota state, scoped per user; no cross-user coordination is ever
/// needed. `begin_cycle` must be a single conditional update and
/// `adjust_usage` a single atomic increment; that is what keeps concurrent
/// rollovers and usage writes from losing each other.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    async fn find_state(&self, user_id: Uuid) -> Result<Option<UserQuotaState>>;

    /// Create state for a newly registered user. `resets_at` is None for
    /// states imported without a cycle anchor; the ledger treats those as
    /// immediately due.
    async fn insert_state(
        &self,
        user_id: Uuid,
        username: &str,
        max_bytes: i64,
        resets_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Start a fresh cycle: zero the usage and advance the reset instant,
    /// but only while the stored instant still equals `observed`. Returns
    /// false when another writer rolled the cycle first.
    async fn begin_cycle(
        &self,
        user_id: Uuid,
        observed: Option<DateTime<Utc>>,
        next_reset: DateTime<Utc>,
    ) -> Result<bool>;

    /// Add `delta_bytes` (possibly negative) to the user's cycle usage.
    async fn adjust_usage(&self, user_id: Uuid, delta_bytes: i64) -> Result<()>;

    /// Upsert the per-day ledger entry. The stored value never drops below
    /// zero.
    async fn add_daily_usage(&self, user_id: Uuid, day: NaiveDate, delta_bytes: i64) -> Result<()>;

    async fn find_daily_entry(
        &self,
        user_id: Uuid,
        day: NaiveDate,
    ) -> Result<Option<DailyUsageEntry>>;

    /// All entries for `day`, usernames joined in. Ordering is up to the
    /// caller.
    async fn daily_totals(&self, day: NaiveDate) -> Result<Vec<DailyUsageRow>>;
}
