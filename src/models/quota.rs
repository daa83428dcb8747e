use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Per-user quota state for the current rolling monthly cycle.
///
/// `cycle_resets_at` is None for states that have never been through a
/// rollover check; the ledger treats that as immediately due. Usage can go
/// negative: deletions subtract their full size without clamping so they
/// exactly reverse the matching upload.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserQuotaState {
    pub user_id: Uuid,
    pub used_bytes: i64,
    pub max_bytes: i64,
    pub cycle_resets_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DailyUsageEntry {
    pub user_id: Uuid,
    pub day: NaiveDate,
    pub bytes_used: i64,
}

/// One row of the daily usage report, username joined in from the user store.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DailyUsageRow {
    pub user_id: Uuid,
    pub username: String,
    pub bytes_used: i64,
}
