use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::{
    errors::{AppError, Result},
    models::{DailyUsageEntry, DailyUsageRow, UserQuotaState},
    quota::store::QuotaStore,
};

struct UserEntry {
    username: String,
    state: UserQuotaState,
}

/// In-process quota store for tests and embedders.
#[derive(Default)]
pub struct MemoryQuotaStore {
    users: Mutex<HashMap<Uuid, UserEntry>>,
    daily: Mutex<HashMap<(Uuid, NaiveDate), i64>>,
}

impl MemoryQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuotaStore for MemoryQuotaStore {
    async fn find_state(&self, user_id: Uuid) -> Result<Option<UserQuotaState>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .get(&user_id)
            .map(|entry| entry.state.clone()))
    }

    async fn insert_state(
        &self,
        user_id: Uuid,
        username: &str,
        max_bytes: i64,
        resets_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.users.lock().unwrap().insert(
            user_id,
            UserEntry {
                username: username.to_string(),
                state: UserQuotaState {
                    user_id,
                    used_bytes: 0,
                    max_bytes,
                    cycle_resets_at: resets_at,
                },
            },
        );
        Ok(())
    }

    async fn begin_cycle(
        &self,
        user_id: Uuid,
        observed: Option<DateTime<Utc>>,
        next_reset: DateTime<Utc>,
    ) -> Result<bool> {
        let mut users = self.users.lock().unwrap();
        let entry = match users.get_mut(&user_id) {
            Some(entry) => entry,
            None => return Ok(false),
        };

        if entry.state.cycle_resets_at != observed {
            return Ok(false);
        }

        entry.state.used_bytes = 0;
        entry.state.cycle_resets_at = Some(next_reset);
        Ok(true)
    }

    async fn adjust_usage(&self, user_id: Uuid, delta_bytes: i64) -> Result<()> {
        let mut users = self.users.lock().unwrap();
        let entry = users
            .get_mut(&user_id)
            .ok_or(AppError::UserNotFound(user_id))?;
        entry.state.used_bytes += delta_bytes;
        Ok(())
    }

    async fn add_daily_usage(&self, user_id: Uuid, day: NaiveDate, delta_bytes: i64) -> Result<()> {
        let mut daily = self.daily.lock().unwrap();
        let bytes = daily.entry((user_id, day)).or_insert(0);
        *bytes = (*bytes + delta_bytes).max(0);
        Ok(())
    }

    async fn find_daily_entry(
        &self,
        user_id: Uuid,
        day: NaiveDate,
    ) -> Result<Option<DailyUsageEntry>> {
        Ok(self
            .daily
            .lock()
            .unwrap()
            .get(&(user_id, day))
            .map(|bytes| DailyUsageEntry {
                user_id,
                day,
                bytes_used: *bytes,
            }))
    }

    async fn daily_totals(&self, day: NaiveDate) -> Result<Vec<DailyUsageRow>> {
        let users = self.users.lock().unwrap();
        let daily = self.daily.lock().unwrap();

        Ok(daily
            .iter()
            .filter(|((_, entry_day), _)| *entry_day == day)
            .map(|((user_id, _), bytes)| DailyUsageRow {
                user_id: *user_id,
                username: users
                    .get(user_id)
                    .map(|entry| entry.username.clone())
                    .unwrap_or_default(),
                bytes_used: *bytes,
            })
            .collect())
    }
}
