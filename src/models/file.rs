use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Durable metadata for one uploaded file. The `(provider_id, key)` pair
/// names the single backend object holding the bytes; a record only exists
/// while that object does.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub key: String,
    pub original_name: String,
    pub size_bytes: i64,
    pub content_type: String,
    pub provider_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub owner_id: Uuid,
    pub key: String,
    pub original_name: String,
    pub size_bytes: i64,
    pub content_type: String,
    pub provider_id: String,
}
