use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{FileRecord, NewFileRecord};

pub mod memory;

pub use memory::MemoryFileCatalog;

/// Durable record of uploaded files: which provider and key hold the bytes.
/// The coordinator writes records only after the bytes exist and removes
/// them only once the bytes are gone or confirmed absent.
#[async_trait]
pub trait FileCatalog: Send + Sync {
    async fn create(&self, record: NewFileRecord) -> Result<FileRecord>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<FileRecord>>;

    /// Newest first.
    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<FileRecord>>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}
