use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::{
    catalog::FileCatalog,
    errors::Result,
    models::{FileRecord, NewFileRecord},
};

/// In-process catalog for tests and embedders.
#[derive(Default)]
pub struct MemoryFileCatalog {
    records: Mutex<HashMap<Uuid, FileRecord>>,
}

impl MemoryFileCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl FileCatalog for MemoryFileCatalog {
    async fn create(&self, record: NewFileRecord) -> Result<FileRecord> {
        let created = FileRecord {
            id: Uuid::new_v4(),
            owner_id: record.owner_id,
            key: record.key,
            original_name: record.original_name,
            size_bytes: record.size_bytes,
            content_type: record.content_type,
            provider_id: record.provider_id,
            created_at: Utc::now(),
        };

        self.records
            .lock()
            .unwrap()
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<FileRecord>> {
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<FileRecord>> {
        let mut records: Vec<FileRecord> = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|record| record.owner_id == owner_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.records.lock().unwrap().remove(&id);
        Ok(())
    }
}
