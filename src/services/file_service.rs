use std::sync::Arc;
use tokio::io::AsyncRead;
use uuid::Uuid;

use crate::{
    catalog::FileCatalog,
    errors::{AppError, Result},
    models::{FileRecord, NewFileRecord},
    quota::QuotaLedger,
    storage::StorageOrchestrator,
    utils::file::object_key,
};

/// An open download, handed back to the transport layer. Name, type, and
/// size come from the catalog record; only the bytes come from the backend.
pub struct FileDownload {
    pub stream: Box<dyn AsyncRead + Send + Unpin>,
    pub content_type: String,
    pub size_bytes: i64,
    pub original_name: String,
}

/// The use-case layer over quota, storage, and catalog. Its job is the
/// ordering: a failure at any step must not leave the three disagreeing
/// about what exists.
pub struct FileService {
    orchestrator: StorageOrchestrator,
    catalog: Arc<dyn FileCatalog>,
    quota: QuotaLedger,
}

impl FileService {
    pub fn new(
        orchestrator: StorageOrchestrator,
        catalog: Arc<dyn FileCatalog>,
        quota: QuotaLedger,
    ) -> Self {
        Self {
            orchestrator,
            catalog,
            quota,
        }
    }

    /// Quota gate, then bytes, then metadata, then accounting.
    ///
    /// The capacity check happens before any network transfer is paid for.
    /// Usage is committed last: a crash after the upload leaves an orphaned
    /// object for a reconciliation sweep to find, never a quota charge with
    /// no matching evidence.
    pub async fn upload(
        &self,
        owner_id: Uuid,
        original_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<FileRecord> {
        let size = data.len() as i64;

        if !self.quota.check_capacity(owner_id, size).await? {
            return Err(AppError::QuotaExceeded);
        }

        let key = object_key(owner_id, original_name, content_type);
        let stored = self.orchestrator.put(&key, data, content_type).await?;

        let record = self
            .catalog
            .create(NewFileRecord {
                owner_id,
                key: stored.key,
                original_name: original_name.to_string(),
                size_bytes: stored.size_bytes,
                content_type: content_type.to_string(),
                provider_id: stored.provider_id,
            })
            .await?;

        self.quota.record_usage(owner_id, size).await?;

        tracing::info!(file = %record.id, owner = %owner_id, size, "File uploaded");
        Ok(record)
    }

    pub async fn list_files(&self, owner_id: Uuid) -> Result<Vec<FileRecord>> {
        self.catalog.list_by_owner(owner_id).await
    }

    /// Absent and foreign files answer identically, so existence never
    /// leaks across owners.
    pub async fn file_metadata(&self, id: Uuid, owner_id: Uuid) -> Result<FileRecord> {
        self.owned_record(id, owner_id).await
    }

    pub async fn open_download(&self, id: Uuid, owner_id: Uuid) -> Result<FileDownload> {
        let record = self.owned_record(id, owner_id).await?;
        let download = self
            .orchestrator
            .get(&record.key, &record.provider_id)
            .await?;

        Ok(FileDownload {
            stream: download.stream,
            content_type: record.content_type,
            size_bytes: record.size_bytes,
            original_name: record.original_name,
        })
    }

    /// Storage first: if the backend delete fails, the record stays and the
    /// file still exists. A backend reporting the key already absent counts
    /// as deleted.
    pub async fn delete_file(&self, id: Uuid, owner_id: Uuid) -> Result<bool> {
        let record = self.owned_record(id, owner_id).await?;

        let removed = self
            .orchestrator
            .delete(&record.key, &record.provider_id)
            .await?;
        if !removed {
            tracing::warn!(
                file = %record.id,
                provider = %record.provider_id,
                "Object already absent at provider"
            );
        }

        self.catalog.delete(record.id).await?;
        self.quota.record_usage(owner_id, -record.size_bytes).await?;

        tracing::info!(file = %record.id, owner = %owner_id, "File deleted");
        Ok(true)
    }

    async fn owned_record(&self, id: Uuid, owner_id: Uuid) -> Result<FileRecord> {
        match self.catalog.find_by_id(id).await? {
            Some(record) if record.owner_id == owner_id => Ok(record),
            _ => Err(AppError::NotFound),
        }
    }
}
