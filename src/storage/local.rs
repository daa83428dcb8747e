use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::{
    errors::{AppError, Result},
    storage::{ObjectDownload, StorageProvider, StoredObject},
    utils::file::guess_content_type,
};

/// Filesystem-backed provider. Keys map to paths under a root directory;
/// content types are not persisted and are guessed back from the key.
pub struct LocalFsProvider {
    id: String,
    root: PathBuf,
}

impl LocalFsProvider {
    pub fn new<P: AsRef<Path>>(id: &str, root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        std::fs::create_dir_all(&root)
            .map_err(|e| AppError::Backend(format!("Failed to create storage root: {}", e)))?;

        Ok(Self {
            id: id.to_string(),
            root,
        })
    }

    fn full_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl StorageProvider for LocalFsProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn upload(&self, key: &str, data: &[u8], _content_type: &str) -> Result<StoredObject> {
        let full_path = self.full_path(key);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Backend(format!("Failed to create directory: {}", e)))?;
        }

        fs::write(&full_path, data)
            .await
            .map_err(|e| AppError::Backend(format!("Failed to write object: {}", e)))?;

        Ok(StoredObject {
            provider_id: self.id.clone(),
            key: key.to_string(),
            location: full_path.to_string_lossy().into_owned(),
            size_bytes: data.len() as i64,
        })
    }

    async fn download(&self, key: &str) -> Result<ObjectDownload> {
        let full_path = self.full_path(key);

        let metadata = match fs::metadata(&full_path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::ObjectMissing)
            }
            Err(e) => return Err(AppError::Backend(format!("Failed to stat object: {}", e))),
        };

        let file = fs::File::open(&full_path)
            .await
            .map_err(|e| AppError::Backend(format!("Failed to open object: {}", e)))?;

        Ok(ObjectDownload {
            stream: Box::new(file),
            content_type: guess_content_type(key),
            size_bytes: metadata.len() as i64,
        })
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let full_path = self.full_path(key);

        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AppError::Backend(format!("Failed to delete object: {}", e))),
        }
    }

    async fn is_available(&self) -> bool {
        fs::metadata(&self.root)
            .await
            .map(|metadata| metadata.is_dir())
            .unwrap_or(false)
    }
}
