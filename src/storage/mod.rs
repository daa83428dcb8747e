use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::AsyncRead;

use crate::config::{BackendConfig, Config};
use crate::errors::Result;

pub mod local;
pub mod memory;
pub mod orchestrator;
pub mod s3;

pub use orchestrator::StorageOrchestrator;

/// Result of a successful upload to a single backend.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub provider_id: String,
    pub key: String,
    pub location: String,
    pub size_bytes: i64,
}

/// An open download from a single backend.
pub struct ObjectDownload {
    pub stream: Box<dyn AsyncRead + Send + Unpin>,
    pub content_type: String,
    pub size_bytes: i64,
}

/// One remote object-storage backend. Implementations own their client and
/// credential state and are safe for concurrent use across requests; they
/// know nothing about other providers.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// The configured identifier, carried on results and file records.
    fn id(&self) -> &str;

    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> Result<StoredObject>;

    /// Fails with `ObjectMissing` when the key is absent at this backend.
    async fn download(&self, key: &str) -> Result<ObjectDownload>;

    /// Returns false when the key was already absent.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Cheap liveness probe; never errors.
    async fn is_available(&self) -> bool;
}

/// Build the ordered provider list from configuration. The order is the
/// failover sequence.
pub fn create_providers(config: &Config) -> Result<Vec<Arc<dyn StorageProvider>>> {
    let mut providers: Vec<Arc<dyn StorageProvider>> = Vec::with_capacity(config.providers.len());

    for provider in &config.providers {
        match &provider.backend {
            BackendConfig::Local { root } => {
                providers.push(Arc::new(local::LocalFsProvider::new(&provider.id, root)?));
            }
            BackendConfig::S3 {
                bucket,
                region,
                endpoint,
                access_key,
                secret_key,
            } => {
                providers.push(Arc::new(s3::S3Provider::new(
                    &provider.id,
                    bucket,
                    region,
                    endpoint.as_deref(),
                    access_key,
                    secret_key,
                )));
            }
        }
    }

    Ok(providers)
}
