use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::{
    errors::{AppError, Result},
    storage::{ObjectDownload, StorageProvider, StoredObject},
};

/// In-process provider for tests and embedders. Availability and upload
/// failures can be toggled to exercise the orchestrator's failover paths.
pub struct MemoryProvider {
    id: String,
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
    available: AtomicBool,
    fail_uploads: AtomicBool,
    latency: Mutex<Option<std::time::Duration>>,
}

impl MemoryProvider {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            objects: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            fail_uploads: AtomicBool::new(false),
            latency: Mutex::new(None),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Delay every call by `latency`, for exercising call timeouts.
    pub fn set_latency(&self, latency: std::time::Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    /// Seed an object directly, bypassing the upload path.
    pub fn put_raw(&self, key: &str, data: &[u8], content_type: &str) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (data.to_vec(), content_type.to_string()));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl StorageProvider for MemoryProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> Result<StoredObject> {
        self.simulate_latency().await;

        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(AppError::Backend(format!(
                "Injected upload failure at {}",
                self.id
            )));
        }

        self.put_raw(key, data, content_type);

        Ok(StoredObject {
            provider_id: self.id.clone(),
            key: key.to_string(),
            location: format!("mem://{}/{}", self.id, key),
            size_bytes: data.len() as i64,
        })
    }

    async fn download(&self, key: &str) -> Result<ObjectDownload> {
        self.simulate_latency().await;

        let objects = self.objects.lock().unwrap();
        match objects.get(key) {
            Some((data, content_type)) => Ok(ObjectDownload {
                stream: Box::new(Cursor::new(data.clone())),
                content_type: content_type.clone(),
                size_bytes: data.len() as i64,
            }),
            None => Err(AppError::ObjectMissing),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.simulate_latency().await;
        Ok(self.objects.lock().unwrap().remove(key).is_some())
    }

    async fn is_available(&self) -> bool {
        self.simulate_latency().await;
        self.available.load(Ordering::SeqCst)
    }
}
