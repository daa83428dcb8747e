use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::{
    errors::{AppError, Result, StorageOp},
    storage::{ObjectDownload, StorageProvider, StoredObject},
};

/// Routes object operations across the configured backends.
///
/// The provider list order is the failover sequence and is fixed at
/// construction. Uploads walk the list sequentially so at most one backend
/// ends up holding the bytes. Downloads start from the provider recorded on
/// the file and fan out from there, since a read from any holder is as good
/// as another. Deletes never fail over: removing a key from a backend other
/// than the recorded one would leave the real object orphaned.
///
/// Availability probes are an optimization, not a guarantee: a provider can
/// go down between the probe and the call, so call failures are caught and
/// treated the same as a negative probe.
pub struct StorageOrchestrator {
    providers: Vec<Arc<dyn StorageProvider>>,
    call_timeout: Duration,
}

impl StorageOrchestrator {
    pub fn new(providers: Vec<Arc<dyn StorageProvider>>, call_timeout: Duration) -> Self {
        Self {
            providers,
            call_timeout,
        }
    }

    /// Store `data` at the first provider that is available and accepts it.
    /// Individual provider faults are logged, never propagated; only
    /// exhausting the whole list is an error.
    pub async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<StoredObject> {
        for provider in &self.providers {
            if !self.probe(provider.as_ref()).await {
                tracing::warn!(provider = provider.id(), key, "Provider unavailable, skipping");
                continue;
            }

            match self.bounded(provider.upload(key, data, content_type)).await {
                Ok(stored) => {
                    tracing::info!(
                        provider = provider.id(),
                        key,
                        size = stored.size_bytes,
                        "Object stored"
                    );
                    return Ok(stored);
                }
                Err(e) => {
                    tracing::warn!(
                        provider = provider.id(),
                        key,
                        error = %e,
                        "Upload failed, trying next provider"
                    );
                }
            }
        }

        Err(AppError::AllProvidersUnavailable(StorageOp::Upload))
    }

    /// Fetch `key`, preferring the provider recorded at upload time and
    /// falling back to every other provider in priority order. Exhaustion
    /// means "temporarily unreachable", not "lost": the object may still
    /// exist at the recorded provider.
    pub async fn get(&self, key: &str, known_provider_id: &str) -> Result<ObjectDownload> {
        let known = self
            .providers
            .iter()
            .filter(|p| p.id() == known_provider_id);
        let rest = self
            .providers
            .iter()
            .filter(|p| p.id() != known_provider_id);

        for provider in known.chain(rest) {
            if !self.probe(provider.as_ref()).await {
                tracing::warn!(provider = provider.id(), key, "Provider unavailable, skipping");
                continue;
            }

            match self.bounded(provider.download(key)).await {
                Ok(download) => return Ok(download),
                Err(e) => {
                    tracing::warn!(
                        provider = provider.id(),
                        key,
                        error = %e,
                        "Download failed, trying next provider"
                    );
                }
            }
        }

        Err(AppError::AllProvidersUnavailable(StorageOp::Download))
    }

    /// Delete `key` from exactly the named provider. No failover here.
    pub async fn delete(&self, key: &str, known_provider_id: &str) -> Result<bool> {
        let provider = self
            .providers
            .iter()
            .find(|p| p.id() == known_provider_id)
            .ok_or_else(|| AppError::UnknownProvider(known_provider_id.to_string()))?;

        self.bounded(provider.delete(key)).await
    }

    async fn probe(&self, provider: &dyn StorageProvider) -> bool {
        timeout(self.call_timeout, provider.is_available())
            .await
            .unwrap_or(false)
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        match timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Backend(format!(
                "Provider call timed out after {:?}",
                self.call_timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryProvider;
    use tokio::io::AsyncReadExt;

    fn orchestrator(
        providers: &[&Arc<MemoryProvider>],
    ) -> StorageOrchestrator {
        let providers = providers
            .iter()
            .map(|p| Arc::clone(p) as Arc<dyn StorageProvider>)
            .collect();
        StorageOrchestrator::new(providers, Duration::from_secs(5))
    }

    async fn read_all(mut download: ObjectDownload) -> Vec<u8> {
        let mut body = Vec::new();
        download.stream.read_to_end(&mut body).await.unwrap();
        body
    }

    #[tokio::test]
    async fn put_uses_first_available_provider() {
        let a = Arc::new(MemoryProvider::new("a"));
        let b = Arc::new(MemoryProvider::new("b"));
        let orch = orchestrator(&[&a, &b]);

        let stored = orch.put("k", b"data", "text/plain").await.unwrap();

        assert_eq!(stored.provider_id, "a");
        assert!(a.contains("k"));
        assert_eq!(b.object_count(), 0);
    }

    #[tokio::test]
    async fn put_skips_unavailable_provider_without_calling_upload() {
        let a = Arc::new(MemoryProvider::new("a"));
        let b = Arc::new(MemoryProvider::new("b"));
        a.set_available(false);
        let orch = orchestrator(&[&a, &b]);

        let stored = orch.put("k", b"data", "text/plain").await.unwrap();

        assert_eq!(stored.provider_id, "b");
        // The skipped provider never saw the upload call.
        assert_eq!(a.object_count(), 0);
        assert!(b.contains("k"));
    }

    #[tokio::test]
    async fn put_fails_over_when_upload_fails_after_positive_probe() {
        let a = Arc::new(MemoryProvider::new("a"));
        let b = Arc::new(MemoryProvider::new("b"));
        a.set_fail_uploads(true);
        let orch = orchestrator(&[&a, &b]);

        let stored = orch.put("k", b"data", "text/plain").await.unwrap();

        assert_eq!(stored.provider_id, "b");
        assert_eq!(a.object_count(), 0);
    }

    #[tokio::test]
    async fn put_fails_when_every_provider_is_down() {
        let a = Arc::new(MemoryProvider::new("a"));
        let b = Arc::new(MemoryProvider::new("b"));
        a.set_available(false);
        b.set_fail_uploads(true);
        let orch = orchestrator(&[&a, &b]);

        let result = orch.put("k", b"data", "text/plain").await;

        assert!(matches!(
            result,
            Err(AppError::AllProvidersUnavailable(StorageOp::Upload))
        ));
        assert_eq!(a.object_count(), 0);
        assert_eq!(b.object_count(), 0);
    }

    #[tokio::test]
    async fn put_times_out_slow_provider_and_moves_on() {
        let a = Arc::new(MemoryProvider::new("a"));
        let b = Arc::new(MemoryProvider::new("b"));
        a.set_latency(Duration::from_secs(60));
        let providers = vec![
            Arc::clone(&a) as Arc<dyn StorageProvider>,
            Arc::clone(&b) as Arc<dyn StorageProvider>,
        ];
        let orch = StorageOrchestrator::new(providers, Duration::from_millis(20));

        let stored = orch.put("k", b"data", "text/plain").await.unwrap();

        assert_eq!(stored.provider_id, "b");
    }

    #[tokio::test]
    async fn get_prefers_the_recorded_provider() {
        let a = Arc::new(MemoryProvider::new("a"));
        let b = Arc::new(MemoryProvider::new("b"));
        a.put_raw("k", b"from-a", "text/plain");
        b.put_raw("k", b"from-b", "text/plain");
        let orch = orchestrator(&[&a, &b]);

        let download = orch.get("k", "b").await.unwrap();

        assert_eq!(read_all(download).await, b"from-b");
    }

    #[tokio::test]
    async fn get_fails_over_to_another_holder() {
        let a = Arc::new(MemoryProvider::new("a"));
        let b = Arc::new(MemoryProvider::new("b"));
        b.put_raw("k", b"replica", "text/plain");
        a.set_available(false);
        let orch = orchestrator(&[&a, &b]);

        let download = orch.get("k", "a").await.unwrap();

        assert_eq!(read_all(download).await, b"replica");
    }

    #[tokio::test]
    async fn get_fails_only_when_no_provider_can_serve() {
        let a = Arc::new(MemoryProvider::new("a"));
        let b = Arc::new(MemoryProvider::new("b"));
        a.put_raw("k", b"data", "text/plain");
        a.set_available(false);
        let orch = orchestrator(&[&a, &b]);

        let result = orch.get("k", "a").await;

        assert!(matches!(
            result,
            Err(AppError::AllProvidersUnavailable(StorageOp::Download))
        ));
    }

    #[tokio::test]
    async fn delete_goes_to_exactly_the_recorded_provider() {
        let a = Arc::new(MemoryProvider::new("a"));
        let b = Arc::new(MemoryProvider::new("b"));
        a.put_raw("k", b"data", "text/plain");
        b.put_raw("k", b"replica", "text/plain");
        let orch = orchestrator(&[&a, &b]);

        assert!(orch.delete("k", "a").await.unwrap());
        assert!(!a.contains("k"));
        // The replica at b is untouched.
        assert!(b.contains("k"));

        // Deleting again reports the key as already absent.
        assert!(!orch.delete("k", "a").await.unwrap());
    }

    #[tokio::test]
    async fn delete_rejects_an_unconfigured_provider() {
        let a = Arc::new(MemoryProvider::new("a"));
        let orch = orchestrator(&[&a]);

        let result = orch.delete("k", "nope").await;

        assert!(matches!(result, Err(AppError::UnknownProvider(id)) if id == "nope"));
    }
}
