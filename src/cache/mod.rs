//! TTL-aware caching.
//!
//! [`TtlCache`] is the storage seam (in-memory or Redis). [`Cache`] is the
//! typed facade handlers use: JSON values, namespaced [`CacheKey`]s, named
//! [`Ttl`]s, and a background writer so cache fills never block a response.

pub mod entry;
mod macros;
pub mod memory;

use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::AppResult;

pub use entry::{CacheEntry, Ttl};
pub use memory::MemoryCache;

/// Raw string storage with optional per-key expiry
#[async_trait]
pub trait TtlCache: Send + Sync {
    /// Returns the value unless it is missing or stale
    async fn get_raw(&self, key: &str) -> AppResult<Option<String>>;

    /// Stores a value; `None` never expires, `Some(0)` is rejected
    async fn put_raw(&self, key: &str, value: String, ttl_seconds: Option<u64>) -> AppResult<()>;

    /// Removes the entry whether or not it has expired
    async fn invalidate(&self, key: &str) -> AppResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Profile(Uuid),
    Recommendations(i64),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Profile(user_id) => write!(f, "profile:{}", user_id),
            CacheKey::Recommendations(mal_id) => write!(f, "recs:{}", mal_id),
        }
    }
}

/// Message for asynchronous cache writes
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: Option<u64>,
}

/// Typed cache handle shared by services
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn TtlCache>,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl CacheWriterHandle {
    /// Signals the writer and waits until every queued write has been flushed
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cache writer task panicked");
        }
    }
}

impl Cache {
    /// Creates a cache over `store` and spawns its background writer
    pub fn new(store: Arc<dyn TtlCache>) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let writer_store = store.clone();
        let task = tokio::spawn(async move {
            Self::cache_writer_task(writer_store, write_rx, shutdown_rx).await;
        });

        (
            Self { store, write_tx },
            CacheWriterHandle { shutdown_tx, task },
        )
    }

    /// Background task that drains write messages, flushing the rest on shutdown
    async fn cache_writer_task(
        store: Arc<dyn TtlCache>,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Cache writer task started");

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    if let Err(e) = store.put_raw(&msg.key, msg.value, msg.ttl).await {
                        tracing::error!(error = %e, key = %msg.key, "Failed to write cache entry");
                    }
                }
                _ = shutdown_rx.recv() => {
                    write_rx.close();
                    let mut flushed = 0usize;
                    while let Some(msg) = write_rx.recv().await {
                        if let Err(e) = store.put_raw(&msg.key, msg.value, msg.ttl).await {
                            tracing::error!(error = %e, "Failed to flush cache write during shutdown");
                        }
                        flushed += 1;
                    }
                    tracing::info!(flushed, "Cache writer task stopped");
                    break;
                }
            }
        }
    }

    /// Retrieves and deserializes a value; stale or missing entries are `None`
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        match self.store.get_raw(&key.to_string()).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Stores a value and waits for the write to land
    pub async fn put<T: serde::Serialize>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Option<Ttl>,
    ) -> AppResult<()> {
        let json = serde_json::to_string(value)?;
        self.store
            .put_raw(&key.to_string(), json, ttl.map(Ttl::as_secs))
            .await
    }

    /// Removes a cached value
    pub async fn invalidate(&self, key: &CacheKey) -> AppResult<()> {
        self.store.invalidate(&key.to_string()).await?;
        tracing::debug!(key = %key, "Cache entry invalidated");
        Ok(())
    }

    /// Queues a write for the background task and returns immediately.
    ///
    /// Failures are logged, never surfaced to the caller.
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: Ttl) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let msg = CacheWriteMessage {
            key: key.to_string(),
            value: json,
            ttl: Some(ttl.as_secs()),
        };

        if let Err(e) = self.write_tx.send(msg) {
            tracing::error!(error = %e, "Failed to send cache write message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Duration;

    fn memory_cache() -> (Cache, CacheWriterHandle, Arc<MemoryCache>) {
        let store = Arc::new(MemoryCache::new());
        let (cache, handle) = Cache::new(store.clone());
        (cache, handle, store)
    }

    #[test]
    fn test_cache_key_display_profile() {
        let id = Uuid::nil();
        assert_eq!(
            CacheKey::Profile(id).to_string(),
            "profile:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_cache_key_display_recommendations() {
        assert_eq!(CacheKey::Recommendations(5114).to_string(), "recs:5114");
    }

    #[tokio::test]
    async fn test_cache_miss() {
        let (cache, _handle, _) = memory_cache();
        let retrieved: Option<Vec<String>> = cache
            .get_from_cache(&CacheKey::Recommendations(1))
            .await
            .unwrap();
        assert_eq!(retrieved, None);
    }

    #[tokio::test]
    async fn test_put_and_get_typed_value() {
        let (cache, _handle, _) = memory_cache();
        let key = CacheKey::Recommendations(21);

        cache.put(&key, &vec![1, 2, 3], Some(Ttl::Minute)).await.unwrap();

        let retrieved: Option<Vec<i32>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_typed_value_expires_with_named_ttl() {
        tokio::time::pause();
        let (cache, _handle, _) = memory_cache();
        let key = CacheKey::Recommendations(21);
        cache.put(&key, &"x", Some(Ttl::Minute)).await.unwrap();

        tokio::time::advance(Duration::from_secs(Ttl::Minute.as_secs())).await;

        let retrieved: Option<String> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, None);
    }

    #[tokio::test]
    async fn test_invalidate_typed_key() {
        let (cache, _handle, _) = memory_cache();
        let key = CacheKey::Profile(Uuid::new_v4());
        cache.put(&key, &"x", None).await.unwrap();

        cache.invalidate(&key).await.unwrap();

        let retrieved: Option<String> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, None);
    }

    #[tokio::test]
    async fn test_cache_writer_graceful_shutdown_flushes() {
        let (cache, handle, store) = memory_cache();

        for id in 0..3 {
            cache.set_in_background(&CacheKey::Recommendations(id), &vec![id], Ttl::Hour);
        }
        handle.shutdown().await;

        assert_eq!(store.len().await, 3);
        let retrieved: Option<Vec<i64>> = cache
            .get_from_cache(&CacheKey::Recommendations(2))
            .await
            .unwrap();
        assert_eq!(retrieved, Some(vec![2]));
    }
}
