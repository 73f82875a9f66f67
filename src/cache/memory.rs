use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::entry::{self, CacheEntry};
use super::TtlCache;
use crate::error::AppResult;

/// Process-local TTL cache.
///
/// Stale entries are evicted lazily by the read that finds them, so there is
/// no background sweep.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry<String>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, stale ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl TtlCache for MemoryCache {
    async fn get_raw(&self, key: &str) -> AppResult<Option<String>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // Re-check under the write lock, a concurrent put may have refreshed it
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| entry.is_expired()) {
            entries.remove(key);
            tracing::debug!(key = %key, "Evicted stale cache entry");
            return Ok(None);
        }
        Ok(entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn put_raw(&self, key: &str, value: String, ttl_seconds: Option<u64>) -> AppResult<()> {
        let entry = CacheEntry::new(key, value, ttl_seconds)?;
        self.entries.write().await.insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> AppResult<()> {
        entry::validate(key, None)?;
        self.entries.write().await.remove(key);
        Ok(())
    }
}
