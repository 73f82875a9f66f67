use std::sync::Arc;

use async_trait::async_trait;
use redis::AsyncCommands;

use super::{close_on_broken_connection, RedisGate};
use crate::cache::{entry, TtlCache};
use crate::error::AppResult;

/// Redis-backed TTL cache.
///
/// Expiry is delegated to Redis (`SET EX`), so a stale key is already gone
/// by the time it is read. Every call goes through the connection gate.
#[derive(Clone)]
pub struct RedisCache {
    gate: Arc<RedisGate>,
}

impl RedisCache {
    pub fn new(gate: Arc<RedisGate>) -> Self {
        Self { gate }
    }

    fn observe<T>(&self, result: redis::RedisResult<T>) -> AppResult<T> {
        result.map_err(|e| {
            tracing::warn!(error = %e, "Redis cache command failed");
            close_on_broken_connection(&self.gate, &e);
            e.into()
        })
    }
}

#[async_trait]
impl TtlCache for RedisCache {
    async fn get_raw(&self, key: &str) -> AppResult<Option<String>> {
        entry::validate(key, None)?;
        let mut conn = self.gate.connection().await?;
        let cached: redis::RedisResult<Option<String>> = conn.get(key).await;
        self.observe(cached)
    }

    async fn put_raw(&self, key: &str, value: String, ttl_seconds: Option<u64>) -> AppResult<()> {
        entry::validate(key, ttl_seconds)?;
        let mut conn = self.gate.connection().await?;
        let written: redis::RedisResult<()> = match ttl_seconds {
            Some(ttl) => conn.set_ex(key, value, ttl).await,
            None => conn.set(key, value).await,
        };
        self.observe(written)?;
        tracing::debug!(key = %key, ttl = ?ttl_seconds, "Cached value in Redis");
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> AppResult<()> {
        entry::validate(key, None)?;
        let mut conn = self.gate.connection().await?;
        let deleted: redis::RedisResult<()> = conn.del(key).await;
        self.observe(deleted)
    }
}
