//! Rate limit counters shared through Redis.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{close_on_broken_connection, RedisGate};
use crate::error::AppResult;
use crate::models::ClientIdentity;
use crate::services::rate_limiter::{RateLimitResult, RateLimitStore};

/// Redis implementation of [`RateLimitStore`].
///
/// One key per identity. The window is created with `SET NX PX` and counted
/// with `INCR` inside a single `MULTI`, so concurrent processes agree on the
/// count and a key can never be left without an expiry.
#[derive(Clone)]
pub struct RedisRateLimitStore {
    gate: Arc<RedisGate>,
}

impl RedisRateLimitStore {
    pub fn new(gate: Arc<RedisGate>) -> Self {
        Self { gate }
    }

    pub fn key_for(identity: &ClientIdentity) -> String {
        format!("ratelimit:{}", identity)
    }
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn consume(
        &self,
        identity: &ClientIdentity,
        points: u32,
        window: Duration,
    ) -> AppResult<RateLimitResult> {
        let key = Self::key_for(identity);
        let mut conn = self.gate.connection().await?;

        let counted: redis::RedisResult<(i64, i64)> = redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(&key)
            .arg(0)
            .arg("PX")
            .arg(window.as_millis() as u64)
            .arg("NX")
            .ignore()
            .cmd("INCR")
            .arg(&key)
            .cmd("PTTL")
            .arg(&key)
            .query_async(&mut conn)
            .await;

        let (count, ttl_ms) = counted.map_err(|e| {
            close_on_broken_connection(&self.gate, &e);
            e
        })?;

        Ok(outcome(count, ttl_ms, points))
    }
}

/// Turns the `INCR` count and `PTTL` reply into an admission decision.
///
/// `PTTL` answers -1 or -2 for keys without a live expiry; those clamp to zero.
fn outcome(count: i64, ttl_ms: i64, points: u32) -> RateLimitResult {
    if count > i64::from(points) {
        let retry_after = Duration::from_millis(u64::try_from(ttl_ms).unwrap_or(0));
        return RateLimitResult::Exceeded { retry_after };
    }

    let consumed = u32::try_from(count.max(0)).unwrap_or(u32::MAX);
    RateLimitResult::Allowed {
        consumed,
        remaining: points.saturating_sub(consumed),
    }
}
