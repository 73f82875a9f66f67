//! Per-client request admission.
//!
//! [`RateLimiter`] holds the process-wide quota and window; the counters live
//! in an injected [`RateLimitStore`] so a single process can keep them in
//! memory while a fleet shares them through Redis.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::{AppError, AppResult};
use crate::models::ClientIdentity;

/// Outcome of consuming one point for an identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Admitted; `consumed` points used so far in the current window
    Allowed { consumed: u32, remaining: u32 },
    /// Quota exhausted until the window rolls over
    Exceeded { retry_after: Duration },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }
}

/// Counter storage keyed by client identity.
///
/// `consume` must check and increment atomically for a given identity, so
/// concurrent requests from one client can never oversell the quota.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn consume(
        &self,
        identity: &ClientIdentity,
        points: u32,
        window: Duration,
    ) -> AppResult<RateLimitResult>;
}

/// Window state for one identity
#[derive(Debug, Clone, Copy)]
pub struct RateLimitState {
    pub points_consumed: u32,
    pub window_start: Instant,
}

/// Entries past this count make elapsed windows eligible for a sweep
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Default)]
struct Counters {
    states: HashMap<ClientIdentity, RateLimitState>,
    /// When elapsed windows were last swept; at most one sweep per window
    last_pruned: Option<Instant>,
}

impl Counters {
    fn prune(&mut self, now: Instant, window: Duration) {
        if self.states.len() <= PRUNE_THRESHOLD {
            return;
        }
        if self.last_pruned.is_some_and(|at| now < at + window) {
            return;
        }
        let before = self.states.len();
        self.states.retain(|_, state| now < state.window_start + window);
        self.last_pruned = Some(now);
        tracing::debug!(before, after = self.states.len(), "Pruned elapsed rate limit windows");
    }
}

/// In-process counters behind a mutex.
///
/// Rejected calls do not increment, so `points_consumed` never exceeds the
/// quota inside a window.
#[derive(Default)]
pub struct MemoryRateLimitStore {
    counters: Mutex<Counters>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identities currently tracked
    pub fn tracked(&self) -> usize {
        self.lock().states.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn consume(
        &self,
        identity: &ClientIdentity,
        points: u32,
        window: Duration,
    ) -> AppResult<RateLimitResult> {
        let now = Instant::now();
        let mut counters = self.lock();
        counters.prune(now, window);

        let state = counters.states.entry(identity.clone()).or_insert(RateLimitState {
            points_consumed: 0,
            window_start: now,
        });

        if now >= state.window_start + window {
            *state = RateLimitState {
                points_consumed: 0,
                window_start: now,
            };
        }

        if state.points_consumed >= points {
            let retry_after = (state.window_start + window).saturating_duration_since(now);
            return Ok(RateLimitResult::Exceeded { retry_after });
        }

        state.points_consumed += 1;
        Ok(RateLimitResult::Allowed {
            consumed: state.points_consumed,
            remaining: points - state.points_consumed,
        })
    }
}

/// Admission gate with a process-wide quota per rolling window
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    points: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, points: u32, window: Duration) -> Self {
        Self {
            store,
            points,
            window,
        }
    }

    /// Consumes one point for `identity`, failing with `TooManyRequests` once
    /// the quota for the current window is spent
    pub async fn consume(&self, identity: &ClientIdentity) -> AppResult<RateLimitResult> {
        let result = self.store.consume(identity, self.points, self.window).await?;

        match &result {
            RateLimitResult::Allowed { consumed, remaining } => {
                tracing::trace!(client = %identity, consumed, remaining, "Request admitted");
                Ok(result)
            }
            RateLimitResult::Exceeded { retry_after } => {
                tracing::warn!(
                    client = %identity,
                    quota = self.points,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Rate limit exceeded"
                );
                Err(AppError::TooManyRequests)
            }
        }
    }
}
