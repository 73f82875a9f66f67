//! Fallback anchor selection for requests that arrive without one.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::{BaseSelection, UserProfile},
};

/// Picks a representative anime for a profile
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnimePicker: Send + Sync {
    async fn pick(&self, profile: &UserProfile) -> AppResult<BaseSelection>;

    /// Picker name for logging
    fn name(&self) -> &'static str;
}

#[derive(Debug, sqlx::FromRow)]
struct PickedRow {
    mal_id: i64,
    title: String,
}

/// Weighted-random pick among the profile's stored favourites.
///
/// Selection is done in SQL with exponential keys (`-ln(u) / weight`), which
/// picks each row with probability proportional to its weight.
#[derive(Clone)]
pub struct PgWeightedPicker {
    pool: PgPool,
}

impl PgWeightedPicker {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnimePicker for PgWeightedPicker {
    async fn pick(&self, profile: &UserProfile) -> AppResult<BaseSelection> {
        let row: Option<PickedRow> = sqlx::query_as(
            r#"
            SELECT mal_id, title
            FROM favorite_anime
            WHERE user_id = $1 AND weight > 0
            ORDER BY -ln(1.0 - random()) / weight
            LIMIT 1
            "#,
        )
        .bind(profile.id)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or_else(|| {
            AppError::NotFound(format!(
                "Profile {} has no favourite anime to base recommendations on",
                profile.id
            ))
        })?;

        tracing::debug!(user_id = %profile.id, mal_id = row.mal_id, "Picked fallback anchor");

        Ok(BaseSelection {
            selected_favorite_title: row.title,
            selected_favorite_id: row.mal_id,
        })
    }

    fn name(&self) -> &'static str {
        "pg_weighted"
    }
}

/// Attempt and timeout bounds for [`RetryingPicker`]
#[derive(Debug, Clone)]
pub struct PickerRetryConfig {
    /// Attempts including the first. Default: 3.
    pub max_attempts: u32,
    /// Upper bound on one attempt. Default: 10s.
    pub attempt_timeout: Duration,
    /// Delay before the first retry, doubled each time. Default: 100ms.
    pub initial_delay: Duration,
}

impl Default for PickerRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(10),
            initial_delay: Duration::from_millis(100),
        }
    }
}

impl PickerRetryConfig {
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.initial_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Decorator bounding a picker's retries.
///
/// Transient failures and timeouts are retried up to `max_attempts`, then
/// reported as `UpstreamFailure`. Permanent errors return immediately.
pub struct RetryingPicker {
    inner: Arc<dyn AnimePicker>,
    config: PickerRetryConfig,
}

impl RetryingPicker {
    pub fn new(inner: Arc<dyn AnimePicker>, config: PickerRetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl AnimePicker for RetryingPicker {
    async fn pick(&self, profile: &UserProfile) -> AppResult<BaseSelection> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 0..max_attempts {
            let outcome = tokio::time::timeout(self.config.attempt_timeout, self.inner.pick(profile)).await;

            match outcome {
                Ok(Ok(selection)) => return Ok(selection),
                Ok(Err(e)) if !e.is_transient() => return Err(e),
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => {
                    last_error = format!("timed out after {:?}", self.config.attempt_timeout)
                }
            }

            if attempt + 1 < max_attempts {
                let delay = self.config.delay_for_attempt(attempt);
                tracing::warn!(
                    picker = self.inner.name(),
                    user_id = %profile.id,
                    attempt = attempt + 1,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %last_error,
                    "Retrying fallback pick"
                );
                tokio::time::sleep(delay).await;
            }
        }

        tracing::error!(
            picker = self.inner.name(),
            user_id = %profile.id,
            max_attempts,
            error = %last_error,
            "Fallback picker exhausted its attempts"
        );

        Err(AppError::UpstreamFailure(format!(
            "fallback picker failed after {} attempts: {}",
            max_attempts, last_error
        )))
    }

    fn name(&self) -> &'static str {
        "retrying"
    }
}
