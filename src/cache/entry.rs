//! Cache entry model with optional time-to-live.

use serde::{Deserialize, Serialize};
use tokio::time::{Duration, Instant};

use crate::error::{AppError, AppResult};

/// Named cache lifetimes, resolved to whole seconds at the storage boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    Minute,
    Hour,
    Day,
    Week,
    /// 30 days
    Month,
    /// 365 days
    Year,
}

impl Ttl {
    pub const fn as_secs(self) -> u64 {
        match self {
            Ttl::Minute => 60,
            Ttl::Hour => 60 * 60,
            Ttl::Day => 60 * 60 * 24,
            Ttl::Week => 60 * 60 * 24 * 7,
            Ttl::Month => 60 * 60 * 24 * 30,
            Ttl::Year => 60 * 60 * 24 * 365,
        }
    }
}

impl From<Ttl> for u64 {
    fn from(ttl: Ttl) -> Self {
        ttl.as_secs()
    }
}

/// Rejects empty keys and zero TTLs before anything is written
pub fn validate(key: &str, ttl_seconds: Option<u64>) -> AppResult<()> {
    if key.trim().is_empty() {
        return Err(AppError::InvalidArgument(
            "cache key cannot be empty".to_string(),
        ));
    }
    if ttl_seconds == Some(0) {
        return Err(AppError::InvalidArgument(
            "cache ttl must be a positive number of seconds".to_string(),
        ));
    }
    Ok(())
}

/// A single cached value.
///
/// Serialized as `{ "key", "value", "ttl"? }`. The storage instant is local to
/// the process, so a deserialized entry starts its lifetime on arrival.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub key: String,
    pub value: T,
    #[serde(rename = "ttl", default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,
    #[serde(skip, default = "Instant::now")]
    stored_at: Instant,
}

impl<T> CacheEntry<T> {
    /// Creates an entry stored now. `None` means it never expires by policy.
    pub fn new(key: impl Into<String>, value: T, ttl_seconds: Option<u64>) -> AppResult<Self> {
        let key = key.into();
        validate(&key, ttl_seconds)?;
        Ok(Self {
            key,
            value,
            ttl_seconds,
            stored_at: Instant::now(),
        })
    }

    /// An entry is stale once `now >= stored_at + ttl`
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.ttl_seconds {
            Some(ttl) => now >= self.stored_at + Duration::from_secs(ttl),
            None => false,
        }
    }

    /// Remaining lifetime, `None` if the entry never expires
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.ttl_seconds.map(|ttl| {
            (self.stored_at + Duration::from_secs(ttl)).saturating_duration_since(Instant::now())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_ttls_resolve_to_seconds() {
        assert_eq!(Ttl::Minute.as_secs(), 60);
        assert_eq!(Ttl::Hour.as_secs(), 3_600);
        assert_eq!(Ttl::Day.as_secs(), 86_400);
        assert_eq!(Ttl::Week.as_secs(), 604_800);
        assert_eq!(Ttl::Month.as_secs(), 2_592_000);
        assert_eq!(Ttl::Year.as_secs(), 31_536_000);
        assert_eq!(u64::from(Ttl::Hour), 3_600);
    }

    #[tokio::test]
    async fn test_entry_without_ttl_never_expires() {
        tokio::time::pause();
        let entry = CacheEntry::new("profile:1", 7, None).unwrap();

        tokio::time::advance(Duration::from_secs(Ttl::Year.as_secs() * 10)).await;

        assert!(!entry.is_expired());
        assert_eq!(entry.ttl_remaining(), None);
    }

    #[tokio::test]
    async fn test_entry_expires_exactly_at_ttl() {
        tokio::time::pause();
        let entry = CacheEntry::new("recs:1", "value", Some(2)).unwrap();

        tokio::time::advance(Duration::from_millis(1_999)).await;
        assert!(!entry.is_expired());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(entry.is_expired());
        assert_eq!(entry.ttl_remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_zero_ttl_is_invalid_argument() {
        let result = CacheEntry::new("recs:1", 1, Some(0));
        assert!(matches!(result, Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn test_empty_key_is_invalid_argument() {
        let result = CacheEntry::new("  ", 1, Some(60));
        assert!(matches!(result, Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn test_serialized_shape() {
        let entry = CacheEntry::new("recs:42", vec![1, 2], Some(60)).unwrap();
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "key": "recs:42", "value": [1, 2], "ttl": 60 })
        );

        let forever = CacheEntry::new("recs:42", 1, None).unwrap();
        let json = serde_json::to_value(&forever).unwrap();
        assert_eq!(json, serde_json::json!({ "key": "recs:42", "value": 1 }));
    }
}
