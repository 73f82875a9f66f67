use std::sync::Arc;

use crate::{
    cache::Cache,
    db::StoreGate,
    services::{RateLimiter, RecommendationService},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub rate_limiter: RateLimiter,
    pub gate: Arc<dyn StoreGate>,
    pub cache: Cache,
    pub recommendations: RecommendationService,
    /// Honour `x-forwarded-for` when deriving the rate-limit identity
    pub trust_forwarded_for: bool,
}

impl AppState {
    pub fn new(
        rate_limiter: RateLimiter,
        gate: Arc<dyn StoreGate>,
        cache: Cache,
        recommendations: RecommendationService,
    ) -> Self {
        Self {
            rate_limiter,
            gate,
            cache,
            recommendations,
            trust_forwarded_for: false,
        }
    }

    pub fn with_trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }
}
