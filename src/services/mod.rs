pub mod profiles;
pub mod rate_limiter;
pub mod recommendations;

pub use profiles::{PgProfileSource, ProfileSource};
pub use rate_limiter::{MemoryRateLimitStore, RateLimitResult, RateLimitStore, RateLimiter};
pub use recommendations::RecommendationService;
