pub mod gate;
pub mod postgres;
pub mod redis;

pub use gate::{ConnectionGate, Connector, StoreGate};
pub use postgres::create_pool;
pub use self::redis::{create_redis_client, RedisCache, RedisConnector, RedisGate, RedisRateLimitStore};
