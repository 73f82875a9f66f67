pub mod cache;
pub mod rate_limit;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::Client;

use crate::db::gate::{ConnectionGate, Connector};
use crate::error::AppResult;

pub use cache::RedisCache;
pub use rate_limit::RedisRateLimitStore;

/// Gate over the single multiplexed Redis connection shared by all requests
pub type RedisGate = ConnectionGate<RedisConnector>;

/// Creates a Redis client.
///
/// Only parses the URL; no connection is made until the gate is first used.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Opens multiplexed connections, which are cheap to clone per request
pub struct RedisConnector {
    client: Client,
}

impl RedisConnector {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Connector for RedisConnector {
    type Connection = MultiplexedConnection;

    async fn connect(&self) -> AppResult<MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

/// Closes the gate when an error means the shared connection is dead
pub(crate) fn close_on_broken_connection(gate: &RedisGate, error: &redis::RedisError) {
    if error.is_io_error() || error.is_connection_dropped() || error.is_connection_refusal() {
        gate.close();
    }
}
