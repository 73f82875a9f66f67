use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use anirec_api::{
    cache::Cache,
    config::RateLimitBackend,
    create_router,
    db::{create_pool, create_redis_client, RedisCache, RedisConnector, RedisGate, RedisRateLimitStore},
    services::{
        recommendations::{JikanSource, PgWeightedPicker, PickerRetryConfig, RetryingPicker},
        MemoryRateLimitStore, PgProfileSource, RateLimitStore, RateLimiter, RecommendationService,
    },
    AppState, Config,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .init();

    let pool = create_pool(&config.database_url, config.connect_timeout())?;

    if config.run_migrations {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Migrations complete");
    }

    // Nothing connects to Redis until the first gated request
    let redis = create_redis_client(&config.redis_url)?;
    let gate = Arc::new(RedisGate::new(RedisConnector::new(redis), config.connect_timeout()));

    let (cache, cache_writer) = Cache::new(Arc::new(RedisCache::new(gate.clone())));

    let store: Arc<dyn RateLimitStore> = match config.rate_limit_backend {
        RateLimitBackend::Memory => Arc::new(MemoryRateLimitStore::new()),
        RateLimitBackend::Redis => Arc::new(RedisRateLimitStore::new(gate.clone())),
    };
    let rate_limiter = RateLimiter::new(store, config.rate_limit_points, config.rate_limit_window());

    let picker = RetryingPicker::new(
        Arc::new(PgWeightedPicker::new(pool.clone())),
        PickerRetryConfig {
            max_attempts: config.fallback_max_attempts,
            attempt_timeout: config.upstream_timeout(),
            ..Default::default()
        },
    );
    let source = JikanSource::new(cache.clone(), &config.jikan_api_url, config.upstream_timeout())?;
    let recommendations = RecommendationService::new(
        Arc::new(PgProfileSource::new(pool, cache.clone())),
        Arc::new(picker),
        Arc::new(source),
    );

    let state = AppState::new(rate_limiter, gate, cache, recommendations)
        .with_trust_forwarded_for(config.trust_forwarded_for);
    let app = create_router(state);

    let addr: SocketAddr = config.bind_address().parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(
        %addr,
        points = config.rate_limit_points,
        window_secs = config.rate_limit_duration_secs,
        backend = ?config.rate_limit_backend,
        "Listening"
    );

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cache_writer.shutdown().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C, shutting down..."),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
    }
}
