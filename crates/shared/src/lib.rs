//! Shared store bootstrap for LearnHub services.
//!
//! Connection setup is the only place in the system that retries
//! automatically; everything past process start treats a store failure as
//! terminal for the current request.

use std::time::Duration;

use redis::aio::ConnectionManager;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::Retry;

/// Delay between connection attempts at process start.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Attempts before giving up and letting the process exit.
const MAX_ATTEMPTS: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("redis connection failed: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Create the PostgreSQL connection pool, retrying on a fixed interval.
pub async fn create_pool(database_url: &str) -> Result<PgPool, StoreError> {
    let strategy = FixedInterval::new(RETRY_DELAY).take(MAX_ATTEMPTS);

    let pool = Retry::spawn(strategy, || async {
        PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "database connection failed, retrying");
                e
            })
    })
    .await?;

    Ok(pool)
}

/// Create the Redis connection manager, retrying on a fixed interval.
///
/// The manager reconnects on its own after startup; the retry here only
/// covers the initial handshake.
pub async fn create_redis(redis_url: &str) -> Result<ConnectionManager, StoreError> {
    let strategy = FixedInterval::new(RETRY_DELAY).take(MAX_ATTEMPTS);

    let manager = Retry::spawn(strategy, || async {
        let client = redis::Client::open(redis_url)?;
        ConnectionManager::new(client).await.map_err(|e| {
            tracing::warn!(error = %e, "redis connection failed, retrying");
            e
        })
    })
    .await?;

    Ok(manager)
}
