//! Connection pool for the zone store.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Pool settings for the zone store, already resolved from configuration.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

fn pool_options(settings: &PoolSettings) -> PgPoolOptions {
    // The pool is shared between the request handlers and the refresh
    // scheduler. At least one connection stays warm so the scheduler's
    // periodic due-zone poll never waits on connection setup.
    let min_connections = settings.min_connections.max(1);
    PgPoolOptions::new()
        .min_connections(min_connections)
        .max_connections(settings.max_connections.max(min_connections))
        .acquire_timeout(Duration::from_secs(settings.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(settings.idle_timeout_secs))
}

/// Opens a PostgreSQL pool against the zone store.
pub async fn create_pool(settings: &PoolSettings) -> Result<PgPool, sqlx::Error> {
    pool_options(settings).connect(&settings.url).await
}
