use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use domain::services::repository::ZoneRepository;
use domain::services::weather::WeatherProvider;
use persistence::repositories::PgZoneRepository;
use zone_watch_api::app::{self, AppState};
use zone_watch_api::config::Config;
use zone_watch_api::jobs::RefreshScheduler;
use zone_watch_api::logging;
use zone_watch_api::services::OpenWeatherClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    logging::init_logging(&config.logging);

    info!("Starting Zone Watch v{}", env!("CARGO_PKG_VERSION"));

    // Create database pool
    let pool = persistence::db::create_pool(&config.pool_settings()).await?;

    // Run migrations
    info!("Running database migrations...");
    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await?;
    info!("Migrations completed");

    let zones: Arc<dyn ZoneRepository> = Arc::new(PgZoneRepository::new(pool.clone()));
    let weather: Arc<dyn WeatherProvider> = Arc::new(OpenWeatherClient::new(&config.weather)?);

    // Start the refresh scheduler
    let mut scheduler =
        RefreshScheduler::new(Arc::clone(&zones), Arc::clone(&weather), &config.scheduler);
    let refresh = scheduler.refresh_handle();
    scheduler.start();

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        zones,
        weather,
        refresh,
    };
    let app = app::create_app(state);

    // Start server
    let addr = config.socket_addr();
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The scheduler is stopped after the server has drained so no refresh
    // pass survives process teardown.
    scheduler.stop().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
}
