use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use domain::services::repository::ZoneRepository;
use domain::services::weather::WeatherProvider;

use crate::config::Config;
use crate::jobs::RefreshHandle;
use crate::routes::{health, zones};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub zones: Arc<dyn ZoneRepository>,
    pub weather: Arc<dyn WeatherProvider>,
    pub refresh: RefreshHandle,
}

pub fn create_app(state: AppState) -> Router {
    // Build CORS layer based on configuration
    let cors = if state.config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        // Production: only allow specified origins
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = state
            .config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let zone_routes = Router::new()
        .route(
            "/api/v1/zones",
            post(zones::create_zone).get(zones::list_zones),
        )
        .route("/api/v1/zones/auto-group", post(zones::create_auto_group))
        .route(
            "/api/v1/zones/local-situation",
            post(zones::create_local_situation),
        )
        .route("/api/v1/zones/near", post(zones::near_zones))
        .route(
            "/api/v1/zones/:id",
            axum::routing::put(zones::edit_zone).delete(zones::delete_zone),
        )
        .route("/api/v1/zones/:id/refresh", post(zones::refresh_zone));

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::live))
        .route("/health/ready", get(health::ready));

    let request_timeout = state.config.server.request_timeout_secs;

    Router::new()
        .merge(zone_routes)
        .merge(health_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(request_timeout)))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
