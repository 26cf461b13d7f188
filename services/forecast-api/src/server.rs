//! HTTP router for the forecast API.
//!
//! Provides endpoints for:
//! - Zone list and per-zone forecasts
//! - Cache status of the popular zones and manual refresh
//! - Health and Prometheus metrics

use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/zones", get(handlers::forecast::zones_handler))
        .route("/forecast/:zone_id", get(handlers::forecast::forecast_handler))
        .route("/cache/status", get(handlers::cache::cache_status_handler))
        .route("/cache/refresh", post(handlers::cache::cache_refresh_handler))
        .route("/health", get(handlers::health::health_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
