//! Zone list and forecast handlers.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use super::error_response;
use crate::state::AppState;

pub const ZONES_CACHE_CONTROL: &str = "public, max-age=3600";
pub const FORECAST_CACHE_CONTROL: &str = "public, max-age=900";

/// GET /zones - Forecast zones with observation stations
pub async fn zones_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    match state.forecasts.get_zones().await {
        Ok(zones) => ([(header::CACHE_CONTROL, ZONES_CACHE_CONTROL)], Json(zones)).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to load zones");
            let status =
                StatusCode::from_u16(e.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            error_response(status, e.to_string())
        }
    }
}

/// GET /forecast/:zone_id - Forecast periods for one zone
///
/// Every failure, including injected faults, answers 404.
pub async fn forecast_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(zone_id): Path<String>,
) -> Response {
    match state.forecasts.get_forecast(&zone_id).await {
        Ok(forecasts) => {
            ([(header::CACHE_CONTROL, FORECAST_CACHE_CONTROL)], Json(forecasts)).into_response()
        }
        Err(e) => {
            warn!(zone_id = %zone_id, error = %e, "Forecast unavailable");
            error_response(
                StatusCode::NOT_FOUND,
                format!("Forecast not available for zone {}", zone_id),
            )
        }
    }
}
