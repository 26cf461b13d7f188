//! Cache inspection and manual refresh.

use std::sync::Arc;

use axum::{extract::Extension, Json};
use serde::Serialize;
use tracing::{info, warn};

use forecast_common::Forecast;

use crate::prewarm::{PrewarmState, RefreshSummary};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CacheStatusResponse {
    pub backend: &'static str,
    pub prewarmer: PrewarmState,
    pub zones: Vec<ZoneCacheStatus>,
}

#[derive(Debug, Serialize)]
pub struct ZoneCacheStatus {
    pub zone_id: String,
    pub cached: bool,
    pub data: Option<Vec<Forecast>>,
}

/// GET /cache/status - Cached forecasts of the popular zones
///
/// Reads the cache only; never fetches or records request metrics.
pub async fn cache_status_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<CacheStatusResponse> {
    let mut zones = Vec::with_capacity(state.prewarmer.zones().len());

    for zone_id in state.prewarmer.zones() {
        let data = match state.forecasts.cached_forecast(zone_id).await {
            Ok(data) => data,
            Err(e) => {
                warn!(zone_id = %zone_id, error = %e, "Cache status lookup failed");
                None
            }
        };
        zones.push(ZoneCacheStatus {
            zone_id: zone_id.clone(),
            cached: data.is_some(),
            data,
        });
    }

    Json(CacheStatusResponse {
        backend: state.forecasts.cache_backend(),
        prewarmer: state.prewarmer.state(),
        zones,
    })
}

/// POST /cache/refresh - Run one pre-warm pass now
pub async fn cache_refresh_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<RefreshSummary> {
    info!("Manual cache refresh requested");
    Json(state.prewarmer.refresh_now().await)
}
