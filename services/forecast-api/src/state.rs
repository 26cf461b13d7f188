//! Application state shared across handlers.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::forecast::ForecastService;
use crate::prewarm::BackgroundPrewarmer;

/// Shared application state.
pub struct AppState {
    pub forecasts: Arc<ForecastService>,
    pub prewarmer: Arc<BackgroundPrewarmer>,
    /// Absent in tests, where no global recorder is installed
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(forecasts: Arc<ForecastService>, prewarmer: Arc<BackgroundPrewarmer>) -> Self {
        Self {
            forecasts,
            prewarmer,
            prometheus: None,
        }
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }
}
