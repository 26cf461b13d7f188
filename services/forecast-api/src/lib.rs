//! Zone forecast service.
//!
//! Serves the forecast zone list and per-zone forecasts from an upstream
//! weather service through a TTL cache, and keeps a set of popular zones
//! warm in the background.

pub mod config;
pub mod fault;
pub mod forecast;
pub mod handlers;
pub mod metrics;
pub mod prewarm;
pub mod server;
pub mod state;
pub mod upstream;

#[cfg(test)]
mod testing;

pub use fault::{EveryNthFault, FaultDecision, FaultInjector, NoFaults};
pub use forecast::{forecast_cache_key, ForecastConfig, ForecastService, ZONES_CACHE_KEY};
pub use crate::metrics::{MetricsRecorder, MetricsSnapshot, RequestSeries};
pub use prewarm::{BackgroundPrewarmer, PrewarmConfig, PrewarmState, RefreshSummary, ZoneFailure};
pub use server::create_router;
pub use state::AppState;
pub use upstream::{NwsClient, UpstreamConfig, WeatherUpstream};
