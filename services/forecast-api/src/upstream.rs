//! Upstream weather service client.
//!
//! [`WeatherUpstream`] is the capability the forecast service depends on;
//! [`NwsClient`] implements it against the National Weather Service API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use forecast_common::{Forecast, ForecastError, ForecastResult, Zone, ZoneCatalog, ZoneForecastDocument};

use crate::fault::{FaultDecision, FaultInjector};

/// Zone and forecast retrieval from an upstream weather service.
#[async_trait]
pub trait WeatherUpstream: Send + Sync {
    /// Fetch forecast zones that have at least one observation station,
    /// deduplicated by identifier.
    async fn fetch_zones(&self) -> ForecastResult<Vec<Zone>>;

    /// Fetch forecast periods for one zone.
    async fn fetch_forecast(&self, zone_id: &str) -> ForecastResult<Vec<Forecast>>;

    /// Fetch attempts registered with the fault injector so far.
    fn forecast_attempts(&self) -> u64;
}

/// Connection settings for [`NwsClient`].
#[derive(Clone, Debug)]
pub struct UpstreamConfig {
    /// Base URL (e.g., "https://api.weather.gov")
    pub base_url: String,
    /// The NWS API rejects requests without an identifying User-Agent
    pub user_agent: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.weather.gov".to_string(),
            user_agent: "zone-forecast/0.1 (ops@example.com)".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP client for the National Weather Service API.
pub struct NwsClient {
    client: Client,
    base_url: Url,
    faults: Arc<dyn FaultInjector>,
}

impl NwsClient {
    pub fn new(config: UpstreamConfig, faults: Arc<dyn FaultInjector>) -> ForecastResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ForecastError::InternalError(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ForecastError::InternalError(format!("Invalid upstream URL {}: {}", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ForecastError::InternalError(format!(
                "Upstream URL {} cannot carry a path",
                config.base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            faults,
        })
    }

    /// Append path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn zones_url(&self) -> Url {
        let mut url = self.endpoint(&["zones"]);
        url.query_pairs_mut().append_pair("type", "forecast");
        url
    }

    fn forecast_url(&self, zone_id: &str) -> Url {
        self.endpoint(&["zones", "forecast", zone_id, "forecast"])
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> ForecastResult<T> {
        let response = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, "application/geo+json")
            .send()
            .await
            .map_err(|e| ForecastError::UpstreamUnavailable(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ForecastError::UpstreamUnavailable(format!(
                "{} returned HTTP {}",
                url, status
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ForecastError::UpstreamUnavailable(format!("Invalid response from {}: {}", url, e)))
    }
}

#[async_trait]
impl WeatherUpstream for NwsClient {
    #[instrument(skip(self))]
    async fn fetch_zones(&self) -> ForecastResult<Vec<Zone>> {
        let catalog: ZoneCatalog = self.get_json(self.zones_url()).await?;

        let records = catalog.features.len();
        let zones = catalog.into_zones();
        debug!(records = records, zones = zones.len(), "Fetched zone catalog");

        Ok(zones)
    }

    #[instrument(skip(self))]
    async fn fetch_forecast(&self, zone_id: &str) -> ForecastResult<Vec<Forecast>> {
        let attempt = match self.faults.register_attempt() {
            FaultDecision::Fail { attempt } => {
                warn!(zone_id = %zone_id, attempt = attempt, "Injecting forecast fetch fault");
                return Err(ForecastError::InjectedFault {
                    zone_id: zone_id.to_string(),
                    attempt,
                });
            }
            FaultDecision::Proceed { attempt } => attempt,
        };

        let document: ZoneForecastDocument = self.get_json(self.forecast_url(zone_id)).await?;
        let forecasts = document.into_forecasts();

        debug!(
            zone_id = %zone_id,
            attempt = attempt,
            periods = forecasts.len(),
            "Fetched zone forecast"
        );

        Ok(forecasts)
    }

    fn forecast_attempts(&self) -> u64 {
        self.faults.attempts()
    }
}
