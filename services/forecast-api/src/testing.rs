//! In-process upstream for unit tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use forecast_common::{Forecast, ForecastError, ForecastResult, Zone};

use crate::fault::{EveryNthFault, FaultDecision, FaultInjector};
use crate::upstream::WeatherUpstream;

/// Upstream with the client's fault-injection semantics and scripted
/// failures, without any network.
pub struct ScriptedUpstream {
    faults: EveryNthFault,
    failing: HashSet<String>,
    latency: Duration,
    pub zone_calls: AtomicUsize,
    pub forecast_calls: AtomicUsize,
}

impl ScriptedUpstream {
    pub fn new(faults: EveryNthFault) -> Self {
        Self {
            faults,
            failing: HashSet::new(),
            latency: Duration::ZERO,
            zone_calls: AtomicUsize::new(0),
            forecast_calls: AtomicUsize::new(0),
        }
    }

    /// Answer `zone_id` with `UpstreamUnavailable`.
    pub fn failing_zone(mut self, zone_id: &str) -> Self {
        self.failing.insert(zone_id.to_string());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn forecast_calls(&self) -> usize {
        self.forecast_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherUpstream for ScriptedUpstream {
    async fn fetch_zones(&self) -> ForecastResult<Vec<Zone>> {
        self.zone_calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(vec![
            Zone::new("DCZ001", "District of Columbia").with_state("DC"),
            Zone::new("NYZ072", "New York (Manhattan)").with_state("NY"),
            Zone::new("PAZ071", "Philadelphia").with_state("PA"),
        ])
    }

    async fn fetch_forecast(&self, zone_id: &str) -> ForecastResult<Vec<Forecast>> {
        let attempt = match self.faults.register_attempt() {
            FaultDecision::Fail { attempt } => {
                return Err(ForecastError::InjectedFault {
                    zone_id: zone_id.to_string(),
                    attempt,
                })
            }
            FaultDecision::Proceed { attempt } => attempt,
        };

        self.forecast_calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.failing.contains(zone_id) {
            return Err(ForecastError::UpstreamUnavailable(format!(
                "{} is not served",
                zone_id
            )));
        }

        Ok(vec![Forecast::new(
            1,
            "Today",
            format!("{} attempt {}", zone_id, attempt),
        )])
    }

    fn forecast_attempts(&self) -> u64 {
        self.faults.attempts()
    }
}
