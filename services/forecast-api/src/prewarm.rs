//! Background forecast pre-warming.
//!
//! Keeps the popular zones' forecasts fresh by running a refresh pass at
//! startup and then once per interval until cancelled.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::forecast::ForecastService;

/// Zones pre-warmed when none are configured.
pub const DEFAULT_POPULAR_ZONES: [&str; 3] = ["DCZ001", "NYZ072", "PAZ071"];

/// Configuration for the pre-warmer.
#[derive(Clone, Debug)]
pub struct PrewarmConfig {
    /// Zones refreshed on every pass
    pub zones: Vec<String>,
    /// Time between the end of one pass and the start of the next
    pub interval: Duration,
    /// Maximum concurrent fetches per pass (0 = one per zone)
    pub concurrency: usize,
}

impl Default for PrewarmConfig {
    fn default() -> Self {
        Self {
            zones: DEFAULT_POPULAR_ZONES.iter().map(|z| z.to_string()).collect(),
            interval: Duration::from_secs(15 * 60),
            concurrency: 0,
        }
    }
}

/// Lifecycle of the pre-warm loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrewarmState {
    Idle,
    Running,
    Sleeping,
    Stopped,
}

/// A zone that could not be refreshed.
#[derive(Debug, Clone, Serialize)]
pub struct ZoneFailure {
    pub zone_id: String,
    pub error: String,
}

/// Result of one refresh pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshSummary {
    pub refreshed: Vec<String>,
    pub failed: Vec<ZoneFailure>,
    pub duration_ms: u64,
}

/// Periodically refreshes forecasts for the popular zones.
pub struct BackgroundPrewarmer {
    service: Arc<ForecastService>,
    config: PrewarmConfig,
    state: watch::Sender<PrewarmState>,
}

impl BackgroundPrewarmer {
    pub fn new(service: Arc<ForecastService>, config: PrewarmConfig) -> Self {
        let (state, _) = watch::channel(PrewarmState::Idle);
        Self {
            service,
            config,
            state,
        }
    }

    pub fn zones(&self) -> &[String] {
        &self.config.zones
    }

    pub fn state(&self) -> PrewarmState {
        *self.state.borrow()
    }

    /// Watch state transitions of the loop.
    pub fn subscribe(&self) -> watch::Receiver<PrewarmState> {
        self.state.subscribe()
    }

    /// Refresh every popular zone once.
    ///
    /// Zones are fetched concurrently through [`ForecastService::get_forecast`].
    /// A failing zone is logged and reported; it never aborts the others.
    pub async fn refresh_now(&self) -> RefreshSummary {
        let start = Instant::now();
        let concurrency = match self.config.concurrency {
            0 => self.config.zones.len().max(1),
            n => n,
        };

        let results: Vec<_> = stream::iter(self.config.zones.clone())
            .map(|zone_id| {
                let service = self.service.clone();
                async move {
                    let result = service.get_forecast(&zone_id).await;
                    (zone_id, result)
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut summary = RefreshSummary::default();
        for (zone_id, result) in results {
            match result {
                Ok(forecasts) => {
                    debug!(zone_id = %zone_id, periods = forecasts.len(), "Pre-warmed zone forecast");
                    summary.refreshed.push(zone_id);
                }
                Err(e) => {
                    warn!(zone_id = %zone_id, error = %e, "Failed to pre-warm zone forecast");
                    summary.failed.push(ZoneFailure {
                        zone_id,
                        error: e.to_string(),
                    });
                }
            }
        }
        summary.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            refreshed = summary.refreshed.len(),
            failed = summary.failed.len(),
            duration_ms = summary.duration_ms,
            "Pre-warm pass complete"
        );

        summary
    }

    /// Run refresh passes until `cancel` fires.
    ///
    /// The first pass starts immediately. Cancellation is observed between
    /// passes and during the sleep; a pass already in progress completes.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            zones = ?self.config.zones,
            interval_secs = self.config.interval.as_secs(),
            "Starting forecast pre-warmer"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            self.state.send_replace(PrewarmState::Running);
            self.refresh_now().await;

            if cancel.is_cancelled() {
                break;
            }

            self.state.send_replace(PrewarmState::Sleeping);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }

        self.state.send_replace(PrewarmState::Stopped);
        info!("Forecast pre-warmer stopped");
    }

    /// Spawn [`run`](Self::run) as a background task.
    pub fn spawn(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let prewarmer = self.clone();
        tokio::spawn(async move { prewarmer.run(cancel).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::EveryNthFault;
    use crate::forecast::ForecastConfig;
    use crate::metrics::MetricsRecorder;
    use crate::testing::ScriptedUpstream;
    use crate::upstream::WeatherUpstream;
    use storage::MemoryCache;

    fn prewarmer(upstream: ScriptedUpstream) -> (Arc<BackgroundPrewarmer>, Arc<ScriptedUpstream>) {
        prewarmer_with(upstream, PrewarmConfig::default())
    }

    fn prewarmer_with(
        upstream: ScriptedUpstream,
        config: PrewarmConfig,
    ) -> (Arc<BackgroundPrewarmer>, Arc<ScriptedUpstream>) {
        let upstream = Arc::new(upstream);
        let service = Arc::new(ForecastService::new(
            upstream.clone(),
            Arc::new(MemoryCache::new(64)),
            Arc::new(MetricsRecorder::new()),
            ForecastConfig::default(),
        ));
        let prewarmer = Arc::new(BackgroundPrewarmer::new(service, config));
        (prewarmer, upstream)
    }

    #[test]
    fn test_default_config() {
        let config = PrewarmConfig::default();
        assert_eq!(config.zones, vec!["DCZ001", "NYZ072", "PAZ071"]);
        assert_eq!(config.interval, Duration::from_secs(900));
    }

    #[tokio::test]
    async fn test_refresh_now_warms_all_zones() {
        let (prewarmer, upstream) = prewarmer(ScriptedUpstream::new(EveryNthFault::new(5)));

        let summary = prewarmer.refresh_now().await;

        assert_eq!(summary.refreshed.len(), 3);
        assert!(summary.failed.is_empty());
        assert_eq!(upstream.forecast_attempts(), 3);
        for zone in DEFAULT_POPULAR_ZONES {
            assert!(prewarmer.service.cached_forecast(zone).await.unwrap().is_some());
        }
        assert_eq!(prewarmer.service.metrics().snapshot().total_with_cache_hit(false), 3);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_pass() {
        let (prewarmer, upstream) =
            prewarmer(ScriptedUpstream::new(EveryNthFault::new(0)).failing_zone("NYZ072"));

        let summary = prewarmer.refresh_now().await;

        assert_eq!(summary.refreshed.len(), 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].zone_id, "NYZ072");
        assert_eq!(upstream.forecast_attempts(), 3);
        assert!(prewarmer.service.cached_forecast("NYZ072").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_pass_hits_cache() {
        let (prewarmer, upstream) = prewarmer(ScriptedUpstream::new(EveryNthFault::new(5)));

        prewarmer.refresh_now().await;
        prewarmer.refresh_now().await;

        assert_eq!(upstream.forecast_attempts(), 3);
        assert_eq!(prewarmer.service.metrics().snapshot().total_with_cache_hit(true), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_refreshes_each_interval() {
        let (prewarmer, upstream) = prewarmer(ScriptedUpstream::new(EveryNthFault::new(0)));
        let mut state = prewarmer.subscribe();
        let cancel = CancellationToken::new();

        let handle = prewarmer.spawn(cancel.clone());

        state.wait_for(|s| *s == PrewarmState::Sleeping).await.unwrap();
        assert_eq!(upstream.forecast_attempts(), 3);

        // Wakes after the second pass, before the third.
        tokio::time::sleep(Duration::from_secs(15 * 60 + 1)).await;
        assert_eq!(prewarmer.state(), PrewarmState::Sleeping);
        // The interval equals the forecast TTL, so every entry has expired.
        assert_eq!(upstream.forecast_attempts(), 6);
        let snapshot = prewarmer.service.metrics().snapshot();
        assert_eq!(snapshot.total_with_cache_hit(false), 6);
        assert_eq!(snapshot.total_with_cache_hit(true), 0);

        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(prewarmer.state(), PrewarmState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_shorter_than_ttl_hits_cache() {
        let config = PrewarmConfig {
            interval: Duration::from_secs(10 * 60),
            ..PrewarmConfig::default()
        };
        let (prewarmer, upstream) =
            prewarmer_with(ScriptedUpstream::new(EveryNthFault::new(0)), config);
        let mut state = prewarmer.subscribe();
        let cancel = CancellationToken::new();

        let handle = prewarmer.spawn(cancel.clone());
        state.wait_for(|s| *s == PrewarmState::Sleeping).await.unwrap();

        tokio::time::sleep(Duration::from_secs(10 * 60 + 1)).await;

        assert_eq!(upstream.forecast_attempts(), 3);
        let snapshot = prewarmer.service.metrics().snapshot();
        assert_eq!(snapshot.total_with_cache_hit(false), 3);
        assert_eq!(snapshot.total_with_cache_hit(true), 3);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_pass_lets_fetches_finish() {
        let upstream = ScriptedUpstream::new(EveryNthFault::new(0))
            .with_latency(Duration::from_millis(200));
        let (prewarmer, upstream) = prewarmer(upstream);
        let mut state = prewarmer.subscribe();
        let cancel = CancellationToken::new();

        let handle = prewarmer.spawn(cancel.clone());
        state.wait_for(|s| *s == PrewarmState::Running).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(prewarmer.state(), PrewarmState::Running);
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(prewarmer.state(), PrewarmState::Stopped);
        assert_eq!(upstream.forecast_calls(), 3);
        for zone in DEFAULT_POPULAR_ZONES {
            assert!(prewarmer.service.cached_forecast(zone).await.unwrap().is_some());
        }

        // No second pass after cancellation.
        tokio::time::sleep(Duration::from_secs(60 * 60)).await;
        assert_eq!(upstream.forecast_attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_sleep_stops_promptly() {
        let (prewarmer, upstream) = prewarmer(ScriptedUpstream::new(EveryNthFault::new(0)));
        let mut state = prewarmer.subscribe();
        let cancel = CancellationToken::new();

        let handle = prewarmer.spawn(cancel.clone());
        state.wait_for(|s| *s == PrewarmState::Sleeping).await.unwrap();

        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(prewarmer.state(), PrewarmState::Stopped);
        assert_eq!(upstream.forecast_attempts(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_does_nothing() {
        let (prewarmer, upstream) = prewarmer(ScriptedUpstream::new(EveryNthFault::new(0)));
        let cancel = CancellationToken::new();
        cancel.cancel();

        prewarmer.run(cancel).await;

        assert_eq!(prewarmer.state(), PrewarmState::Stopped);
        assert_eq!(upstream.forecast_attempts(), 0);
    }
}
