//! Zone list and per-zone forecast retrieval.
//!
//! The two paths use the cache differently:
//!
//! - The zone list goes through `get_or_populate`, which is single-flight:
//!   concurrent callers on a cold cache share one upstream catalog fetch.
//! - Forecasts use `try_get`, then fetch, then `set`. The check and the write
//!   are separate steps, so N callers racing on a cold zone each fetch from
//!   upstream and each count one fault-injection attempt.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info_span, instrument, warn, Instrument, Span};

use forecast_common::{is_valid_zone_id, Forecast, ForecastError, ForecastResult, Zone};
use storage::{CacheStore, JsonCache};

use crate::metrics::MetricsRecorder;
use crate::upstream::WeatherUpstream;

/// Cache key of the zone list.
pub const ZONES_CACHE_KEY: &str = "zones";

/// Cache key of a zone's forecast.
pub fn forecast_cache_key(zone_id: &str) -> String {
    format!("forecast_{}", zone_id)
}

/// Freshness windows for cached data.
#[derive(Clone, Debug)]
pub struct ForecastConfig {
    pub zones_ttl: Duration,
    pub forecast_ttl: Duration,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            zones_ttl: Duration::from_secs(60 * 60),
            forecast_ttl: Duration::from_secs(15 * 60),
        }
    }
}

/// Records one forecast request when dropped, whichever way the request ends.
struct RequestTimer<'a> {
    metrics: &'a MetricsRecorder,
    zone_id: &'a str,
    started: Instant,
    cache_hit: bool,
}

impl<'a> RequestTimer<'a> {
    fn start(metrics: &'a MetricsRecorder, zone_id: &'a str) -> Self {
        Self {
            metrics,
            zone_id,
            started: Instant::now(),
            cache_hit: false,
        }
    }
}

impl Drop for RequestTimer<'_> {
    fn drop(&mut self) {
        let duration_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        self.metrics
            .record_forecast_request(self.zone_id, self.cache_hit, duration_ms);
    }
}

/// Cache-aware access to zones and forecasts.
pub struct ForecastService {
    upstream: Arc<dyn WeatherUpstream>,
    cache: JsonCache,
    metrics: Arc<MetricsRecorder>,
    config: ForecastConfig,
}

impl ForecastService {
    pub fn new(
        upstream: Arc<dyn WeatherUpstream>,
        cache: Arc<dyn CacheStore>,
        metrics: Arc<MetricsRecorder>,
        config: ForecastConfig,
    ) -> Self {
        Self {
            upstream,
            cache: JsonCache::new(cache),
            metrics,
            config,
        }
    }

    pub fn metrics(&self) -> &Arc<MetricsRecorder> {
        &self.metrics
    }

    pub fn upstream(&self) -> &Arc<dyn WeatherUpstream> {
        &self.upstream
    }

    pub fn cache_backend(&self) -> &'static str {
        self.cache.store().backend()
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Get the zone list, populating the cache on a miss.
    ///
    /// Upstream failures propagate to the caller.
    #[instrument(skip(self))]
    pub async fn get_zones(&self) -> ForecastResult<Vec<Zone>> {
        self.cache
            .get_or_populate(ZONES_CACHE_KEY, self.config.zones_ttl, || {
                self.upstream.fetch_zones()
            })
            .await
    }

    /// Get a zone's forecast.
    ///
    /// A live cache entry is returned without contacting upstream. On a miss
    /// the forecast is fetched and written back unconditionally. Exactly one
    /// metrics record is emitted per call. Identifiers that are not zone ids
    /// are rejected before the cache, upstream or metrics are touched.
    #[instrument(skip(self), fields(cache_hit = tracing::field::Empty))]
    pub async fn get_forecast(&self, zone_id: &str) -> ForecastResult<Vec<Forecast>> {
        if !is_valid_zone_id(zone_id) {
            return Err(ForecastError::InvalidZoneId(zone_id.to_string()));
        }

        let mut timer = RequestTimer::start(&self.metrics, zone_id);
        let key = forecast_cache_key(zone_id);

        match self.cache.try_get::<Vec<Forecast>>(&key).await {
            Ok(Some(forecasts)) => {
                timer.cache_hit = true;
                Span::current().record("cache_hit", true);
                debug!(zone_id = %zone_id, periods = forecasts.len(), "Forecast cache hit");
                return Ok(forecasts);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(zone_id = %zone_id, error = %e, "Forecast cache read failed, treating as miss");
            }
        }
        Span::current().record("cache_hit", false);

        let forecasts = match self.upstream.fetch_forecast(zone_id).await {
            Ok(forecasts) => forecasts,
            Err(e) => {
                warn!(
                    zone_id = %zone_id,
                    error = %e,
                    injected = e.is_fault_injected(),
                    "Forecast fetch failed"
                );
                return Err(e);
            }
        };

        let ttl = self.config.forecast_ttl;
        async {
            if let Err(e) = self.cache.set(&key, &forecasts, ttl).await {
                warn!(error = %e, "Failed to store forecast in cache");
            }
        }
        .instrument(info_span!("cache_update", key = %key, ttl_secs = ttl.as_secs()))
        .await;

        debug!(zone_id = %zone_id, periods = forecasts.len(), "Forecast fetched and cached");
        Ok(forecasts)
    }

    /// Read a zone's cached forecast without fetching or recording metrics.
    pub async fn cached_forecast(&self, zone_id: &str) -> ForecastResult<Option<Vec<Forecast>>> {
        self.cache.try_get(&forecast_cache_key(zone_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::EveryNthFault;
    use crate::testing::ScriptedUpstream;
    use std::sync::atomic::Ordering;
    use storage::MemoryCache;

    fn service(faults: EveryNthFault) -> (ForecastService, Arc<ScriptedUpstream>) {
        let upstream = Arc::new(ScriptedUpstream::new(faults));
        let service = ForecastService::new(
            upstream.clone(),
            Arc::new(MemoryCache::new(64)),
            Arc::new(MetricsRecorder::new()),
            ForecastConfig::default(),
        );
        (service, upstream)
    }

    #[test]
    fn test_cache_keys() {
        assert_eq!(forecast_cache_key("DCZ001"), "forecast_DCZ001");
        assert_eq!(ZONES_CACHE_KEY, "zones");
    }

    #[tokio::test]
    async fn test_zones_cached_after_first_call() {
        let (service, upstream) = service(EveryNthFault::new(5));

        let first = service.get_zones().await.unwrap();
        let second = service.get_zones().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        assert_eq!(upstream.zone_calls.load(Ordering::SeqCst), 1);
        assert_eq!(upstream.forecast_attempts(), 0);
    }

    #[tokio::test]
    async fn test_forecast_hit_skips_upstream() {
        let (service, upstream) = service(EveryNthFault::new(5));

        let fetched = service.get_forecast("DCZ001").await.unwrap();
        let cached = service.get_forecast("DCZ001").await.unwrap();

        assert_eq!(fetched, cached);
        assert_eq!(upstream.forecast_attempts(), 1);

        let snapshot = service.metrics().snapshot();
        assert_eq!(snapshot.count("DCZ001", false), 1);
        assert_eq!(snapshot.count("DCZ001", true), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_records_miss_and_caches_nothing() {
        let (service, upstream) = service(EveryNthFault::starting_at(5, 4));

        let err = service.get_forecast("NYZ072").await.unwrap_err();
        assert!(err.is_fault_injected());
        assert!(service.cached_forecast("NYZ072").await.unwrap().is_none());
        assert_eq!(service.metrics().snapshot().count("NYZ072", false), 1);
        assert_eq!(upstream.forecast_calls(), 0);

        service.get_forecast("NYZ072").await.unwrap();
        assert!(service.cached_forecast("NYZ072").await.unwrap().is_some());
        assert_eq!(upstream.forecast_attempts(), 6);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_recorded() {
        let upstream = Arc::new(ScriptedUpstream::new(EveryNthFault::new(0)).failing_zone("PAZ071"));
        let service = ForecastService::new(
            upstream.clone(),
            Arc::new(MemoryCache::new(64)),
            Arc::new(MetricsRecorder::new()),
            ForecastConfig::default(),
        );

        let err = service.get_forecast("PAZ071").await.unwrap_err();
        assert!(matches!(err, ForecastError::UpstreamUnavailable(_)));
        assert_eq!(service.metrics().snapshot().count("PAZ071", false), 1);
        assert_eq!(upstream.forecast_attempts(), 1);
    }

    #[tokio::test]
    async fn test_malformed_zone_id_is_rejected_untouched() {
        let (service, upstream) = service(EveryNthFault::new(5));

        let err = service.get_forecast("DCZ001/forecast?x=").await.unwrap_err();

        assert!(matches!(err, ForecastError::InvalidZoneId(_)));
        assert_eq!(upstream.forecast_attempts(), 0);
        assert_eq!(upstream.forecast_calls(), 0);
        assert_eq!(service.metrics().snapshot().total(), 0);
        assert!(service.cached_forecast("DCZ001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cached_forecast_does_not_record_metrics() {
        let (service, upstream) = service(EveryNthFault::new(5));

        assert!(service.cached_forecast("PAZ071").await.unwrap().is_none());
        assert_eq!(service.metrics().snapshot().total(), 0);
        assert_eq!(upstream.forecast_attempts(), 0);
    }
}
