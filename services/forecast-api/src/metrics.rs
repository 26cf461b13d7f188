//! Forecast request metrics.

use metrics::{counter, histogram};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tracing::debug;

/// Histogram of forecast request durations, in milliseconds.
pub const FORECAST_DURATION_METRIC: &str = "forecast_request_duration_ms";
/// Counter of forecast requests.
pub const FORECAST_REQUESTS_METRIC: &str = "forecast_requests_total";

/// Default cap on zone/cache-hit series kept in the in-process tally.
pub const DEFAULT_MAX_SERIES: usize = 1024;

/// Records one entry per forecast request, tagged by zone and cache-hit status.
///
/// Values go to the global `metrics` recorder (Prometheus in production) and
/// to an in-process tally that backs [`MetricsRecorder::snapshot`]. The tally
/// holds at most `max_series` series; requests for series beyond the cap are
/// still exported but only counted as untracked locally.
#[derive(Debug)]
pub struct MetricsRecorder {
    tally: RwLock<HashMap<(String, bool), RequestStats>>,
    max_series: usize,
    untracked: AtomicU64,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::with_max_series(DEFAULT_MAX_SERIES)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct RequestStats {
    count: u64,
    total_ms: f64,
    max_ms: f64,
}

/// Per zone/cache-hit aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestSeries {
    pub zone_id: String,
    pub cache_hit: bool,
    pub count: u64,
    pub avg_ms: f64,
    pub max_ms: f64,
}

/// Point-in-time copy of the recorded series, sorted by zone then cache hit.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    pub series: Vec<RequestSeries>,
    /// Requests not tallied because the series cap was reached
    pub untracked: u64,
}

impl MetricsSnapshot {
    /// Requests recorded for `zone_id` with the given cache-hit status.
    pub fn count(&self, zone_id: &str, cache_hit: bool) -> u64 {
        self.series
            .iter()
            .find(|s| s.zone_id == zone_id && s.cache_hit == cache_hit)
            .map_or(0, |s| s.count)
    }

    /// Requests recorded across all zones.
    pub fn total(&self) -> u64 {
        self.series.iter().map(|s| s.count).sum()
    }

    /// Requests recorded with the given cache-hit status across all zones.
    pub fn total_with_cache_hit(&self, cache_hit: bool) -> u64 {
        self.series
            .iter()
            .filter(|s| s.cache_hit == cache_hit)
            .map(|s| s.count)
            .sum()
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_series(max_series: usize) -> Self {
        Self {
            tally: RwLock::new(HashMap::new()),
            max_series,
            untracked: AtomicU64::new(0),
        }
    }

    /// Record a forecast request.
    pub fn record_forecast_request(&self, zone_id: &str, cache_hit: bool, duration_ms: f64) {
        histogram!(
            FORECAST_DURATION_METRIC,
            "zone_id" => zone_id.to_string(),
            "cache_hit" => cache_hit.to_string()
        )
        .record(duration_ms);
        counter!(
            FORECAST_REQUESTS_METRIC,
            "zone_id" => zone_id.to_string(),
            "cache_hit" => cache_hit.to_string()
        )
        .increment(1);

        // A poisoned lock only means another recorder panicked mid-update;
        // the tally is still usable.
        let mut tally = self.tally.write().unwrap_or_else(|e| e.into_inner());
        let key = (zone_id.to_string(), cache_hit);
        if !tally.contains_key(&key) && tally.len() >= self.max_series {
            self.untracked.fetch_add(1, Ordering::Relaxed);
            debug!(zone_id = %zone_id, max_series = self.max_series, "Metrics tally full");
            return;
        }
        let stats = tally.entry(key).or_default();
        stats.count += 1;
        stats.total_ms += duration_ms;
        if duration_ms > stats.max_ms {
            stats.max_ms = duration_ms;
        }
    }

    /// Get a snapshot of all recorded series.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let tally = self.tally.read().unwrap_or_else(|e| e.into_inner());

        let mut series: Vec<RequestSeries> = tally
            .iter()
            .map(|((zone_id, cache_hit), stats)| RequestSeries {
                zone_id: zone_id.clone(),
                cache_hit: *cache_hit,
                count: stats.count,
                avg_ms: if stats.count == 0 {
                    0.0
                } else {
                    stats.total_ms / stats.count as f64
                },
                max_ms: stats.max_ms,
            })
            .collect();

        series.sort_by(|a, b| {
            a.zone_id
                .cmp(&b.zone_id)
                .then(a.cache_hit.cmp(&b.cache_hit))
        });

        MetricsSnapshot {
            series,
            untracked: self.untracked.load(Ordering::Relaxed),
        }
    }
}
