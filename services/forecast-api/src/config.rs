//! Command-line and environment configuration.

use std::time::Duration;

use clap::Parser;

use crate::forecast::ForecastConfig;
use crate::prewarm::PrewarmConfig;
use crate::upstream::UpstreamConfig;

/// Zone Forecast API Server
#[derive(Parser, Debug, Clone)]
#[command(name = "forecast-api")]
#[command(about = "Zone forecast server with TTL caching and popular-zone pre-warming")]
pub struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8080", env = "FORECAST_LISTEN_ADDR")]
    pub listen: String,

    /// Upstream weather service base URL
    #[arg(long, default_value = "https://api.weather.gov", env = "NWS_BASE_URL")]
    pub upstream_url: String,

    /// User-Agent sent to the upstream service
    #[arg(long, default_value = "zone-forecast/0.1 (ops@example.com)", env = "NWS_USER_AGENT")]
    pub user_agent: String,

    /// Upstream request timeout in seconds
    #[arg(long, default_value = "30", env = "NWS_TIMEOUT_SECS")]
    pub upstream_timeout_secs: u64,

    /// Popular zones kept warm (comma separated)
    #[arg(
        long,
        default_value = "DCZ001,NYZ072,PAZ071",
        env = "POPULAR_ZONES",
        value_delimiter = ','
    )]
    pub popular_zones: Vec<String>,

    /// Seconds between pre-warm passes
    #[arg(long, default_value = "900", env = "PREWARM_INTERVAL_SECS")]
    pub prewarm_interval_secs: u64,

    /// Maximum concurrent fetches per pre-warm pass (0 = one per zone)
    #[arg(long, default_value = "0", env = "PREWARM_CONCURRENCY")]
    pub prewarm_concurrency: usize,

    /// Disable the background pre-warmer
    #[arg(long, env = "PREWARM_DISABLED")]
    pub no_prewarm: bool,

    /// Zone list cache TTL in seconds
    #[arg(long, default_value = "3600", env = "ZONES_TTL_SECS")]
    pub zones_ttl_secs: u64,

    /// Forecast cache TTL in seconds
    #[arg(long, default_value = "900", env = "FORECAST_TTL_SECS")]
    pub forecast_ttl_secs: u64,

    /// Fail every Nth forecast fetch attempt (0 disables)
    #[arg(long, default_value = "5", env = "FAULT_EVERY")]
    pub fault_every: u64,

    /// In-memory cache capacity (entries)
    #[arg(long, default_value = "1024", env = "CACHE_CAPACITY")]
    pub cache_capacity: usize,

    /// Redis URL; when set, Redis replaces the in-memory cache
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Key prefix for Redis entries
    #[arg(long, default_value = "zone-forecast", env = "REDIS_KEY_PREFIX")]
    pub redis_prefix: String,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,
}

impl Args {
    pub fn upstream_config(&self) -> UpstreamConfig {
        UpstreamConfig {
            base_url: self.upstream_url.clone(),
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.upstream_timeout_secs),
        }
    }

    pub fn forecast_config(&self) -> ForecastConfig {
        ForecastConfig {
            zones_ttl: Duration::from_secs(self.zones_ttl_secs),
            forecast_ttl: Duration::from_secs(self.forecast_ttl_secs),
        }
    }

    pub fn prewarm_config(&self) -> PrewarmConfig {
        PrewarmConfig {
            zones: parse_zone_list(&self.popular_zones),
            interval: Duration::from_secs(self.prewarm_interval_secs),
            concurrency: self.prewarm_concurrency,
        }
    }
}

/// Trim, uppercase and dedupe zone identifiers, dropping empty entries.
pub fn parse_zone_list(raw: &[String]) -> Vec<String> {
    let mut zones: Vec<String> = Vec::with_capacity(raw.len());
    for zone in raw {
        let zone = zone.trim().to_uppercase();
        if !zone.is_empty() && !zones.contains(&zone) {
            zones.push(zone);
        }
    }
    zones
}
