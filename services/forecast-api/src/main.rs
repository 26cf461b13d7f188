//! Zone Forecast API Server

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use forecast_api::config::Args;
use forecast_api::{
    create_router, AppState, BackgroundPrewarmer, EveryNthFault, ForecastService, MetricsRecorder,
    NwsClient,
};
use storage::{CacheStore, MemoryCache, RedisCache};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    // Initialize Prometheus metrics exporter
    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    info!("Prometheus metrics exporter initialized");

    let cache: Arc<dyn CacheStore> = match &args.redis_url {
        Some(url) => {
            info!(url = %url, "Using Redis cache");
            Arc::new(RedisCache::connect(url, &args.redis_prefix).await?)
        }
        None => {
            info!(capacity = args.cache_capacity, "Using in-memory cache");
            Arc::new(MemoryCache::new(args.cache_capacity))
        }
    };

    if args.fault_every > 0 {
        warn!(every = args.fault_every, "Fault injection enabled for forecast fetches");
    }
    let upstream = NwsClient::new(
        args.upstream_config(),
        Arc::new(EveryNthFault::new(args.fault_every)),
    )?;

    let forecasts = Arc::new(ForecastService::new(
        Arc::new(upstream),
        cache,
        Arc::new(MetricsRecorder::new()),
        args.forecast_config(),
    ));
    let prewarmer = Arc::new(BackgroundPrewarmer::new(
        forecasts.clone(),
        args.prewarm_config(),
    ));

    let cancel = CancellationToken::new();
    let prewarm_task = if args.no_prewarm {
        info!("Background pre-warming disabled");
        None
    } else {
        Some(prewarmer.spawn(cancel.clone()))
    };

    let state = Arc::new(AppState::new(forecasts, prewarmer).with_prometheus(prometheus_handle));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("Failed to bind {}", args.listen))?;
    info!(address = %args.listen, "Starting forecast API server");

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Received shutdown signal");
            shutdown.cancel();
        })
        .await?;

    cancel.cancel();
    if let Some(task) = prewarm_task {
        task.await.ok();
    }

    info!("Forecast API server stopped");
    Ok(())
}
