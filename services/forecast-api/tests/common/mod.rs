//! Shared setup for forecast-api integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::Request, response::Response, Router};
use tower::ServiceExt;

use forecast_api::{
    create_router, AppState, BackgroundPrewarmer, FaultInjector, ForecastConfig, ForecastService,
    MetricsRecorder, NwsClient, PrewarmConfig, UpstreamConfig,
};
use storage::MemoryCache;
use test_utils::StubWeatherService;

/// A forecast service wired to a stub upstream.
pub struct TestApp {
    pub stub: StubWeatherService,
    pub forecasts: Arc<ForecastService>,
    pub prewarmer: Arc<BackgroundPrewarmer>,
}

impl TestApp {
    pub fn new(stub: StubWeatherService, faults: impl FaultInjector + 'static) -> Self {
        Self::with_config(stub, faults, ForecastConfig::default())
    }

    pub fn with_config(
        stub: StubWeatherService,
        faults: impl FaultInjector + 'static,
        config: ForecastConfig,
    ) -> Self {
        let upstream = NwsClient::new(
            UpstreamConfig {
                base_url: stub.base_url().to_string(),
                user_agent: "forecast-api-integration".to_string(),
                timeout: Duration::from_secs(5),
            },
            Arc::new(faults),
        )
        .unwrap();

        let forecasts = Arc::new(ForecastService::new(
            Arc::new(upstream),
            Arc::new(MemoryCache::new(128)),
            Arc::new(MetricsRecorder::new()),
            config,
        ));
        let prewarmer = Arc::new(BackgroundPrewarmer::new(
            forecasts.clone(),
            PrewarmConfig::default(),
        ));

        Self {
            stub,
            forecasts,
            prewarmer,
        }
    }

    /// Forecast fetch attempts counted by the fault injector.
    pub fn attempts(&self) -> u64 {
        self.forecasts.upstream().forecast_attempts()
    }

    pub fn router(&self) -> Router {
        create_router(Arc::new(AppState::new(
            self.forecasts.clone(),
            self.prewarmer.clone(),
        )))
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send("GET", uri).await
    }

    pub async fn post(&self, uri: &str) -> Response {
        self.send("POST", uri).await
    }

    async fn send(&self, method: &str, uri: &str) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.router().oneshot(request).await.unwrap()
    }
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
