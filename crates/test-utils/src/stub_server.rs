//! Stub upstream weather service.
//!
//! Serves the two NWS routes the forecast client uses from an ephemeral
//! localhost port, counts requests, and can add latency or fail on demand.
//!
//! ```ignore
//! let stub = StubWeatherService::builder()
//!     .latency(Duration::from_millis(50))
//!     .start()
//!     .await;
//! let client = NwsClient::new(stub.base_url(), ...);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::fixtures;

struct StubState {
    catalog: Value,
    forecasts: HashMap<String, Value>,
    default_periods: usize,
    latency: Duration,
    unavailable: AtomicBool,
    zone_requests: AtomicUsize,
    forecast_requests: AtomicUsize,
    per_zone: Mutex<HashMap<String, usize>>,
    last_user_agent: Mutex<Option<String>>,
}

/// Builder for [`StubWeatherService`].
pub struct StubBuilder {
    catalog: Value,
    forecasts: HashMap<String, Value>,
    default_periods: usize,
    latency: Duration,
}

impl Default for StubBuilder {
    fn default() -> Self {
        Self {
            catalog: fixtures::zone_catalog(),
            forecasts: HashMap::new(),
            default_periods: 4,
            latency: Duration::ZERO,
        }
    }
}

impl StubBuilder {
    /// Replace the zone catalog document.
    pub fn zone_catalog(mut self, catalog: Value) -> Self {
        self.catalog = catalog;
        self
    }

    /// Serve a fixed forecast document for `zone_id`. Other zones get
    /// generated periods.
    pub fn forecast(mut self, zone_id: &str, document: Value) -> Self {
        self.forecasts.insert(zone_id.to_string(), document);
        self
    }

    /// Number of periods in generated forecasts.
    pub fn default_periods(mut self, periods: usize) -> Self {
        self.default_periods = periods;
        self
    }

    /// Delay applied to every response.
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Bind to an ephemeral port and start serving.
    pub async fn start(self) -> StubWeatherService {
        let state = Arc::new(StubState {
            catalog: self.catalog,
            forecasts: self.forecasts,
            default_periods: self.default_periods,
            latency: self.latency,
            unavailable: AtomicBool::new(false),
            zone_requests: AtomicUsize::new(0),
            forecast_requests: AtomicUsize::new(0),
            per_zone: Mutex::new(HashMap::new()),
            last_user_agent: Mutex::new(None),
        });

        let router = Router::new()
            .route("/zones", get(zones_handler))
            .route("/zones/forecast/:zone_id/forecast", get(forecast_handler))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub weather service");
        let addr = listener.local_addr().expect("Stub listener has no address");

        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        StubWeatherService {
            base_url: format!("http://{}", addr),
            state,
            server,
        }
    }
}

/// Running stub upstream. The server stops when this is dropped.
pub struct StubWeatherService {
    base_url: String,
    state: Arc<StubState>,
    server: JoinHandle<()>,
}

impl StubWeatherService {
    pub fn builder() -> StubBuilder {
        StubBuilder::default()
    }

    /// Start with the default catalog and generated forecasts.
    pub async fn start() -> Self {
        Self::builder().start().await
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Answer every request with 503 while `unavailable` is set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Zone catalog requests received.
    pub fn zone_requests(&self) -> usize {
        self.state.zone_requests.load(Ordering::SeqCst)
    }

    /// Forecast requests received, all zones.
    pub fn forecast_requests(&self) -> usize {
        self.state.forecast_requests.load(Ordering::SeqCst)
    }

    /// Forecast requests received for one zone.
    pub async fn forecast_requests_for(&self, zone_id: &str) -> usize {
        self.state
            .per_zone
            .lock()
            .await
            .get(zone_id)
            .copied()
            .unwrap_or(0)
    }

    /// User-Agent header of the most recent request.
    pub async fn last_user_agent(&self) -> Option<String> {
        self.state.last_user_agent.lock().await.clone()
    }
}

impl Drop for StubWeatherService {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn observe(state: &StubState, headers: &HeaderMap) -> Option<Response> {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    *state.last_user_agent.lock().await = user_agent;

    if !state.latency.is_zero() {
        tokio::time::sleep(state.latency).await;
    }

    if state.unavailable.load(Ordering::SeqCst) {
        return Some((StatusCode::SERVICE_UNAVAILABLE, "upstream unavailable").into_response());
    }

    None
}

async fn zones_handler(State(state): State<Arc<StubState>>, headers: HeaderMap) -> Response {
    state.zone_requests.fetch_add(1, Ordering::SeqCst);

    if let Some(response) = observe(&state, &headers).await {
        return response;
    }

    Json(state.catalog.clone()).into_response()
}

async fn forecast_handler(
    State(state): State<Arc<StubState>>,
    Path(zone_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.forecast_requests.fetch_add(1, Ordering::SeqCst);
    *state.per_zone.lock().await.entry(zone_id.clone()).or_insert(0) += 1;

    if let Some(response) = observe(&state, &headers).await {
        return response;
    }

    let document = state
        .forecasts
        .get(&zone_id)
        .cloned()
        .unwrap_or_else(|| fixtures::zone_forecast(&zone_id, state.default_periods));

    Json(document).into_response()
}
