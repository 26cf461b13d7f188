//! Error types for the zone forecast services.

use thiserror::Error;

/// Result type alias using ForecastError.
pub type ForecastResult<T> = Result<T, ForecastError>;

/// Primary error type for zone and forecast operations.
///
/// A cache miss is never an error; lookups return `Option` instead.
#[derive(Debug, Clone, Error)]
pub enum ForecastError {
    // === Upstream Errors ===
    #[error("Upstream weather service unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Injected fault for zone {zone_id} (attempt {attempt})")]
    InjectedFault { zone_id: String, attempt: u64 },

    // === Request Errors ===
    #[error("Invalid zone identifier: {0}")]
    InvalidZoneId(String),

    // === Storage Errors ===
    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // === Infrastructure Errors ===
    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl ForecastError {
    /// Get the HTTP status code for this error.
    ///
    /// Routes that serve forecasts override this and answer 404 for every
    /// failure; the zone list uses the default mapping.
    pub fn http_status_code(&self) -> u16 {
        match self {
            ForecastError::UpstreamUnavailable(_) => 502,
            ForecastError::InvalidZoneId(_) => 400,
            _ => 500,
        }
    }

    /// True when the failure was synthesized by fault injection rather than
    /// observed on the wire.
    pub fn is_fault_injected(&self) -> bool {
        matches!(self, ForecastError::InjectedFault { .. })
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::Serialization(err.to_string())
    }
}
