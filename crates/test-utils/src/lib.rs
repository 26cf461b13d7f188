//! Shared test utilities for the zone forecast workspace.
//!
//! This crate provides common testing infrastructure including:
//! - NWS-shaped JSON fixtures for zone catalogs and zone forecasts
//! - A stub upstream weather service bound to an ephemeral port
//! - Polling helpers for asserting on background work
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../../crates/test-utils" }
//! ```

pub mod fixtures;
pub mod stub_server;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use stub_server::{StubBuilder, StubWeatherService};

use std::future::Future;
use std::time::Duration;

/// Poll `condition` every 10ms until it holds or `timeout` passes.
///
/// Returns whether the condition was observed.
pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
