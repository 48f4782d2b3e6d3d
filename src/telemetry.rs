//! Tracing setup for the sidecar binary.
//!
//! Builds a `tracing-subscriber` stack honoring `RUST_LOG` and hands out the
//! HTTP trace layer applied to the admin surface.

use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// Telemetry registration handle.
#[derive(Debug, Default)]
pub struct Telemetry {
    name: &'static str,
    version: &'static str,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn with_version(mut self, version: &'static str) -> Self {
        self.version = version;
        self
    }

    /// Install the global subscriber. Call once, from `main`.
    pub fn register(self) -> Self {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(filter).init();
        tracing::info!(name = self.name, version = self.version, "telemetry initialized");
        self
    }

    /// Request/response tracing layer for the HTTP surface.
    pub fn http_tracing(&self) -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
        TraceLayer::new_for_http()
    }
}
