//! Shared application state.

use crate::config::ConfigV1;
use crate::flush::FlushProcessor;
use crate::metrics::Metrics;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded at startup.
    pub config: Arc<ConfigV1>,
    /// Flush processor over the initialized destinations.
    pub processor: Arc<FlushProcessor>,
    /// Self-observability counters exposed on `/metrics`.
    pub metrics: Metrics,
}
