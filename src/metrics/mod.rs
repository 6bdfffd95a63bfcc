//! Metrics collection and exposition for Prometheus.
//!
//! Counts what the service itself does: flushes, forwarded metrics and failures.

mod recorder;

pub use recorder::{Metrics, MetricsRecorder};
