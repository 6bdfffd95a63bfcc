//! Outbound telemetry: the client contract every destination talks to and the
//! Application Insights implementation of it.

pub mod appinsights;
pub mod client;

pub use appinsights::AppInsightsClient;
pub use client::{
    tag_keys, ExceptionTelemetry, MetricTelemetry, Properties, TelemetryClient, TelemetryError,
};

#[cfg(test)]
pub mod testing;
