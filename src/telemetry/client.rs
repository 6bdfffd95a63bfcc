use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

/// String-to-string custom dimensions attached to a telemetry item.
pub type Properties = HashMap<String, String>;

/// Context tag keys understood by the ingestion service.
pub mod tag_keys {
    pub const ROLE_NAME: &str = "ai.cloud.role";
    pub const ROLE_INSTANCE: &str = "ai.cloud.roleInstance";
}

/// A single tracked metric.
///
/// Scalars (counters and gauges) only set `value`; timer aggregates also carry
/// `count`, `min`, `max` and `std_dev`. `properties: None` and an empty map are
/// different things and are kept apart all the way to the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricTelemetry {
    pub name: String,
    pub value: f64,
    pub count: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub std_dev: Option<f64>,
    pub properties: Option<Properties>,
}

impl MetricTelemetry {
    /// A single-valued measurement.
    pub fn scalar(name: impl Into<String>, value: f64, properties: Option<Properties>) -> Self {
        MetricTelemetry {
            name: name.into(),
            value,
            count: None,
            min: None,
            max: None,
            std_dev: None,
            properties,
        }
    }

    /// True when any of the aggregate fields is set.
    pub fn is_aggregation(&self) -> bool {
        self.count.is_some() || self.min.is_some() || self.max.is_some() || self.std_dev.is_some()
    }
}

/// A non-fatal error reported through the telemetry pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionTelemetry {
    pub type_name: String,
    pub message: String,
    pub properties: Properties,
}

impl ExceptionTelemetry {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        ExceptionTelemetry {
            type_name: type_name.into(),
            message: message.into(),
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Error sending telemetry: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Ingestion endpoint returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Error serializing telemetry: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Outbound contract of a telemetry sink.
///
/// `track_*` calls never block: they buffer the item and return. Buffered items
/// are delivered by `flush`, which is the only call that touches the network.
#[async_trait]
pub trait TelemetryClient: Send + Sync {
    /// Sets a context tag carried by every item tracked afterwards.
    fn set_tag(&self, key: &str, value: &str);

    fn track_metric(&self, metric: MetricTelemetry);

    fn track_exception(&self, exception: ExceptionTelemetry);

    /// Delivers everything buffered so far.
    async fn flush(&self) -> Result<(), TelemetryError>;
}
