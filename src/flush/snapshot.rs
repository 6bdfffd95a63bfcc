use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::utils::value::value_to_string;

/// Aggregates statsd computes for one timer over a flush interval.
///
/// Timers that saw no samples only carry a zero `count`; the rest default to 0.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq)]
#[serde(default)]
pub struct TimerData {
    pub sum: f64,
    pub count: f64,
    pub lower: f64,
    pub upper: f64,
    pub std: f64,
}

/// Point-in-time metrics handed over on each flush.
///
/// Any category missing from the payload is treated as empty.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct MetricSnapshot {
    #[serde(default)]
    pub counters: HashMap<String, f64>,
    #[serde(default)]
    pub timer_data: HashMap<String, TimerData>,
    #[serde(default)]
    pub gauges: HashMap<String, f64>,
}

impl MetricSnapshot {
    /// Total number of keys across all categories.
    pub(crate) fn len(&self) -> usize {
        self.counters.len() + self.timer_data.len() + self.gauges.len()
    }
}

/// A flush signal: when it happened and what was aggregated.
#[derive(Deserialize, Debug, Clone)]
pub struct FlushEvent {
    #[serde(deserialize_with = "timestamp_as_string")]
    pub timestamp: String,
    #[serde(default)]
    pub metrics: MetricSnapshot,
}

impl FlushEvent {
    pub fn new(timestamp: impl Into<String>, metrics: MetricSnapshot) -> Self {
        FlushEvent {
            timestamp: timestamp.into(),
            metrics,
        }
    }
}

// statsd hands over unix seconds, other senders may use strings.
fn timestamp_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(value_to_string)
}
