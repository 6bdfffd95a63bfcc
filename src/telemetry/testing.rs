use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::client::{ExceptionTelemetry, MetricTelemetry, TelemetryClient, TelemetryError};

/// In-memory client that records every call, for unit tests.
#[derive(Default)]
pub struct RecordingClient {
    tags: Mutex<HashMap<String, String>>,
    metrics: Mutex<Vec<MetricTelemetry>>,
    exceptions: Mutex<Vec<ExceptionTelemetry>>,
    flushes: Mutex<usize>,
}

impl RecordingClient {
    pub fn tags(&self) -> HashMap<String, String> {
        self.tags.lock().unwrap().clone()
    }

    pub fn metrics(&self) -> Vec<MetricTelemetry> {
        self.metrics.lock().unwrap().clone()
    }

    pub fn exceptions(&self) -> Vec<ExceptionTelemetry> {
        self.exceptions.lock().unwrap().clone()
    }

    pub fn flushes(&self) -> usize {
        *self.flushes.lock().unwrap()
    }
}

#[async_trait]
impl TelemetryClient for RecordingClient {
    fn set_tag(&self, key: &str, value: &str) {
        self.tags
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    fn track_metric(&self, metric: MetricTelemetry) {
        self.metrics.lock().unwrap().push(metric);
    }

    fn track_exception(&self, exception: ExceptionTelemetry) {
        self.exceptions.lock().unwrap().push(exception);
    }

    async fn flush(&self) -> Result<(), TelemetryError> {
        *self.flushes.lock().unwrap() += 1;
        Ok(())
    }
}
