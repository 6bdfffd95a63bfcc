use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::client::{
    ExceptionTelemetry, MetricTelemetry, Properties, TelemetryClient, TelemetryError,
};

const SDK_VERSION: &str = concat!("aibackend-rs:", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    name: String,
    time: String,
    i_key: String,
    tags: HashMap<String, String>,
    data: Data,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Data {
    base_type: &'static str,
    base_data: BaseData,
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
enum BaseData {
    Metric(MetricData),
    Exception(ExceptionData),
}

#[derive(Serialize, Debug)]
struct MetricData {
    ver: u8,
    metrics: Vec<DataPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    properties: Option<Properties>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct DataPoint {
    name: String,
    /// 0 = measurement, 1 = aggregation
    kind: u8,
    value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    std_dev: Option<f64>,
}

#[derive(Serialize, Debug)]
struct ExceptionData {
    ver: u8,
    exceptions: Vec<ExceptionDetails>,
    properties: Properties,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ExceptionDetails {
    type_name: String,
    message: String,
    has_full_stack: bool,
}

/// Application Insights client bound to one instrumentation key.
///
/// Items are buffered as envelopes and posted as a JSON array on `flush`.
pub struct AppInsightsClient {
    instrumentation_key: String,
    endpoint: String,
    http: reqwest::Client,
    tags: Mutex<HashMap<String, String>>,
    buffer: Mutex<Vec<Envelope>>,
}

impl AppInsightsClient {
    /// Creates a client for `instrumentation_key`, which must be a GUID.
    pub fn new(instrumentation_key: &str, endpoint: &str) -> Result<Self, String> {
        let key = Uuid::parse_str(instrumentation_key.trim())
            .map_err(|e| format!("invalid instrumentation key '{}': {}", instrumentation_key, e))?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| format!("failed to build HTTP client: {}", e))?;

        let mut tags = HashMap::new();
        tags.insert("ai.internal.sdkVersion".to_string(), SDK_VERSION.to_string());

        Ok(AppInsightsClient {
            instrumentation_key: key.hyphenated().to_string(),
            endpoint: endpoint.to_string(),
            http,
            tags: Mutex::new(tags),
            buffer: Mutex::new(Vec::new()),
        })
    }

    #[cfg(test)]
    fn pending(&self) -> usize {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn envelope(&self, kind: &str, base_type: &'static str, base_data: BaseData) -> Envelope {
        let tags = self
            .tags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Envelope {
            name: format!(
                "Microsoft.ApplicationInsights.{}.{}",
                self.instrumentation_key.replace('-', ""),
                kind
            ),
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            i_key: self.instrumentation_key.clone(),
            tags,
            data: Data {
                base_type,
                base_data,
            },
        }
    }

    fn push(&self, envelope: Envelope) {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(envelope);
    }
}

#[async_trait]
impl TelemetryClient for AppInsightsClient {
    fn set_tag(&self, key: &str, value: &str) {
        self.tags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }

    fn track_metric(&self, metric: MetricTelemetry) {
        let kind = u8::from(metric.is_aggregation());
        let point = DataPoint {
            name: metric.name,
            kind,
            value: metric.value,
            count: metric.count,
            min: metric.min,
            max: metric.max,
            std_dev: metric.std_dev,
        };
        let data = BaseData::Metric(MetricData {
            ver: 2,
            metrics: vec![point],
            properties: metric.properties,
        });
        self.push(self.envelope("Metric", "MetricData", data));
    }

    fn track_exception(&self, exception: ExceptionTelemetry) {
        let data = BaseData::Exception(ExceptionData {
            ver: 2,
            exceptions: vec![ExceptionDetails {
                type_name: exception.type_name,
                message: exception.message,
                has_full_stack: false,
            }],
            properties: exception.properties,
        });
        self.push(self.envelope("Exception", "ExceptionData", data));
    }

    async fn flush(&self) -> Result<(), TelemetryError> {
        let batch = std::mem::take(&mut *self.buffer.lock().unwrap_or_else(PoisonError::into_inner));
        if batch.is_empty() {
            return Ok(());
        }

        let body = serde_json::to_vec(&batch)?;
        debug!(
            "Sending {} telemetry items to {}",
            batch.len(),
            self.endpoint
        );
        let response = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(TelemetryError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}
