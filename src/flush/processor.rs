use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::key::{parse_key, should_process};
use super::snapshot::{FlushEvent, MetricSnapshot, TimerData};
use crate::backends::{BackendRegistry, Destination, InitError};
use crate::metrics::MetricsRecorder;
use crate::telemetry::{ExceptionTelemetry, MetricTelemetry, Properties, TelemetryClient};
use crate::utils::log_throttle::should_emit;

const DECODE_FAILURE_LOG_WINDOW: Duration = Duration::from_secs(60);

/// How many metrics of each category went to one destination during a flush.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ForwardedCounts {
    pub counters: u64,
    pub timers: u64,
    pub gauges: u64,
}

/// Turns flush events into tracked metrics on every destination.
///
/// Flushes are processed one at a time: a flush arriving while another is
/// still delivering waits for it.
pub struct FlushProcessor {
    registry: Arc<BackendRegistry>,
    recorder: Arc<dyn MetricsRecorder>,
    delivery_timeout: Duration,
    in_flight: Mutex<()>,
}

impl FlushProcessor {
    /// Fails if any destination in `registry` has not been initialized.
    pub fn new(
        registry: Arc<BackendRegistry>,
        recorder: Arc<dyn MetricsRecorder>,
        delivery_timeout: Duration,
    ) -> Result<Self, InitError> {
        registry.ensure_initialized()?;
        Ok(FlushProcessor {
            registry,
            recorder,
            delivery_timeout,
            in_flight: Mutex::new(()),
        })
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Runs `on_flush` on its own task. Dropping the handle does not cancel
    /// delivery of a batch already taken from the clients.
    pub fn spawn_flush(self: &Arc<Self>, event: FlushEvent) -> JoinHandle<()> {
        let processor = Arc::clone(self);
        tokio::spawn(async move { processor.on_flush(&event).await })
    }

    /// Processes one flush: filter, decode and track every metric for every
    /// destination, then deliver. Never fails; problems are logged and reported.
    pub async fn on_flush(&self, event: &FlushEvent) {
        let _guard = self.in_flight.lock().await;
        let started = Instant::now();
        info!(
            event_name = "flush.started",
            event_domain = "flush",
            timestamp = event.timestamp.as_str(),
            metrics = event.metrics.len(),
            "OnFlush called"
        );

        for destination in self.registry.destinations() {
            let Some(client) = destination.client() else {
                warn!(
                    destination = destination.label(),
                    "Skipping uninitialized destination"
                );
                continue;
            };
            let counts = self.process_destination(destination, client.as_ref(), &event.metrics);
            self.report_counts(destination, counts);
        }

        self.deliver().await;

        let elapsed = started.elapsed();
        self.recorder.record_flush(elapsed.as_secs_f64());
        info!(
            event_name = "flush.completed",
            event_domain = "flush",
            timestamp = event.timestamp.as_str(),
            duration_ms = elapsed.as_millis() as u64,
            "OnFlush completed"
        );
    }

    /// Tracks every metric of `snapshot` that passes the destination's filter.
    pub fn process_destination(
        &self,
        destination: &Destination,
        client: &dyn TelemetryClient,
        snapshot: &MetricSnapshot,
    ) -> ForwardedCounts {
        let mut counts = ForwardedCounts::default();

        for (key, value) in &snapshot.counters {
            if let Some((name, properties)) = self.route(destination, client, key) {
                client.track_metric(MetricTelemetry::scalar(name, *value, properties));
                counts.counters += 1;
            }
        }

        for (key, timer) in &snapshot.timer_data {
            if let Some((name, properties)) = self.route(destination, client, key) {
                client.track_metric(timer_metric(name, timer, properties));
                counts.timers += 1;
            }
        }

        for (key, value) in &snapshot.gauges {
            if let Some((name, properties)) = self.route(destination, client, key) {
                client.track_metric(MetricTelemetry::scalar(name, *value, properties));
                counts.gauges += 1;
            }
        }

        counts
    }

    /// Filters and decodes one key. A properties payload that fails to decode
    /// is reported as an exception and the metric goes out without properties.
    fn route(
        &self,
        destination: &Destination,
        client: &dyn TelemetryClient,
        key: &str,
    ) -> Option<(String, Option<Properties>)> {
        if !should_process(
            key,
            destination.prefix(),
            destination.forwards_internal_metrics(),
        ) {
            return None;
        }

        let parsed = parse_key(key, destination.prefix());
        let properties = match parsed.properties {
            Ok(properties) => properties,
            Err(e) => {
                client.track_exception(
                    ExceptionTelemetry::new(
                        "Error",
                        format!("Failed to parse properties string from key '{}': {}", key, e),
                    )
                    .with_property("statsd.key", key)
                    .with_property("error", e.to_string()),
                );
                self.recorder.record_decode_failure(destination.label());

                let throttle_key = format!("flush.decode_failure.{}", destination.label());
                if let Some(suppressed_count) = should_emit(&throttle_key, DECODE_FAILURE_LOG_WINDOW)
                {
                    warn!(
                        event_name = "flush.key.decode_failed",
                        event_domain = "flush",
                        destination = destination.label(),
                        key,
                        error = %e,
                        suppressed_count,
                        "metric properties could not be decoded, forwarding without properties"
                    );
                }
                None
            }
        };
        Some((parsed.name, properties))
    }

    fn report_counts(&self, destination: &Destination, counts: ForwardedCounts) {
        let label = destination.label();
        info!(destination = label, "{} counters tracked", counts.counters);
        info!(destination = label, "{} timer data tracked", counts.timers);
        info!(destination = label, "{} gauges tracked", counts.gauges);

        self.recorder
            .record_forwarded(label, "counters", counts.counters);
        self.recorder
            .record_forwarded(label, "timer_data", counts.timers);
        self.recorder.record_forwarded(label, "gauges", counts.gauges);
    }

    /// Flushes every destination's client concurrently, each bounded by the
    /// delivery timeout.
    async fn deliver(&self) {
        let deliveries = self
            .registry
            .destinations()
            .iter()
            .filter_map(|d| d.client().map(|c| (d, c)))
            .map(|(destination, client)| async move {
                let result = timeout(self.delivery_timeout, client.flush()).await;
                (destination, result)
            });

        for (destination, result) in join_all(deliveries).await {
            match result {
                Ok(Ok(())) => debug!(destination = destination.label(), "Telemetry delivered"),
                Ok(Err(e)) => {
                    warn!(
                        event_name = "flush.delivery.failed",
                        event_domain = "flush",
                        destination = destination.label(),
                        "Telemetry delivery failed: {}",
                        e
                    );
                    self.recorder
                        .record_delivery_failure(destination.label(), "error");
                }
                Err(_) => {
                    warn!(
                        event_name = "flush.delivery.timeout",
                        event_domain = "flush",
                        destination = destination.label(),
                        timeout_ms = self.delivery_timeout.as_millis() as u64,
                        "Telemetry delivery timed out"
                    );
                    self.recorder
                        .record_delivery_failure(destination.label(), "timeout");
                }
            }
        }
    }
}

/// Sum is the value; count, lower, upper and std fill the aggregate fields in that order.
fn timer_metric(name: String, timer: &TimerData, properties: Option<Properties>) -> MetricTelemetry {
    MetricTelemetry {
        name,
        value: timer.sum,
        count: Some(timer.count),
        min: Some(timer.lower),
        max: Some(timer.upper),
        std_dev: Some(timer.std),
        properties,
    }
}
