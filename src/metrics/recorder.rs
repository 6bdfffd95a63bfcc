//! Metrics recording implementation using Prometheus.

use prometheus::{
    register_counter_vec_with_registry, register_histogram_with_registry,
    register_int_counter_with_registry, CounterVec, Encoder, Histogram, IntCounter, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;

/// Trait for recording what the flush pipeline did.
pub trait MetricsRecorder: Send + Sync + 'static {
    /// Records a completed flush and how long it took end to end.
    fn record_flush(&self, duration_secs: f64);

    /// Records how many metrics of one category went to a destination.
    fn record_forwarded(&self, destination: &str, category: &str, count: u64);

    /// Records a key whose properties payload could not be decoded.
    fn record_decode_failure(&self, destination: &str);

    /// Records a failed or timed-out delivery to a destination.
    fn record_delivery_failure(&self, destination: &str, reason: &str);
}

/// Prometheus metrics collector.
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,

    flushes_total: IntCounter,
    flush_duration_seconds: Histogram,

    metrics_forwarded_total: CounterVec,
    decode_failures_total: CounterVec,
    delivery_failures_total: CounterVec,
}

impl Metrics {
    /// Creates a new metrics instance with its own Prometheus registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Arc::new(Registry::new());

        let flushes_total = register_int_counter_with_registry!(
            Opts::new("aibackend_flushes_total", "Total number of processed flushes"),
            registry.clone()
        )?;

        let flush_duration_seconds = register_histogram_with_registry!(
            "aibackend_flush_duration_seconds",
            "Flush processing duration in seconds, delivery included",
            vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
            registry.clone()
        )?;

        let metrics_forwarded_total = register_counter_vec_with_registry!(
            Opts::new(
                "aibackend_metrics_forwarded_total",
                "Metrics forwarded per destination and category"
            ),
            &["destination", "category"],
            registry.clone()
        )?;

        let decode_failures_total = register_counter_vec_with_registry!(
            Opts::new(
                "aibackend_decode_failures_total",
                "Metric keys whose properties could not be decoded"
            ),
            &["destination"],
            registry.clone()
        )?;

        let delivery_failures_total = register_counter_vec_with_registry!(
            Opts::new(
                "aibackend_delivery_failures_total",
                "Telemetry deliveries that failed or timed out"
            ),
            &["destination", "reason"],
            registry.clone()
        )?;

        Ok(Metrics {
            registry,
            flushes_total,
            flush_duration_seconds,
            metrics_forwarded_total,
            decode_failures_total,
            delivery_failures_total,
        })
    }

    /// Renders all metrics in Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl MetricsRecorder for Metrics {
    fn record_flush(&self, duration_secs: f64) {
        self.flushes_total.inc();
        self.flush_duration_seconds.observe(duration_secs);
    }

    fn record_forwarded(&self, destination: &str, category: &str, count: u64) {
        self.metrics_forwarded_total
            .with_label_values(&[destination, category])
            .inc_by(count as f64);
    }

    fn record_decode_failure(&self, destination: &str) {
        self.decode_failures_total
            .with_label_values(&[destination])
            .inc();
    }

    fn record_delivery_failure(&self, destination: &str, reason: &str) {
        self.delivery_failures_total
            .with_label_values(&[destination, reason])
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_recorded_values() {
        let metrics = Metrics::new().unwrap();
        metrics.record_flush(0.02);
        metrics.record_forwarded("app1.", "counters", 3);
        metrics.record_decode_failure("*");
        metrics.record_delivery_failure("*", "timeout");

        let text = metrics.render().unwrap();
        assert!(text.contains("aibackend_flushes_total 1"));
        assert!(text.contains(
            r#"aibackend_metrics_forwarded_total{category="counters",destination="app1."} 3"#
        ));
        assert!(text.contains(r#"aibackend_decode_failures_total{destination="*"} 1"#));
        assert!(text.contains(
            r#"aibackend_delivery_failures_total{destination="*",reason="timeout"} 1"#
        ));
    }
}
