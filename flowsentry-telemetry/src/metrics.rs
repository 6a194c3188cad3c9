//! Prometheus metrics for the detection pipeline.

use prometheus::{Counter, Gauge, Histogram, HistogramOpts, Registry};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    /// Packets processed by the consumer pipeline.
    pub packets_total: Counter,
    /// Records dropped because the queue was full.
    pub packets_dropped: Counter,
    /// Threats emitted by the detection engine.
    pub threats_total: Counter,
    /// Alerts forwarded to the sink.
    pub alerts_total: Counter,
    /// Threats suppressed by the dispatcher throttle window.
    pub alerts_suppressed: Counter,
    /// Flows currently tracked by the analyzer.
    pub flows_active: Gauge,
    /// 1 when the anomaly scorer is trained, 0 in signature-only mode.
    pub anomaly_trained: Gauge,
    /// Per-packet detection latency.
    pub detection_latency: Histogram,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        let registry = Registry::new();

        let packets_total =
            Counter::new("flowsentry_packets_total", "Packets processed by the pipeline").unwrap();
        let packets_dropped = Counter::new(
            "flowsentry_packets_dropped_total",
            "Packets dropped on a full queue",
        )
        .unwrap();
        let threats_total = Counter::new(
            "flowsentry_threats_total",
            "Threats emitted by the detection engine",
        )
        .unwrap();
        let alerts_total =
            Counter::new("flowsentry_alerts_total", "Alerts forwarded to the sink").unwrap();
        let alerts_suppressed = Counter::new(
            "flowsentry_alerts_suppressed_total",
            "Threats suppressed by the throttle window",
        )
        .unwrap();
        let flows_active =
            Gauge::new("flowsentry_flows_active", "Flows currently tracked").unwrap();
        let anomaly_trained = Gauge::new(
            "flowsentry_anomaly_trained",
            "Whether the anomaly scorer is trained (1) or signature-only (0)",
        )
        .unwrap();
        let detection_latency = Histogram::with_opts(
            HistogramOpts::new(
                "flowsentry_detection_latency_ns",
                "Detection engine processing time per packet",
            )
            .buckets(vec![1_000.0, 10_000.0, 100_000.0, 1_000_000.0]),
        )
        .unwrap();

        registry.register(Box::new(packets_total.clone())).unwrap();
        registry.register(Box::new(packets_dropped.clone())).unwrap();
        registry.register(Box::new(threats_total.clone())).unwrap();
        registry.register(Box::new(alerts_total.clone())).unwrap();
        registry
            .register(Box::new(alerts_suppressed.clone()))
            .unwrap();
        registry.register(Box::new(flows_active.clone())).unwrap();
        registry.register(Box::new(anomaly_trained.clone())).unwrap();
        registry
            .register(Box::new(detection_latency.clone()))
            .unwrap();

        Self {
            registry,
            packets_total,
            packets_dropped,
            threats_total,
            alerts_total,
            alerts_suppressed,
            flows_active,
            anomaly_trained,
            detection_latency,
        }
    }

    /// Text-encodes the registry for scraping or a shutdown summary.
    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_register_and_gather() {
        let metrics = MetricsRecorder::new();
        metrics.packets_total.inc();
        metrics.packets_dropped.inc();
        metrics.anomaly_trained.set(1.0);

        let text = metrics.gather_metrics().unwrap();
        assert!(text.contains("flowsentry_packets_total 1"));
        assert!(text.contains("flowsentry_packets_dropped_total 1"));
        assert!(text.contains("flowsentry_anomaly_trained 1"));
    }
}
