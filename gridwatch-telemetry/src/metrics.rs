//! Prometheus counters for the pipeline.

use prometheus::{Counter, Registry};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub packets_analyzed: Counter,
    pub threats_detected: Counter,
    pub blocks_issued: Counter,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        let registry = Registry::new();
        let packets_analyzed = Counter::new(
            "gridwatch_packets_analyzed_total",
            "Frames inspected by the analyzer",
        )
        .unwrap();
        let threats_detected = Counter::new(
            "gridwatch_threats_detected_total",
            "Threats reported by the detectors",
        )
        .unwrap();
        let blocks_issued = Counter::new(
            "gridwatch_blocks_issued_total",
            "Accepted block actions",
        )
        .unwrap();

        registry
            .register(Box::new(packets_analyzed.clone()))
            .unwrap();
        registry
            .register(Box::new(threats_detected.clone()))
            .unwrap();
        registry.register(Box::new(blocks_issued.clone())).unwrap();

        Self {
            registry,
            packets_analyzed,
            threats_detected,
            blocks_issued,
        }
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer).unwrap_or_default())
    }
}
