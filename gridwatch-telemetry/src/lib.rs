//! # GridWatch Telemetry
//!
//! Observability for the pipeline: structured console logging, Prometheus
//! counters, and the dashboard state publisher that feeds the operator UI
//! through an atomically rewritten JSON document.

pub mod dashboard;
pub mod logging;
pub mod metrics;

pub use dashboard::{AlertKind, DashboardPublisher, SystemStatus};
pub use logging::EventLogger;
pub use metrics::MetricsRecorder;
