//! # flowsentry-telemetry
//!
//! Logging and metrics for the pipeline: tracing subscriber setup and a
//! Prometheus recorder covering packet intake, detection, and alerting.

pub mod logging;
pub mod metrics;

pub use logging::EventLogger;
pub use metrics::MetricsRecorder;
