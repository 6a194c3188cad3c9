//! Pipeline-level error type, aggregating component failures.

use std::path::PathBuf;

use thiserror::Error;

use flowsentry_alerts::SinkError;
use flowsentry_capture::CaptureError;
use flowsentry_config::ConfigError;
use flowsentry_detection::{AnomalyError, RuleError};

/// Errors surfaced by the orchestration layer.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("signature rule error: {0}")]
    Rule(#[from] RuleError),

    #[error("anomaly scorer error: {0}")]
    Anomaly(#[from] AnomalyError),

    #[error("alert sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("training file not found: {0}")]
    TrainingFileNotFound(PathBuf),

    #[error("queue capacity {0} is not a power of two")]
    InvalidQueueCapacity(usize),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
