//! Alert sinks: append-only destinations for serialized alert records.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use parking_lot::Mutex;
use thiserror::Error;

use crate::alert::Alert;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Alert serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Alert sink I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination for alerts. Each call persists one complete, independently
/// parseable record; delivery is best effort and failures must never block
/// the consumer.
pub trait AlertSink: Send + Sync {
    fn write_alert(&self, alert: &Alert) -> Result<(), SinkError>;

    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Appends alerts to a file as JSON lines.
///
/// Each record is serialized to a single line and written with one call, so
/// readers never observe a partial record.
pub struct JsonLinesSink {
    file: Mutex<File>,
}

impl JsonLinesSink {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AlertSink for JsonLinesSink {
    fn write_alert(&self, alert: &Alert) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(alert)?;
        line.push('\n');
        self.file.lock().write_all(line.as_bytes())?;
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.file.lock().flush()?;
        Ok(())
    }
}

/// Collects alerts in memory; used by tests and the training report.
#[derive(Default)]
pub struct MemorySink {
    alerts: Mutex<Vec<Alert>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.alerts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.lock().is_empty()
    }
}

impl AlertSink for MemorySink {
    fn write_alert(&self, alert: &Alert) -> Result<(), SinkError> {
        self.alerts.lock().push(alert.clone());
        Ok(())
    }
}
