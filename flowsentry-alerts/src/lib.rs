//! # flowsentry-alerts
//!
//! Terminal stage of the pipeline: converts threats into severity-classified
//! alerts, de-duplicates hot repeats, and forwards each alert to a sink as a
//! self-contained JSON-lines record.

pub mod alert;
pub mod dispatcher;
pub mod sink;

pub use alert::{severity_for, Alert, Severity};
pub use dispatcher::AlertDispatcher;
pub use sink::{AlertSink, JsonLinesSink, MemorySink, SinkError};
