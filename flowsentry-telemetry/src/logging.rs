//! Structured logging setup with tracing.

use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global fmt subscriber. Filter defaults to `info` and is
    /// overridable through `RUST_LOG`.
    pub fn init() {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_thread_names(true)
            .init()
    }
}
