//! Alert destination configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

/// Alert sink and throttling parameters.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct AlertsConfig {
    /// JSON-lines file alerts are appended to.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Repeats of the same threat within this window are suppressed
    /// (seconds; 0 disables throttling).
    #[validate(range(max = 3600))]
    #[serde(default = "default_throttle_window")]
    pub throttle_window_secs: u64,
}

fn default_log_file() -> PathBuf {
    PathBuf::from("flowsentry_alerts.jsonl")
}

fn default_throttle_window() -> u64 {
    10
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
            throttle_window_secs: default_throttle_window(),
        }
    }
}
