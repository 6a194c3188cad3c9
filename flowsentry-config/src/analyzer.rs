//! Flow-table housekeeping configuration.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

/// Flow table eviction parameters. Keeps memory bounded under long-running
/// operation by sweeping flows that have gone idle.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct AnalyzerConfig {
    /// Flows idle longer than this are evicted (seconds).
    #[validate(range(min = 1, max = 86400))]
    #[serde(default = "default_idle_timeout")]
    pub flow_idle_timeout_secs: u64,

    /// How often the eviction sweep runs (seconds).
    #[validate(range(min = 1, max = 3600))]
    #[serde(default = "default_eviction_interval")]
    pub eviction_interval_secs: u64,
}

fn default_idle_timeout() -> u64 {
    300
}

fn default_eviction_interval() -> u64 {
    30
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            flow_idle_timeout_secs: default_idle_timeout(),
            eviction_interval_secs: default_eviction_interval(),
        }
    }
}
