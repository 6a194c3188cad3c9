//! Packet capture and intake-queue configuration.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

/// Capture boundary parameters.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct CaptureConfig {
    /// Network interface for live capture.
    #[validate(custom(function = validation::validate_interface))]
    #[serde(default = "default_interface")]
    pub interface: String,

    /// Run in promiscuous mode?
    #[serde(default = "default_promiscuous")]
    pub promiscuous: bool,

    /// Capture snapshot/buffer size in bytes.
    #[validate(range(min = 4096, max = 1073741824))]
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Capacity of the capture-to-analysis queue (must be a power of two).
    /// A full queue drops incoming records rather than blocking capture.
    #[validate(range(min = 128, max = 1048576))]
    #[validate(custom(function = validation::validate_power_of_two))]
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_interface() -> String {
    "eth0".into()
}

fn default_promiscuous() -> bool {
    true
}

fn default_buffer_size() -> usize {
    1048576
}

fn default_queue_capacity() -> usize {
    4096
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interface: default_interface(),
            promiscuous: default_promiscuous(),
            buffer_size: default_buffer_size(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_capture_config_is_valid() {
        CaptureConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_non_power_of_two_queue() {
        let mut config = CaptureConfig::default();
        config.queue_capacity = 5000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_interface_name() {
        let mut config = CaptureConfig::default();
        config.interface = "eth0; rm -rf".into();
        assert!(config.validate().is_err());
    }
}
