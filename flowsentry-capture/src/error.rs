//! Capture boundary errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Capture device '{0}' not found")]
    DeviceNotFound(String),

    #[error("pcap error: {0}")]
    Pcap(#[from] pcap::Error),
}
