//! Live capture loop on a network interface.

use std::sync::atomic::{AtomicBool, Ordering};

use pcap::{Capture, Device};
use tracing::{debug, warn};

use flowsentry_core::events::PacketRecord;

use crate::decode::decode_frame;
use crate::error::CaptureError;

fn timestamp_ns(header: &pcap::PacketHeader) -> u64 {
    header.ts.tv_sec as u64 * 1_000_000_000 + header.ts.tv_usec as u64 * 1_000
}

/// Runs a live capture loop on the specified interface, invoking `callback`
/// for every decodable TCP record. Blocks until `terminate` is set.
///
/// The pcap read timeout keeps the loop responsive to the terminate flag on
/// quiet interfaces.
pub fn run_capture_loop<F>(
    interface: &str,
    buffer_size: usize,
    promiscuous: bool,
    terminate: &AtomicBool,
    mut callback: F,
) -> Result<(), CaptureError>
where
    F: FnMut(PacketRecord),
{
    let device = Device::list()?
        .into_iter()
        .find(|d| d.name == interface)
        .ok_or_else(|| CaptureError::DeviceNotFound(interface.to_string()))?;

    let mut cap = Capture::from_device(device)?
        .promisc(promiscuous)
        .snaplen(buffer_size as i32)
        .timeout(1000)
        .open()?;

    debug!(interface, promiscuous, "capture opened");

    while !terminate.load(Ordering::Relaxed) {
        match cap.next_packet() {
            Ok(packet) => {
                let ts = timestamp_ns(packet.header);
                if let Some(record) = decode_frame(packet.data, ts, packet.header.len) {
                    callback(record);
                }
            }
            Err(pcap::Error::TimeoutExpired) => {
                // No packet in this window; re-check the terminate flag.
                continue;
            }
            Err(e) => {
                warn!("capture read failed: {e}");
                return Err(e.into());
            }
        }
    }

    Ok(())
}
