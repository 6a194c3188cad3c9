//! Offline replay from a pcap capture file.

use std::path::Path;

use pcap::Capture;
use tracing::debug;

use flowsentry_core::events::PacketRecord;

use crate::decode::decode_frame;
use crate::error::CaptureError;

/// Reads a pcap file end to end, invoking `callback` for every decodable
/// TCP record. Returns the number of records delivered.
pub fn replay_file<P, F>(path: P, mut callback: F) -> Result<u64, CaptureError>
where
    P: AsRef<Path>,
    F: FnMut(PacketRecord),
{
    let mut cap = Capture::from_file(path.as_ref())?;
    let mut delivered = 0u64;

    loop {
        match cap.next_packet() {
            Ok(packet) => {
                let ts = packet.header.ts.tv_sec as u64 * 1_000_000_000
                    + packet.header.ts.tv_usec as u64 * 1_000;
                if let Some(record) = decode_frame(packet.data, ts, packet.header.len) {
                    callback(record);
                    delivered += 1;
                }
            }
            Err(pcap::Error::NoMorePackets) => break,
            Err(e) => return Err(e.into()),
        }
    }

    debug!(delivered, "replay finished");
    Ok(delivered)
}
