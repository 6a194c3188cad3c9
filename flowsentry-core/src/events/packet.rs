//! Packet observation record handed from capture to the analysis pipeline.

use std::net::IpAddr;

/// IP protocol number for TCP, the only transport accepted at the capture
/// boundary.
pub const PROTO_TCP: u8 = 6;

/// One observed packet, decoded down to the transport header.
///
/// Immutable after construction; the capture boundary guarantees that
/// transport fields are present (non-TCP and truncated frames never reach
/// the pipeline).
#[derive(Clone, Debug, PartialEq)]
pub struct PacketRecord {
    /// Capture timestamp, nanoseconds since the Unix epoch.
    pub timestamp_ns: u64,
    pub src_ip: IpAddr,
    pub dst_ip: IpAddr,
    pub src_port: u16,
    pub dst_port: u16,
    /// IP protocol number (6 = TCP).
    pub protocol: u8,
    /// Frame length on the wire, in bytes.
    pub length: u32,
    /// Transport flag bits, FIN|SYN|RST|PSH|ACK|URG from low to high.
    pub tcp_flags: u8,
    /// Advertised receive window of the triggering segment.
    pub window_size: u16,
}

impl PacketRecord {
    pub const FIN: u8 = 0x01;
    pub const SYN: u8 = 0x02;
    pub const RST: u8 = 0x04;
    pub const PSH: u8 = 0x08;
    pub const ACK: u8 = 0x10;
    pub const URG: u8 = 0x20;
}
