//! Ethernet frame decoding into pipeline packet records.
//!
//! Decoding failures are not errors: frames that are not IPv4/IPv6 + TCP, or
//! that are truncated, are filtered here and counted by the caller. This is
//! the boundary that guarantees every record entering the pipeline carries
//! full transport information.

use std::net::IpAddr;

use etherparse::{NetSlice, SlicedPacket, TransportSlice};

use flowsentry_core::events::packet::{PacketRecord, PROTO_TCP};

/// Decodes a captured Ethernet frame into a [`PacketRecord`].
///
/// Returns `None` for anything that is not an IP packet carrying TCP.
pub fn decode_frame(data: &[u8], timestamp_ns: u64, wire_len: u32) -> Option<PacketRecord> {
    let sliced = SlicedPacket::from_ethernet(data).ok()?;

    let (src_ip, dst_ip): (IpAddr, IpAddr) = match &sliced.net {
        Some(NetSlice::Ipv4(ipv4)) => {
            let header = ipv4.header();
            (
                IpAddr::from(header.source_addr()),
                IpAddr::from(header.destination_addr()),
            )
        }
        Some(NetSlice::Ipv6(ipv6)) => {
            let header = ipv6.header();
            (
                IpAddr::from(header.source_addr()),
                IpAddr::from(header.destination_addr()),
            )
        }
        _ => return None,
    };

    let tcp = match &sliced.transport {
        Some(TransportSlice::Tcp(tcp)) => tcp,
        _ => return None,
    };

    let mut flags = 0u8;
    if tcp.fin() {
        flags |= PacketRecord::FIN;
    }
    if tcp.syn() {
        flags |= PacketRecord::SYN;
    }
    if tcp.rst() {
        flags |= PacketRecord::RST;
    }
    if tcp.psh() {
        flags |= PacketRecord::PSH;
    }
    if tcp.ack() {
        flags |= PacketRecord::ACK;
    }
    if tcp.urg() {
        flags |= PacketRecord::URG;
    }

    Some(PacketRecord {
        timestamp_ns,
        src_ip,
        dst_ip,
        src_port: tcp.source_port(),
        dst_port: tcp.destination_port(),
        protocol: PROTO_TCP,
        length: wire_len,
        tcp_flags: flags,
        window_size: tcp.window_size(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use etherparse::PacketBuilder;

    fn tcp_frame() -> Vec<u8> {
        let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
            .ipv4([192, 168, 1, 10], [192, 168, 1, 20], 64)
            .tcp(44321, 443, 1000, 65535);
        let payload = [0u8; 32];
        let mut frame = Vec::with_capacity(builder.size(payload.len()));
        builder.write(&mut frame, &payload).unwrap();
        frame
    }

    fn udp_frame() -> Vec<u8> {
        let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
            .ipv4([192, 168, 1, 10], [192, 168, 1, 20], 64)
            .udp(5353, 5353);
        let payload = [0u8; 16];
        let mut frame = Vec::with_capacity(builder.size(payload.len()));
        builder.write(&mut frame, &payload).unwrap();
        frame
    }

    #[test]
    fn decodes_tcp_frame() {
        let frame = tcp_frame();
        let record = decode_frame(&frame, 42, frame.len() as u32).expect("tcp frame decodes");
        assert_eq!(record.timestamp_ns, 42);
        assert_eq!(record.src_ip, "192.168.1.10".parse::<IpAddr>().unwrap());
        assert_eq!(record.dst_ip, "192.168.1.20".parse::<IpAddr>().unwrap());
        assert_eq!(record.src_port, 44321);
        assert_eq!(record.dst_port, 443);
        assert_eq!(record.protocol, PROTO_TCP);
        assert_eq!(record.length, frame.len() as u32);
        assert_eq!(record.window_size, 65535);
    }

    #[test]
    fn filters_non_tcp() {
        let frame = udp_frame();
        assert!(decode_frame(&frame, 0, frame.len() as u32).is_none());
    }

    #[test]
    fn filters_garbage() {
        assert!(decode_frame(&[0u8; 8], 0, 8).is_none());
    }
}
