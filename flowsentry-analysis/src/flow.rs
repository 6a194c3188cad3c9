//! Flow identity, accumulated flow statistics, and derived features.

use std::net::IpAddr;

use flowsentry_core::events::PacketRecord;

/// Rates divide by at least one second so the first packet of a flow (and
/// bursts inside a single second) produce finite, defined values.
pub const MIN_ELAPSED_SECS: f64 = 1.0;

/// Bidirectional flow identity.
///
/// Endpoints are normalized so that the lexicographically smaller
/// `(IpAddr, port)` pair is endpoint A; both directions of a connection map
/// to the same key. This is load-bearing for rate computation: replies must
/// accumulate into the same [`FlowState`] as the requests they answer.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct FlowKey {
    pub addr_a: IpAddr,
    pub port_a: u16,
    pub addr_b: IpAddr,
    pub port_b: u16,
    pub protocol: u8,
}

impl FlowKey {
    /// Builds the canonical key for a packet, swapping endpoints when the
    /// source pair orders after the destination pair.
    pub fn from_record(record: &PacketRecord) -> Self {
        let src = (record.src_ip, record.src_port);
        let dst = (record.dst_ip, record.dst_port);
        let ((addr_a, port_a), (addr_b, port_b)) = if src <= dst { (src, dst) } else { (dst, src) };
        Self {
            addr_a,
            port_a,
            addr_b,
            port_b,
            protocol: record.protocol,
        }
    }
}

/// Accumulated statistics for one flow.
///
/// Packet and byte counters and `last_seen_ns` are monotonically
/// non-decreasing for the life of the flow.
#[derive(Clone, Debug)]
pub struct FlowState {
    pub first_seen_ns: u64,
    pub last_seen_ns: u64,
    pub packets: u64,
    pub bytes: u64,
    pub tcp_flags: u8,
    pub window_size: u16,
}

impl FlowState {
    pub fn new(record: &PacketRecord) -> Self {
        Self {
            first_seen_ns: record.timestamp_ns,
            last_seen_ns: record.timestamp_ns,
            packets: 1,
            bytes: record.length as u64,
            tcp_flags: record.tcp_flags,
            window_size: record.window_size,
        }
    }

    /// Folds another observation into the flow. Counters always advance;
    /// an out-of-order timestamp leaves `last_seen_ns` unchanged.
    pub fn update(&mut self, record: &PacketRecord) {
        self.packets += 1;
        self.bytes += record.length as u64;
        self.tcp_flags = record.tcp_flags;
        self.window_size = record.window_size;
        self.last_seen_ns = self.last_seen_ns.max(record.timestamp_ns);
    }

    /// Flow lifetime in seconds, floored at [`MIN_ELAPSED_SECS`].
    pub fn elapsed_secs(&self) -> f64 {
        let elapsed = (self.last_seen_ns - self.first_seen_ns) as f64 / 1e9;
        elapsed.max(MIN_ELAPSED_SECS)
    }
}

/// Per-observation feature summary consumed by the detection engine.
///
/// Derived, never stored: computed fresh from the just-updated flow state at
/// the moment a packet is processed.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureSnapshot {
    /// Wire length of the triggering packet, in bytes.
    pub packet_size: u32,
    /// Flow packets per second over the flow lifetime.
    pub packet_rate: f64,
    /// Flow bytes per second over the flow lifetime.
    pub byte_rate: f64,
    pub tcp_flags: u8,
    pub window_size: u16,
}

impl FeatureSnapshot {
    pub fn from_state(state: &FlowState, record: &PacketRecord) -> Self {
        let elapsed = state.elapsed_secs();
        Self {
            packet_size: record.length,
            packet_rate: state.packets as f64 / elapsed,
            byte_rate: state.bytes as f64 / elapsed,
            tcp_flags: record.tcp_flags,
            window_size: record.window_size,
        }
    }

    /// The numeric vector fed to the anomaly scorer.
    pub fn as_vector(&self) -> [f64; 3] {
        [self.packet_size as f64, self.packet_rate, self.byte_rate]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn record(src: [u8; 4], sport: u16, dst: [u8; 4], dport: u16) -> PacketRecord {
        PacketRecord {
            timestamp_ns: 1_000_000_000,
            src_ip: IpAddr::V4(Ipv4Addr::from(src)),
            dst_ip: IpAddr::V4(Ipv4Addr::from(dst)),
            src_port: sport,
            dst_port: dport,
            protocol: 6,
            length: 100,
            tcp_flags: PacketRecord::ACK,
            window_size: 1024,
        }
    }

    #[test]
    fn key_is_direction_stable() {
        let forward = record([10, 0, 0, 1], 40000, [10, 0, 0, 2], 80);
        let reverse = record([10, 0, 0, 2], 80, [10, 0, 0, 1], 40000);
        assert_eq!(FlowKey::from_record(&forward), FlowKey::from_record(&reverse));
    }

    #[test]
    fn key_separates_distinct_flows() {
        let a = record([10, 0, 0, 1], 40000, [10, 0, 0, 2], 80);
        let b = record([10, 0, 0, 1], 40001, [10, 0, 0, 2], 80);
        assert_ne!(FlowKey::from_record(&a), FlowKey::from_record(&b));
    }

    #[test]
    fn first_packet_rates_are_finite() {
        let r = record([10, 0, 0, 1], 40000, [10, 0, 0, 2], 80);
        let state = FlowState::new(&r);
        let snapshot = FeatureSnapshot::from_state(&state, &r);
        assert!(snapshot.packet_rate.is_finite());
        assert!(snapshot.byte_rate.is_finite());
        assert_eq!(snapshot.packet_rate, 1.0);
        assert_eq!(snapshot.byte_rate, 100.0);
    }

    #[test]
    fn last_seen_never_regresses() {
        let r = record([10, 0, 0, 1], 40000, [10, 0, 0, 2], 80);
        let mut state = FlowState::new(&r);

        let mut older = r.clone();
        older.timestamp_ns = 500_000_000;
        state.update(&older);

        assert_eq!(state.last_seen_ns, 1_000_000_000);
        // Counters still advanced for the out-of-order packet.
        assert_eq!(state.packets, 2);
        assert_eq!(state.bytes, 200);
    }
}
