//! End-to-end pipeline tests: packets in, alerts out.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use flowsentry_alerts::{MemorySink, Severity};
use flowsentry_config::FlowsentryConfig;
use flowsentry_core::events::PacketRecord;
use flowsentry_engine::{PipelineError, PipelineRuntime};

fn syn_packet(seq: u64, length: u32) -> PacketRecord {
    PacketRecord {
        // 8 ms apart: 120 packets stay inside one second of flow lifetime.
        timestamp_ns: seq * 8_000_000,
        src_ip: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 100)),
        dst_ip: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)),
        src_port: 44321,
        dst_port: 80,
        protocol: 6,
        length,
        tcp_flags: PacketRecord::SYN,
        window_size: 65535,
    }
}

fn runtime_with_sink(config: FlowsentryConfig) -> (PipelineRuntime, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let runtime = PipelineRuntime::new(config, sink.clone()).unwrap();
    (runtime, sink)
}

#[test]
fn small_packet_flood_raises_critical_alerts() {
    let mut config = FlowsentryConfig::default();
    config.alerts.throttle_window_secs = 0;
    let (runtime, sink) = runtime_with_sink(config);

    // 120 small packets on one flow within a second. The flood rule needs
    // packet_rate > 50, so packets 51..=120 each produce a threat.
    for seq in 0..120 {
        runtime.process_record(&syn_packet(seq, 70));
    }

    let alerts = sink.alerts();
    assert_eq!(alerts.len(), 70);
    assert!(alerts.iter().all(|a| a.severity == Severity::Critical));
    assert!(alerts.iter().all(|a| a.confidence == 1.0));
    assert_eq!(alerts[0].details["rule"], "syn_flood");
    assert_eq!(
        alerts[0].source_ip,
        IpAddr::V4(Ipv4Addr::new(192, 168, 1, 100))
    );

    assert_eq!(runtime.metrics().threats_total.get(), 70.0);
    assert_eq!(runtime.metrics().alerts_total.get(), 70.0);
    assert_eq!(runtime.metrics().packets_total.get(), 120.0);
}

#[test]
fn tiny_fast_packets_match_both_signatures() {
    let mut config = FlowsentryConfig::default();
    config.alerts.throttle_window_secs = 0;
    let (runtime, sink) = runtime_with_sink(config);

    // 50-byte packets cross both rules once the rate passes 100/s.
    for seq in 0..120 {
        runtime.process_record(&syn_packet(seq, 50));
    }

    let rules: Vec<String> = sink
        .alerts()
        .iter()
        .map(|a| a.details["rule"].as_str().unwrap_or_default().to_string())
        .collect();
    assert!(rules.iter().any(|r| r == "syn_flood"));
    assert!(rules.iter().any(|r| r == "port_scan"));
}

#[test]
fn throttle_window_collapses_repeat_alerts() {
    let (runtime, sink) = runtime_with_sink(FlowsentryConfig::default());

    for seq in 0..120 {
        runtime.process_record(&syn_packet(seq, 70));
    }

    // Default 10 s window: one alert for the flow, the rest suppressed.
    assert_eq!(sink.len(), 1);
    assert_eq!(runtime.metrics().alerts_total.get(), 1.0);
    assert_eq!(runtime.metrics().alerts_suppressed.get(), 69.0);
}

#[test]
fn benign_traffic_raises_nothing() {
    let (runtime, sink) = runtime_with_sink(FlowsentryConfig::default());

    // Large packets at a low rate on distinct flows.
    for i in 0..20u32 {
        let mut record = syn_packet(i as u64, 1200);
        record.timestamp_ns = i as u64 * 2_000_000_000;
        record.src_port = 50000 + i as u16;
        runtime.process_record(&record);
    }

    assert!(sink.is_empty());
    assert_eq!(runtime.metrics().threats_total.get(), 0.0);
}

#[test]
fn warmup_trains_the_scorer_and_arms_anomaly_detection() {
    let mut config = FlowsentryConfig::default();
    config.detection.anomaly.warmup_samples = 20;
    let (runtime, _sink) = runtime_with_sink(config);

    assert_eq!(runtime.metrics().anomaly_trained.get(), 0.0);

    for i in 0..20u32 {
        let mut record = syn_packet(i as u64, 800 + i * 10);
        record.timestamp_ns = i as u64 * 500_000_000;
        record.src_port = 40000 + i as u16;
        runtime.process_record(&record);
    }

    assert_eq!(runtime.metrics().anomaly_trained.get(), 1.0);
}

#[test]
fn flow_count_tracks_distinct_five_tuples() {
    let (runtime, _sink) = runtime_with_sink(FlowsentryConfig::default());

    for i in 0..5u16 {
        let mut record = syn_packet(0, 500);
        record.src_port = 40000 + i;
        runtime.process_record(&record);
    }
    // Reverse direction of an existing flow maps onto the same entry.
    let mut reply = syn_packet(1, 500);
    reply.src_ip = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1));
    reply.dst_ip = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 100));
    reply.src_port = 80;
    reply.dst_port = 40000;
    runtime.process_record(&reply);

    assert_eq!(runtime.metrics().flows_active.get(), 5.0);
}

#[test]
fn training_on_missing_file_is_reported() {
    let (runtime, _sink) = runtime_with_sink(FlowsentryConfig::default());
    assert!(matches!(
        runtime.run_training("no/such/capture.pcap", None),
        Err(PipelineError::TrainingFileNotFound(_))
    ));
}

#[test]
fn replay_on_missing_file_is_a_capture_error() {
    let (runtime, _sink) = runtime_with_sink(FlowsentryConfig::default());
    assert!(matches!(
        runtime.run_replay("no/such/capture.pcap"),
        Err(PipelineError::Capture(_))
    ));
}

#[test]
fn queue_capacity_must_be_a_power_of_two() {
    let mut config = FlowsentryConfig::default();
    config.capture.queue_capacity = 5000;
    let sink = Arc::new(MemorySink::new());
    assert!(matches!(
        PipelineRuntime::new(config, sink),
        Err(PipelineError::InvalidQueueCapacity(5000))
    ));
}
