//! Detection engine: merges signature matches and anomaly scores into
//! typed threat records.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use flowsentry_analysis::FeatureSnapshot;
use flowsentry_core::events::PacketRecord;

use crate::anomaly::AnomalyScorer;
use crate::signatures::SignatureEngine;

/// Identifier the anomaly path reports threats under.
pub const ANOMALY_MODEL_ID: &str = "isolation_forest";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatKind {
    Signature,
    Anomaly,
}

/// One detection event, consumed once by the alert dispatcher.
#[derive(Clone, Debug, Serialize)]
pub struct Threat {
    pub kind: ThreatKind,
    /// Rule name for signature threats, model identifier for anomalies.
    pub id: String,
    /// Detection confidence in [0, 1]. Signature matches are deterministic
    /// and always 1.0.
    pub confidence: f64,
    pub src_ip: IpAddr,
    pub src_port: u16,
    pub dst_ip: IpAddr,
    pub dst_port: u16,
    pub details: BTreeMap<String, serde_json::Value>,
}

/// Orchestrates both detection methods over each feature snapshot.
pub struct DetectionEngine {
    signatures: SignatureEngine,
    scorer: Arc<dyn AnomalyScorer>,
    anomaly_threshold: f64,
    confidence_scale: f64,
    degradation_logged: AtomicBool,
}

impl DetectionEngine {
    /// # Arguments
    ///
    /// * `anomaly_threshold` - decision boundary; scores below it are
    ///   anomalies (lower = more anomalous).
    /// * `confidence_scale` - divisor of `|score|` in the confidence
    ///   transform; must be positive.
    pub fn new(
        signatures: SignatureEngine,
        scorer: Arc<dyn AnomalyScorer>,
        anomaly_threshold: f64,
        confidence_scale: f64,
    ) -> Self {
        Self {
            signatures,
            scorer,
            anomaly_threshold,
            confidence_scale,
            degradation_logged: AtomicBool::new(false),
        }
    }

    /// Whether the anomaly path is currently active. False means the system
    /// is degraded to signature-only mode until a model is trained.
    pub fn anomaly_active(&self) -> bool {
        self.scorer.is_trained()
    }

    /// Evaluates a snapshot against both methods. Never fails: a scorer
    /// error on one packet is logged and skipped so subsequent packets keep
    /// flowing.
    pub fn detect(&self, features: &FeatureSnapshot, record: &PacketRecord) -> Vec<Threat> {
        let mut threats = Vec::new();

        for m in self.signatures.evaluate(features) {
            if !m.matched {
                continue;
            }
            let mut details = BTreeMap::new();
            details.insert("rule".to_string(), json!(m.rule));
            details.insert("packet_size".to_string(), json!(features.packet_size));
            details.insert("packet_rate".to_string(), json!(features.packet_rate));
            threats.push(Threat {
                kind: ThreatKind::Signature,
                id: m.rule.to_string(),
                confidence: 1.0,
                src_ip: record.src_ip,
                src_port: record.src_port,
                dst_ip: record.dst_ip,
                dst_port: record.dst_port,
                details,
            });
        }

        if self.scorer.is_trained() {
            match self.scorer.score(features) {
                Ok(score) if score < self.anomaly_threshold => {
                    let mut details = BTreeMap::new();
                    details.insert("score".to_string(), json!(score));
                    details.insert("threshold".to_string(), json!(self.anomaly_threshold));
                    threats.push(Threat {
                        kind: ThreatKind::Anomaly,
                        id: ANOMALY_MODEL_ID.to_string(),
                        confidence: self.confidence_for(score),
                        src_ip: record.src_ip,
                        src_port: record.src_port,
                        dst_ip: record.dst_ip,
                        dst_port: record.dst_port,
                        details,
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("anomaly scoring failed, packet skipped: {e}");
                }
            }
        } else if !self.degradation_logged.swap(true, Ordering::Relaxed) {
            info!("anomaly scorer untrained; running in signature-only mode");
        }

        threats
    }

    /// Monotonic transform of `|score|` into [0, 1]: more extreme scores
    /// never yield lower confidence.
    fn confidence_for(&self, score: f64) -> f64 {
        (score.abs() / self.confidence_scale).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::{AnomalyError, FEATURE_DIM};
    use std::net::Ipv4Addr;
    use std::sync::atomic::AtomicU64;

    /// Scorer stub with a controllable fixed score.
    struct FixedScorer {
        trained: bool,
        score_millis: AtomicU64,
        fail: bool,
    }

    impl FixedScorer {
        fn trained(score: f64) -> Self {
            Self {
                trained: true,
                score_millis: AtomicU64::new((score * -1000.0) as u64),
                fail: false,
            }
        }

        fn untrained() -> Self {
            Self {
                trained: false,
                score_millis: AtomicU64::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                trained: true,
                score_millis: AtomicU64::new(0),
                fail: true,
            }
        }

        fn value(&self) -> f64 {
            self.score_millis.load(Ordering::Relaxed) as f64 / -1000.0
        }
    }

    impl AnomalyScorer for FixedScorer {
        fn train(&self, _samples: &[[f64; FEATURE_DIM]]) -> Result<(), AnomalyError> {
            Ok(())
        }

        fn score(&self, _features: &FeatureSnapshot) -> Result<f64, AnomalyError> {
            if self.fail {
                return Err(AnomalyError::Model("backend unavailable".into()));
            }
            Ok(self.value())
        }

        fn is_trained(&self) -> bool {
            self.trained
        }
    }

    fn record() -> PacketRecord {
        PacketRecord {
            timestamp_ns: 0,
            src_ip: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 100)),
            dst_ip: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)),
            src_port: 12345,
            dst_port: 80,
            protocol: 6,
            length: 50,
            tcp_flags: PacketRecord::SYN,
            window_size: 65535,
        }
    }

    fn snapshot(packet_size: u32, packet_rate: f64) -> FeatureSnapshot {
        FeatureSnapshot {
            packet_size,
            packet_rate,
            byte_rate: packet_size as f64 * packet_rate,
            tcp_flags: PacketRecord::SYN,
            window_size: 65535,
        }
    }

    fn engine(scorer: FixedScorer) -> DetectionEngine {
        DetectionEngine::new(SignatureEngine::default(), Arc::new(scorer), -0.5, 1.0)
    }

    #[test]
    fn signature_match_yields_full_confidence_threat() {
        let engine = engine(FixedScorer::untrained());
        let threats = engine.detect(&snapshot(80, 60.0), &record());
        assert_eq!(threats.len(), 1);
        assert_eq!(threats[0].kind, ThreatKind::Signature);
        assert_eq!(threats[0].id, "syn_flood");
        assert_eq!(threats[0].confidence, 1.0);
    }

    #[test]
    fn untrained_scorer_degrades_to_signature_only() {
        let engine = engine(FixedScorer::untrained());
        assert!(!engine.anomaly_active());
        let threats = engine.detect(&snapshot(1000, 1.0), &record());
        assert!(threats.is_empty());
    }

    #[test]
    fn anomalous_score_below_threshold_emits_threat() {
        let engine = engine(FixedScorer::trained(-0.7));
        assert!(engine.anomaly_active());
        let threats = engine.detect(&snapshot(1000, 1.0), &record());
        assert_eq!(threats.len(), 1);
        assert_eq!(threats[0].kind, ThreatKind::Anomaly);
        assert_eq!(threats[0].id, ANOMALY_MODEL_ID);
        assert!((threats[0].confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn benign_score_emits_nothing() {
        let engine = engine(FixedScorer::trained(-0.2));
        let threats = engine.detect(&snapshot(1000, 1.0), &record());
        assert!(threats.is_empty());
    }

    #[test]
    fn confidence_transform_is_monotonic_and_capped() {
        let engine = engine(FixedScorer::trained(-0.6));
        assert!((engine.confidence_for(-0.6) - 0.6).abs() < 1e-9);
        assert!(engine.confidence_for(-0.9) > engine.confidence_for(-0.6));
        assert_eq!(engine.confidence_for(-5.0), 1.0);
    }

    #[test]
    fn scorer_failure_does_not_stop_detection() {
        let engine = engine(FixedScorer::failing());
        // Signature path still produces its threat.
        let threats = engine.detect(&snapshot(80, 60.0), &record());
        assert_eq!(threats.len(), 1);
        assert_eq!(threats[0].kind, ThreatKind::Signature);
    }

    #[tracing_test::traced_test]
    #[test]
    fn degradation_to_signature_only_is_logged() {
        let engine = engine(FixedScorer::untrained());
        engine.detect(&snapshot(1000, 1.0), &record());
        engine.detect(&snapshot(1000, 1.0), &record());
        assert!(logs_contain("signature-only mode"));
    }

    #[test]
    fn both_methods_can_fire_on_one_snapshot() {
        let engine = engine(FixedScorer::trained(-0.9));
        let threats = engine.detect(&snapshot(50, 150.0), &record());
        let kinds: Vec<ThreatKind> = threats.iter().map(|t| t.kind).collect();
        assert!(kinds.contains(&ThreatKind::Signature));
        assert!(kinds.contains(&ThreatKind::Anomaly));
        // syn_flood + port_scan + anomaly
        assert_eq!(threats.len(), 3);
    }
}
