//! # flowsentry-detection
//!
//! Dual-method threat detection: deterministic signature rules and
//! statistical outlier scoring, merged into typed [`Threat`] records.

pub mod anomaly;
pub mod engine;
pub mod signatures;

pub use anomaly::{AnomalyError, AnomalyScorer, IsolationForestScorer, ScorerOptions, FEATURE_DIM};
pub use engine::{DetectionEngine, Threat, ThreatKind};
pub use signatures::{
    Comparator, Combine, Condition, Field, RuleError, RuleMatch, SignatureEngine, SignatureRule,
};
