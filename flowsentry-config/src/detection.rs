//! Detection configuration: signature rules as data, anomaly scorer tuning.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

/// Detection engine configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct DetectionConfig {
    /// Signature rule set, evaluated in order on every snapshot.
    #[validate(nested)]
    #[serde(default = "default_rules")]
    pub rules: Vec<RuleConfig>,

    /// Anomaly scorer parameters.
    #[validate(nested)]
    #[serde(default)]
    pub anomaly: AnomalyConfig,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            anomaly: AnomalyConfig::default(),
        }
    }
}

/// One named signature rule: threshold conditions over flow features.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct RuleConfig {
    pub name: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// How conditions combine: `all` or `any`.
    #[validate(custom(function = validation::validate_combine))]
    #[serde(default = "default_combine")]
    pub combine: String,

    #[validate(nested)]
    pub conditions: Vec<ConditionConfig>,
}

/// One `field op value` threshold condition.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ConditionConfig {
    /// Feature name: packet_size, packet_rate, byte_rate, or window_size.
    #[validate(custom(function = validation::validate_rule_field))]
    pub field: String,

    /// Comparator: lt, le, gt, ge, or eq.
    #[validate(custom(function = validation::validate_rule_op))]
    pub op: String,

    pub value: f64,
}

fn default_true() -> bool {
    true
}

fn default_combine() -> String {
    "all".into()
}

fn condition(field: &str, op: &str, value: f64) -> ConditionConfig {
    ConditionConfig {
        field: field.into(),
        op: op.into(),
        value,
    }
}

/// Stock rule set: small-packet floods and very-high-rate scans.
fn default_rules() -> Vec<RuleConfig> {
    vec![
        RuleConfig {
            name: "syn_flood".into(),
            enabled: true,
            combine: default_combine(),
            conditions: vec![
                condition("packet_size", "lt", 100.0),
                condition("packet_rate", "gt", 50.0),
            ],
        },
        RuleConfig {
            name: "port_scan".into(),
            enabled: true,
            combine: default_combine(),
            conditions: vec![
                condition("packet_size", "lt", 60.0),
                condition("packet_rate", "gt", 100.0),
            ],
        },
    ]
}

/// Anomaly scorer tuning.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct AnomalyConfig {
    /// Expected fraction of anomalous samples in live traffic; calibrates
    /// the reported training-score quantile.
    #[validate(range(min = 0.001, max = 0.5))]
    #[serde(default = "default_contamination")]
    pub contamination: f64,

    /// Decision boundary: scores below it are anomalies (lower = more
    /// anomalous).
    #[validate(range(min = -1.0, max = 0.0))]
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Minimum number of samples accepted by training.
    #[validate(range(min = 2, max = 100000))]
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    /// Divisor of |score| in the confidence transform.
    #[validate(range(min = 0.01, max = 100.0))]
    #[serde(default = "default_confidence_scale")]
    pub confidence_scale: f64,

    /// When non-zero, live/replay modes collect this many snapshots as a
    /// baseline and train the scorer before anomaly detection arms.
    #[serde(default)]
    pub warmup_samples: usize,

    /// Trees in the isolation forest.
    #[validate(range(min = 1, max = 10000))]
    #[serde(default = "default_n_trees")]
    pub n_trees: usize,

    /// Sub-sample size per tree (clamped to the training-set size).
    #[validate(range(min = 2, max = 65536))]
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
}

fn default_contamination() -> f64 {
    0.1
}

fn default_threshold() -> f64 {
    -0.5
}

fn default_min_samples() -> usize {
    10
}

fn default_confidence_scale() -> f64 {
    1.0
}

fn default_n_trees() -> usize {
    100
}

fn default_sample_size() -> usize {
    256
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            contamination: default_contamination(),
            threshold: default_threshold(),
            min_samples: default_min_samples(),
            confidence_scale: default_confidence_scale(),
            warmup_samples: 0,
            n_trees: default_n_trees(),
            sample_size: default_sample_size(),
        }
    }
}
