//! Signature rules as data: named threshold expressions over feature
//! snapshots.
//!
//! A rule is a set of `field comparator value` conditions combined with
//! ALL/ANY. Rules are plain serializable data interpreted at evaluate time,
//! so new rules are added through configuration without touching engine
//! internals. Predicates are pure; evaluating the same snapshot twice yields
//! identical results.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use flowsentry_analysis::FeatureSnapshot;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Unknown rule field '{0}'")]
    UnknownField(String),

    #[error("Unknown comparator '{0}'")]
    UnknownComparator(String),
}

/// Feature a condition reads from the snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    PacketSize,
    PacketRate,
    ByteRate,
    WindowSize,
}

impl Field {
    fn extract(self, features: &FeatureSnapshot) -> f64 {
        match self {
            Field::PacketSize => features.packet_size as f64,
            Field::PacketRate => features.packet_rate,
            Field::ByteRate => features.byte_rate,
            Field::WindowSize => features.window_size as f64,
        }
    }
}

impl FromStr for Field {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "packet_size" => Ok(Field::PacketSize),
            "packet_rate" => Ok(Field::PacketRate),
            "byte_rate" => Ok(Field::ByteRate),
            "window_size" => Ok(Field::WindowSize),
            other => Err(RuleError::UnknownField(other.to_string())),
        }
    }
}

/// Threshold comparison operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl Comparator {
    fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparator::Lt => lhs < rhs,
            Comparator::Le => lhs <= rhs,
            Comparator::Gt => lhs > rhs,
            Comparator::Ge => lhs >= rhs,
            Comparator::Eq => lhs == rhs,
        }
    }
}

impl FromStr for Comparator {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lt" => Ok(Comparator::Lt),
            "le" => Ok(Comparator::Le),
            "gt" => Ok(Comparator::Gt),
            "ge" => Ok(Comparator::Ge),
            "eq" => Ok(Comparator::Eq),
            other => Err(RuleError::UnknownComparator(other.to_string())),
        }
    }
}

/// How a rule's conditions combine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combine {
    #[default]
    All,
    Any,
}

/// One `field comparator value` condition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Condition {
    pub field: Field,
    pub op: Comparator,
    pub value: f64,
}

impl Condition {
    fn matches(&self, features: &FeatureSnapshot) -> bool {
        self.op.apply(self.field.extract(features), self.value)
    }
}

/// Named detection rule.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignatureRule {
    pub name: String,
    #[serde(default)]
    pub combine: Combine,
    pub conditions: Vec<Condition>,
}

impl SignatureRule {
    pub fn matches(&self, features: &FeatureSnapshot) -> bool {
        match self.combine {
            Combine::All => self.conditions.iter().all(|c| c.matches(features)),
            Combine::Any => self.conditions.iter().any(|c| c.matches(features)),
        }
    }
}

/// Result of evaluating one rule against a snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleMatch<'a> {
    pub rule: &'a str,
    pub matched: bool,
}

impl fmt::Display for RuleMatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.rule, self.matched)
    }
}

/// Evaluates an ordered set of named rules against feature snapshots.
pub struct SignatureEngine {
    rules: Vec<SignatureRule>,
}

impl SignatureEngine {
    pub fn new(rules: Vec<SignatureRule>) -> Self {
        Self { rules }
    }

    /// Appends a rule; the designed extension point for new signatures.
    pub fn rule_add(&mut self, rule: SignatureRule) {
        self.rules.push(rule);
    }

    /// Evaluates every rule against the snapshot. All rules run on every
    /// call; there is no short-circuit ordering dependency, and multiple
    /// rules may match the same snapshot.
    pub fn evaluate<'a>(&'a self, features: &FeatureSnapshot) -> Vec<RuleMatch<'a>> {
        self.rules
            .iter()
            .map(|rule| RuleMatch {
                rule: rule.name.as_str(),
                matched: rule.matches(features),
            })
            .collect()
    }

    pub fn rules(&self) -> &[SignatureRule] {
        &self.rules
    }
}

impl Default for SignatureEngine {
    /// The stock rule set: small-packet floods and very-high-rate scans.
    fn default() -> Self {
        Self::new(vec![
            SignatureRule {
                name: "syn_flood".into(),
                combine: Combine::All,
                conditions: vec![
                    Condition {
                        field: Field::PacketSize,
                        op: Comparator::Lt,
                        value: 100.0,
                    },
                    Condition {
                        field: Field::PacketRate,
                        op: Comparator::Gt,
                        value: 50.0,
                    },
                ],
            },
            SignatureRule {
                name: "port_scan".into(),
                combine: Combine::All,
                conditions: vec![
                    Condition {
                        field: Field::PacketSize,
                        op: Comparator::Lt,
                        value: 60.0,
                    },
                    Condition {
                        field: Field::PacketRate,
                        op: Comparator::Gt,
                        value: 100.0,
                    },
                ],
            },
        ])
    }
}
