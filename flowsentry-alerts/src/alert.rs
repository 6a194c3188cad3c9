//! Alert records and severity classification.

use std::collections::BTreeMap;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use flowsentry_detection::{Threat, ThreatKind};

/// Alert urgency derived from detection confidence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Classifies confidence into severity. Boundaries are strict greater-than:
/// exactly 0.8 is Warning, exactly 0.5 is Info.
pub fn severity_for(confidence: f64) -> Severity {
    if confidence > 0.8 {
        Severity::Critical
    } else if confidence > 0.5 {
        Severity::Warning
    } else {
        Severity::Info
    }
}

/// Terminal record handed to the sink.
///
/// The serialized shape is exactly
/// `{timestamp, threat, source_ip, dest_ip, confidence, details}`; severity
/// governs the log level, not the record shape.
#[derive(Clone, Debug, Serialize)]
pub struct Alert {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "threat")]
    pub kind: ThreatKind,
    pub source_ip: IpAddr,
    pub dest_ip: IpAddr,
    pub confidence: f64,
    pub details: BTreeMap<String, serde_json::Value>,
    #[serde(skip)]
    pub severity: Severity,
}

impl Alert {
    /// Builds an alert for a threat, stamping it with the current time.
    pub fn from_threat(threat: &Threat, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            kind: threat.kind,
            source_ip: threat.src_ip,
            dest_ip: threat.dst_ip,
            confidence: threat.confidence,
            details: threat.details.clone(),
            severity: severity_for(threat.confidence),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_boundaries_are_strict() {
        assert_eq!(severity_for(0.80), Severity::Warning);
        assert_eq!(severity_for(0.81), Severity::Critical);
        assert_eq!(severity_for(0.50), Severity::Info);
        assert_eq!(severity_for(0.51), Severity::Warning);
        assert_eq!(severity_for(1.0), Severity::Critical);
        assert_eq!(severity_for(0.0), Severity::Info);
    }

    #[test]
    fn record_shape_excludes_severity() {
        let alert = Alert {
            timestamp: Utc::now(),
            kind: ThreatKind::Signature,
            source_ip: "192.168.1.100".parse().unwrap(),
            dest_ip: "192.168.1.1".parse().unwrap(),
            confidence: 1.0,
            details: BTreeMap::new(),
            severity: Severity::Critical,
        };
        let value: serde_json::Value = serde_json::to_value(&alert).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 6);
        for key in [
            "timestamp",
            "threat",
            "source_ip",
            "dest_ip",
            "confidence",
            "details",
        ] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert_eq!(obj["threat"], "signature");
    }
}
