//! Builds the typed signature engine from validated configuration.

use flowsentry_config::RuleConfig;
use flowsentry_detection::{Combine, Condition, SignatureEngine, SignatureRule};

use crate::error::PipelineError;

/// Converts configured rules into a [`SignatureEngine`].
///
/// Disabled rules are skipped. Vocabulary has already passed config
/// validation, but parsing still returns an error rather than panicking so
/// hand-built configs fail loudly.
pub fn build_signature_engine(rules: &[RuleConfig]) -> Result<SignatureEngine, PipelineError> {
    let mut parsed = Vec::with_capacity(rules.len());
    for rule in rules.iter().filter(|r| r.enabled) {
        let combine = match rule.combine.as_str() {
            "any" => Combine::Any,
            _ => Combine::All,
        };
        let conditions = rule
            .conditions
            .iter()
            .map(|c| {
                Ok(Condition {
                    field: c.field.parse()?,
                    op: c.op.parse()?,
                    value: c.value,
                })
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;
        parsed.push(SignatureRule {
            name: rule.name.clone(),
            combine,
            conditions,
        });
    }
    Ok(SignatureEngine::new(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowsentry_config::DetectionConfig;

    #[test]
    fn stock_rules_build() {
        let config = DetectionConfig::default();
        let engine = build_signature_engine(&config.rules).unwrap();
        let names: Vec<_> = engine.rules().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["syn_flood", "port_scan"]);
    }

    #[test]
    fn disabled_rules_are_skipped() {
        let mut config = DetectionConfig::default();
        config.rules[0].enabled = false;
        let engine = build_signature_engine(&config.rules).unwrap();
        assert_eq!(engine.rules().len(), 1);
        assert_eq!(engine.rules()[0].name, "port_scan");
    }

    #[test]
    fn unknown_vocabulary_is_an_error() {
        let mut config = DetectionConfig::default();
        config.rules[0].conditions[0].field = "entropy".into();
        assert!(matches!(
            build_signature_engine(&config.rules),
            Err(PipelineError::Rule(_))
        ));
    }
}
