//! Configuration failure taxonomy.

use std::path::PathBuf;

use thiserror::Error;
use validator::ValidationErrors;

/// Everything that can go wrong between reading configuration sources and
/// handing a validated config to the pipeline. All variants are startup
/// failures; nothing here is recoverable at packet time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// One or more fields failed validation (range, interface name,
    /// power-of-two capacity, rule vocabulary).
    #[error("invalid configuration: {}", summarize(.0))]
    Validation(#[source] ValidationErrors),

    #[error("configuration could not be parsed: {0}")]
    Parsing(#[from] figment::Error),
}

impl From<ValidationErrors> for ConfigError {
    fn from(errors: ValidationErrors) -> Self {
        ConfigError::Validation(errors)
    }
}

/// Flattens validator's per-field error map into one operator-readable line,
/// e.g. `capture.queue_capacity: must_be_power_of_two`.
fn summarize(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .iter()
        .map(|(field, errors)| {
            let details: Vec<String> = errors
                .iter()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => e.code.to_string(),
                })
                .collect();
            format!("{field}: {}", details.join(", "))
        })
        .collect();
    parts.sort();
    parts.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::ValidationError;

    #[test]
    fn validation_message_names_the_offending_field() {
        let mut errors = ValidationErrors::new();
        errors.add("queue_capacity", ValidationError::new("must_be_power_of_two"));

        let error = ConfigError::from(errors);
        let message = error.to_string();
        assert!(message.contains("queue_capacity"));
        assert!(message.contains("must_be_power_of_two"));
    }
}
