//! Custom validation functions for configuration.
//!
//! Provides shared validation logic used across multiple configuration
//! modules.

use validator::ValidationError;

/// Validate that an interface name follows Linux naming conventions.
pub fn validate_interface(name: &str) -> Result<(), ValidationError> {
    let valid = !name.is_empty()
        && name.len() <= 15
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_interface"))
    }
}

/// Validate that a given value is a power of two.
pub fn validate_power_of_two(value: usize) -> Result<(), ValidationError> {
    if value.is_power_of_two() {
        Ok(())
    } else {
        Err(ValidationError::new("must_be_power_of_two"))
    }
}

/// Validate the condition-combination keyword of a signature rule.
pub fn validate_combine(combine: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new("^(all|any)$").map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(combine) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_combine"))
    }
}

/// Validate a rule-condition feature name.
pub fn validate_rule_field(field: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new("^(packet_size|packet_rate|byte_rate|window_size)$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(field) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_rule_field"))
    }
}

/// Validate a rule-condition comparator.
pub fn validate_rule_op(op: &str) -> Result<(), ValidationError> {
    let re =
        regex::Regex::new("^(lt|le|gt|ge|eq)$").map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(op) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_rule_op"))
    }
}
