//! # Flowsentry Configuration System
//!
//! Hierarchical configuration for the detection pipeline.
//!
//! ## Features
//! - **Unified Configuration**: single source of truth across all components
//! - **Validation**: runtime validation of critical parameters
//! - **Layering**: defaults ← YAML file ← environment variables
//!
//! All values are read at startup and held immutable for the pipeline's
//! lifetime.

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod alerts;
mod analyzer;
mod capture;
mod detection;
mod error;
mod validation;

pub use alerts::AlertsConfig;
pub use analyzer::AnalyzerConfig;
pub use capture::CaptureConfig;
pub use detection::{AnomalyConfig, ConditionConfig, DetectionConfig, RuleConfig};
pub use error::ConfigError;

/// Top-level configuration container for all flowsentry components.
#[derive(Debug, Serialize, Deserialize, Validate, Default)]
pub struct FlowsentryConfig {
    /// Packet capture and intake-queue parameters.
    #[validate(nested)]
    pub capture: CaptureConfig,

    /// Flow-table housekeeping parameters.
    #[validate(nested)]
    pub analyzer: AnalyzerConfig,

    /// Signature rules and anomaly scorer tuning.
    #[validate(nested)]
    pub detection: DetectionConfig,

    /// Alert sink and throttling parameters.
    #[validate(nested)]
    pub alerts: AlertsConfig,
}

impl FlowsentryConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/flowsentry.yaml` - if missing, defaults are used.
    /// 3. `FLOWSENTRY_*` environment variables (`__` nests sections).
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(FlowsentryConfig::default()));

        if Path::new("config/flowsentry.yaml").exists() {
            figment = figment.merge(Yaml::file("config/flowsentry.yaml"));
        }

        figment
            .merge(Env::prefixed("FLOWSENTRY_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }

    /// Load configuration from a specific path.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(
                path.to_string_lossy().to_string(),
            )));
        }

        Figment::from(Serialized::defaults(FlowsentryConfig::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("FLOWSENTRY_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}
