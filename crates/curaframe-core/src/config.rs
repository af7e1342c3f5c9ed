//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::constraint::DEFAULT_VERIFICATION_THRESHOLD;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Which value a numeric comparison looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UncertaintyPolicy {
    /// Compare the nominal property value.
    #[default]
    Nominal,
    /// Compare the pessimistic end of the property's uncertainty interval,
    /// when the candidate supplies one.
    WorstCase,
}

/// Knobs that shape evaluation without touching the verdict policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub uncertainty_policy: UncertaintyPolicy,

    /// Confidence below which a constraint needs independent verification
    pub verification_threshold: f64,

    /// Minimum confidence for a constraint to count as well established
    pub well_established_confidence: f64,

    /// Minimum number of references for a constraint to count as well established
    pub well_established_references: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            uncertainty_policy: UncertaintyPolicy::Nominal,
            verification_threshold: DEFAULT_VERIFICATION_THRESHOLD,
            well_established_confidence: 0.8,
            well_established_references: 3,
        }
    }
}

impl EngineConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn with_uncertainty_policy(mut self, policy: UncertaintyPolicy) -> Self {
        self.uncertainty_policy = policy;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("verification_threshold", self.verification_threshold),
            ("well_established_confidence", self.well_established_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must lie in [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
