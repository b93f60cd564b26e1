//! Engine configuration
//!
//! Supports loading from intervene.toml, a [intervene] section of a project
//! manifest, or a JSON file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::setup::RandomizationParams;

/// Name of the standalone configuration file
pub const CONFIG_FILE: &str = "intervene.toml";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Allowed deviation of a conditional row sum from one
    #[serde(default = "default_tolerance")]
    pub probability_tolerance: f64,

    /// Header of the probability column in joint tables
    #[serde(default = "default_probability_label")]
    pub probability_label: String,

    /// Decimal places when rendering probabilities and covariances
    #[serde(default = "default_precision")]
    pub display_precision: usize,

    /// Mean for randomized continuous variables without declared parameters
    #[serde(default)]
    pub default_randomization_mean: f64,

    /// Std-dev for randomized continuous variables without declared parameters
    #[serde(default = "default_std_dev")]
    pub default_randomization_std_dev: f64,
}

fn default_tolerance() -> f64 {
    1e-6
}
fn default_probability_label() -> String {
    crate::joint::DEFAULT_PROBABILITY_LABEL.to_string()
}
fn default_precision() -> usize {
    4
}
fn default_std_dev() -> f64 {
    1.0
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            probability_tolerance: default_tolerance(),
            probability_label: default_probability_label(),
            display_precision: default_precision(),
            default_randomization_mean: 0.0,
            default_randomization_std_dev: default_std_dev(),
        }
    }
}

/// Errors loading configuration
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl EngineConfig {
    /// Load from file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;

        let config: Self = if path.extension().map(|e| e == "toml").unwrap_or(false) {
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?
        } else if path.extension().map(|e| e == "json").unwrap_or(false) {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?
        } else {
            return Err(ConfigError::Parse("Unknown config file format".to_string()));
        };
        config.validate()?;
        Ok(config)
    }

    /// Load the [intervene] section of a manifest; missing section means defaults
    pub fn from_manifest(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let manifest: toml::Value =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let config = match manifest.get("intervene") {
            Some(section) => section
                .clone()
                .try_into()
                .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Find config file in directory hierarchy
    pub fn find_config(start: &Path) -> Option<Self> {
        let mut dir = if start.is_file() {
            start.parent()?.to_path_buf()
        } else {
            start.to_path_buf()
        };

        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.exists() {
                match Self::from_file(&candidate) {
                    Ok(config) => return Some(config),
                    Err(e) => {
                        tracing::warn!("Ignoring {}: {}", candidate.display(), e);
                    }
                }
            }

            if !dir.pop() {
                return None;
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.probability_tolerance >= 0.0 && self.probability_tolerance < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "probability_tolerance must be in [0, 1), got {}",
                self.probability_tolerance
            )));
        }
        if !self.default_randomization_std_dev.is_finite() || self.default_randomization_std_dev < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "default_randomization_std_dev must be finite and non-negative, got {}",
                self.default_randomization_std_dev
            )));
        }
        if !self.default_randomization_mean.is_finite() {
            return Err(ConfigError::Invalid(
                "default_randomization_mean must be finite".to_string(),
            ));
        }
        Ok(())
    }

    pub fn default_randomization(&self) -> RandomizationParams {
        RandomizationParams::new(
            self.default_randomization_mean,
            self.default_randomization_std_dev,
        )
    }
}
