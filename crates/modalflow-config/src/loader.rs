//! Configuration loading

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::ModalflowConfig;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Load the full configuration from a YAML file
pub fn load_config(path: &Path) -> Result<ModalflowConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ModalflowConfig = serde_yaml::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Cross-field validation over a parsed configuration
pub fn validate_config(config: &ModalflowConfig) -> Result<(), ConfigError> {
    if config.version == 0 {
        return Err(ConfigError::Invalid(
            "version must be greater than 0".to_string(),
        ));
    }

    if config.app.name.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "app.name must not be empty".to_string(),
        ));
    }

    if config.runtime.task_timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "runtime.task_timeout_secs must be > 0".to_string(),
        ));
    }

    if config.runtime.default_language.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "runtime.default_language must not be empty".to_string(),
        ));
    }

    if config.nlp.endpoint.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "nlp.endpoint must not be empty".to_string(),
        ));
    }

    if config.nlp.model.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "nlp.model must not be empty".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&config.nlp.temperature) {
        return Err(ConfigError::Invalid(
            "nlp.temperature must be between 0.0 and 2.0".to_string(),
        ));
    }

    if config.nlp.timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "nlp.timeout_secs must be > 0".to_string(),
        ));
    }

    Ok(())
}
