//! # Modalflow Config
//!
//! YAML configuration model and loader.

mod loader;
mod model;

pub use loader::{load_config, validate_config, ConfigError};
pub use model::{AppConfig, ModalflowConfig, NlpConfig, RuntimeConfig};
