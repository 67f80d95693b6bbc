//! # Modalflow Runtime
//!
//! Task orchestration over pluggable processing engines.
//!
//! This crate provides:
//! - ProcessingOrchestrator: two-phase engine selection (intent, then
//!   modality), lifecycle driving, timeout enforcement
//! - Bootstrap helpers assembling the runtime from a YAML config

mod bootstrap;
mod orchestrator;

pub use bootstrap::{build_runtime, build_runtime_from_file, init_tracing, BootstrapError, RuntimeApp};
pub use orchestrator::{OrchestratorConfig, ProcessingOrchestrator};

// Re-export core types for convenience
pub use modalflow_core::prelude::*;
