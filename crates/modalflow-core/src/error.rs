//! Domain error taxonomy
//!
//! Domain-level errors only; transport-level concerns live with the callers.

use thiserror::Error;

use crate::repository::StoreError;

/// Domain errors shared across the processing pipeline
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// An illegal lifecycle transition was attempted
    #[error("invalid status: {0}")]
    InvalidStatus(String),

    /// A creation-time business rule was violated
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unsupported modality: {0}")]
    UnsupportedModality(String),

    /// Neither intent-based nor modality-based selection found an engine
    #[error("no suitable processing engine found for task")]
    NoSuitableEngine,

    /// Wraps unexpected lower-level failures during task creation
    #[error("task creation failed: {0}")]
    TaskCreationFailed(String),

    /// Wraps engine-level failures during processing
    #[error("processing failed: {0}")]
    ProcessingFailed(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}
