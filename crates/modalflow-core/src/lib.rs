//! # Modalflow Core
//!
//! Core abstractions and deterministic logic for the Modalflow runtime.
//!
//! This crate contains:
//! - Modality / InputContent / Prompt / Result / Task definitions
//! - The ProcessingTask lifecycle state machine
//! - Intent taxonomy, recognizer and parameter extraction chain
//! - ProcessingEngine / TaskRepository / NlpEngine abstractions
//!
//! This crate does NOT care about:
//! - How requests arrive (HTTP, CLI, ...)
//! - Which AI backend performs the actual transformation
//! - How tasks are persisted beyond the repository trait

pub mod engine;
pub mod error;
pub mod extract;
pub mod intent;
pub mod repository;
pub mod strategy;
pub mod types;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::engine::{EngineError, EngineInfo, IntentAwareEngine, ProcessingEngine};
    pub use crate::error::DomainError;
    pub use crate::extract::{
        ExtractorChain, GeneralParameterExtractor, LendingParameterExtractor, ParameterExtractor,
    };
    pub use crate::intent::{
        classify_by_rules, IntentCategory, IntentRecognition, IntentRecognizer, NlpEngine,
        UserIntent,
    };
    pub use crate::repository::{StoreError, TaskRepository};
    pub use crate::strategy::{
        GeneralIntentStrategy, IntentSupportStrategy, LendingIntentStrategy,
    };
    pub use crate::types::{
        InputContent, ModalityType, ProcessingPrompt, ProcessingResult, ProcessingStatus,
        ProcessingTask, ProcessingTaskId, TaskEvent,
    };
}

// Re-export key types at crate root
pub use engine::{EngineError, EngineInfo, IntentAwareEngine, ProcessingEngine};
pub use error::DomainError;
pub use extract::{ExtractorChain, ParameterExtractor};
pub use intent::{IntentCategory, IntentRecognition, IntentRecognizer, NlpEngine, UserIntent};
pub use repository::{StoreError, TaskRepository};
pub use strategy::IntentSupportStrategy;
pub use types::{
    InputContent, ModalityType, ProcessingPrompt, ProcessingResult, ProcessingStatus,
    ProcessingTask, ProcessingTaskId, TaskEvent,
};
