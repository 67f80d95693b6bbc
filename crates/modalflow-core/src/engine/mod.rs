//! Processing engine abstraction
//!
//! Engines perform the actual modality transformation. The orchestrator only
//! sees this trait; concrete backends live in external crates.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;
use thiserror::Error;

use crate::intent::UserIntent;
use crate::types::{ProcessingResult, ProcessingTask};

/// Engine-level failures, wrapped into task failure by the orchestrator
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("engine does not support task: {0}")]
    Unsupported(String),

    #[error("invalid engine output: {0}")]
    InvalidOutput(String),
}

/// Processing engine contract
#[async_trait]
pub trait ProcessingEngine: Send + Sync {
    /// Unique engine name for diagnostics and logs
    fn name(&self) -> &str;

    /// Lower values are tried first when callers order registrations
    fn priority(&self) -> i32;

    /// Pure predicate over the task's modality pair (and optionally more)
    fn supports(&self, task: &ProcessingTask) -> bool;

    /// Liveness check, re-evaluated on every selection
    fn is_healthy(&self) -> bool;

    /// Rough latency estimate for scheduling hints
    fn estimate_processing_time(&self, task: &ProcessingTask) -> Duration;

    /// Single-shot execution
    async fn process(&self, task: &ProcessingTask) -> Result<ProcessingResult, EngineError>;

    /// Incremental execution. Engines without native streaming inherit this
    /// one-element wrapper around [`ProcessingEngine::process`].
    fn process_stream<'a>(
        &'a self,
        task: &'a ProcessingTask,
    ) -> BoxStream<'a, Result<ProcessingResult, EngineError>> {
        Box::pin(futures::stream::once(self.process(task)))
    }

    /// Specialized engines expose a per-intent entry point here; the
    /// orchestrator calls it when intent-based routing won.
    fn intent_handler(&self) -> Option<&dyn IntentAwareEngine> {
        None
    }
}

/// Extension contract for engines that route internally by intent
#[async_trait]
pub trait IntentAwareEngine: Send + Sync {
    async fn process_with_intent(
        &self,
        task: &ProcessingTask,
        intent: UserIntent,
    ) -> Result<ProcessingResult, EngineError>;
}

/// Read-only diagnostic snapshot of a registered engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineInfo {
    pub name: String,
    pub priority: i32,
    pub healthy: bool,
}
