//! Task repository abstraction
//!
//! Keyed CRUD plus the query surface the scheduler and retention sweeps
//! need. Implementations live in the modalflow-stores crate.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::{ModalityType, ProcessingStatus, ProcessingTask, ProcessingTaskId};

/// Store error types
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("item not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Task persistence contract
///
/// Per-key operations must be atomic; there is no cross-task locking.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn save(&self, task: &ProcessingTask) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: &ProcessingTaskId)
        -> Result<Option<ProcessingTask>, StoreError>;

    async fn find_all(&self) -> Result<Vec<ProcessingTask>, StoreError>;

    async fn delete(&self, id: &ProcessingTaskId) -> Result<bool, StoreError>;

    async fn exists(&self, id: &ProcessingTaskId) -> Result<bool, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<ProcessingTask>, StoreError>;

    async fn find_by_status(
        &self,
        status: ProcessingStatus,
    ) -> Result<Vec<ProcessingTask>, StoreError>;

    async fn find_by_user_and_status(
        &self,
        user_id: &str,
        status: ProcessingStatus,
    ) -> Result<Vec<ProcessingTask>, StoreError>;

    async fn find_by_modalities(
        &self,
        input: &ModalityType,
        output: &ModalityType,
    ) -> Result<Vec<ProcessingTask>, StoreError>;

    async fn find_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProcessingTask>, StoreError>;

    /// Pending tasks with priority <= `max_priority`, ordered by priority
    /// then creation time, at most `limit` entries
    async fn find_pending_by_priority(
        &self,
        max_priority: u8,
        limit: usize,
    ) -> Result<Vec<ProcessingTask>, StoreError>;

    /// PROCESSING tasks whose creation time is older than `timeout` ago
    async fn find_timed_out_processing(
        &self,
        timeout: Duration,
    ) -> Result<Vec<ProcessingTask>, StoreError>;

    async fn count_by_status(&self, status: ProcessingStatus) -> Result<u64, StoreError>;

    async fn count_by_user(&self, user_id: &str) -> Result<u64, StoreError>;

    /// Retention sweep: drop completed tasks finished before the cutoff.
    /// Returns the number of deleted tasks.
    async fn delete_completed_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}
