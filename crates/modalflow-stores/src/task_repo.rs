//! TaskRepository implementations

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use modalflow_core::repository::{StoreError, TaskRepository};
use modalflow_core::types::{ModalityType, ProcessingStatus, ProcessingTask, ProcessingTaskId};

/// In-memory implementation for development and testing
pub struct InMemoryTaskRepository {
    tasks: RwLock<HashMap<String, ProcessingTask>>,
}

impl InMemoryTaskRepository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
        }
    }

    fn read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, ProcessingTask>>, StoreError> {
        self.tasks
            .read()
            .map_err(|e| StoreError::Internal(e.to_string()))
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, ProcessingTask>>, StoreError> {
        self.tasks
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))
    }

    fn filter<F>(&self, predicate: F) -> Result<Vec<ProcessingTask>, StoreError>
    where
        F: Fn(&ProcessingTask) -> bool,
    {
        let tasks = self.read()?;
        Ok(tasks.values().filter(|t| predicate(t)).cloned().collect())
    }
}

impl Default for InMemoryTaskRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn save(&self, task: &ProcessingTask) -> Result<(), StoreError> {
        let mut tasks = self.write()?;
        tasks.insert(task.id().as_str().to_string(), task.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &ProcessingTaskId,
    ) -> Result<Option<ProcessingTask>, StoreError> {
        let tasks = self.read()?;
        Ok(tasks.get(id.as_str()).cloned())
    }

    async fn find_all(&self) -> Result<Vec<ProcessingTask>, StoreError> {
        self.filter(|_| true)
    }

    async fn delete(&self, id: &ProcessingTaskId) -> Result<bool, StoreError> {
        let mut tasks = self.write()?;
        Ok(tasks.remove(id.as_str()).is_some())
    }

    async fn exists(&self, id: &ProcessingTaskId) -> Result<bool, StoreError> {
        let tasks = self.read()?;
        Ok(tasks.contains_key(id.as_str()))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let tasks = self.read()?;
        Ok(tasks.len() as u64)
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<ProcessingTask>, StoreError> {
        self.filter(|t| t.user_id() == user_id)
    }

    async fn find_by_status(
        &self,
        status: ProcessingStatus,
    ) -> Result<Vec<ProcessingTask>, StoreError> {
        self.filter(|t| t.status() == status)
    }

    async fn find_by_user_and_status(
        &self,
        user_id: &str,
        status: ProcessingStatus,
    ) -> Result<Vec<ProcessingTask>, StoreError> {
        self.filter(|t| t.user_id() == user_id && t.status() == status)
    }

    async fn find_by_modalities(
        &self,
        input: &ModalityType,
        output: &ModalityType,
    ) -> Result<Vec<ProcessingTask>, StoreError> {
        self.filter(|t| t.input_modality() == input && t.output_modality() == output)
    }

    async fn find_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProcessingTask>, StoreError> {
        self.filter(|t| t.created_at() >= start && t.created_at() <= end)
    }

    async fn find_pending_by_priority(
        &self,
        max_priority: u8,
        limit: usize,
    ) -> Result<Vec<ProcessingTask>, StoreError> {
        let mut pending = self.filter(|t| {
            t.status() == ProcessingStatus::Pending && t.priority() <= max_priority
        })?;
        pending.sort_by(|a, b| {
            a.priority()
                .cmp(&b.priority())
                .then_with(|| a.created_at().cmp(&b.created_at()))
        });
        pending.truncate(limit);
        Ok(pending)
    }

    async fn find_timed_out_processing(
        &self,
        timeout: Duration,
    ) -> Result<Vec<ProcessingTask>, StoreError> {
        let timeout = chrono::Duration::from_std(timeout)
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        let cutoff = Utc::now() - timeout;
        self.filter(|t| t.status() == ProcessingStatus::Processing && t.created_at() < cutoff)
    }

    async fn count_by_status(&self, status: ProcessingStatus) -> Result<u64, StoreError> {
        let tasks = self.read()?;
        Ok(tasks.values().filter(|t| t.status() == status).count() as u64)
    }

    async fn count_by_user(&self, user_id: &str) -> Result<u64, StoreError> {
        let tasks = self.read()?;
        Ok(tasks.values().filter(|t| t.user_id() == user_id).count() as u64)
    }

    async fn delete_completed_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tasks = self.write()?;
        let before = tasks.len();
        tasks.retain(|_, t| {
            !(t.status() == ProcessingStatus::Completed
                && t.completed_at().is_some_and(|at| at < cutoff))
        });
        Ok((before - tasks.len()) as u64)
    }
}
