//! Processing task aggregate and lifecycle state machine
//!
//! Identity-bearing fields are immutable after creation; lifecycle fields
//! (status, result, error, timing) change only through transition methods
//! that enforce the state machine.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::types::{InputContent, ModalityType, ProcessingPrompt, ProcessingResult};

/// Opaque task identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessingTaskId(String);

impl ProcessingTaskId {
    /// Generate a fresh unique id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Wrap a caller-supplied id
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::InvalidInput(
                "task id must not be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProcessingTaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Task lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl ProcessingStatus {
    /// PENDING and PROCESSING are active; the rest are terminal
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Only FAILED tasks may go back to PENDING
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Domain events recorded by the aggregate and drained by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskEvent {
    Created {
        task_id: ProcessingTaskId,
        input_modality: String,
        output_modality: String,
    },
    Completed {
        task_id: ProcessingTaskId,
        confidence: f64,
    },
    Failed {
        task_id: ProcessingTaskId,
        message: String,
    },
}

/// Processing task - the aggregate tracked through the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingTask {
    id: ProcessingTaskId,
    user_id: String,
    input_modality: ModalityType,
    output_modality: ModalityType,
    prompt: ProcessingPrompt,
    input_contents: Vec<InputContent>,
    parameters: HashMap<String, String>,
    priority: u8,
    created_at: DateTime<Utc>,

    status: ProcessingStatus,
    #[serde(default)]
    result: Option<ProcessingResult>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    processing_time_ms: u64,
    #[serde(skip)]
    pending_events: Vec<TaskEvent>,
}

impl ProcessingTask {
    /// Create a new task, validating cross-field business rules
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        id: ProcessingTaskId,
        user_id: impl Into<String>,
        input_modality: ModalityType,
        output_modality: ModalityType,
        prompt: ProcessingPrompt,
        input_contents: Vec<InputContent>,
        parameters: HashMap<String, String>,
        priority: u8,
    ) -> Result<Self, DomainError> {
        if input_modality.is_text() && input_contents.is_empty() && prompt.is_empty() {
            return Err(DomainError::InvalidInput(
                "text input modality requires either input content or a non-empty prompt"
                    .to_string(),
            ));
        }
        if !input_modality.is_text() && input_contents.is_empty() {
            return Err(DomainError::InvalidInput(
                "non-text input modality requires input content".to_string(),
            ));
        }
        if !input_modality.input_supported() {
            return Err(DomainError::UnsupportedModality(format!(
                "input modality not supported: {}",
                input_modality.code()
            )));
        }
        if !output_modality.output_supported() {
            return Err(DomainError::UnsupportedModality(format!(
                "output modality not supported: {}",
                output_modality.code()
            )));
        }
        if priority > 10 {
            return Err(DomainError::InvalidInput(format!(
                "priority must be between 0 and 10, got {}",
                priority
            )));
        }

        let event = TaskEvent::Created {
            task_id: id.clone(),
            input_modality: input_modality.code().to_string(),
            output_modality: output_modality.code().to_string(),
        };
        Ok(Self {
            id,
            user_id: user_id.into(),
            input_modality,
            output_modality,
            prompt,
            input_contents,
            parameters,
            priority,
            created_at: Utc::now(),
            status: ProcessingStatus::Pending,
            result: None,
            error_message: None,
            completed_at: None,
            processing_time_ms: 0,
            pending_events: vec![event],
        })
    }

    /// PENDING -> PROCESSING
    pub fn start(&mut self) -> Result<(), DomainError> {
        if self.status != ProcessingStatus::Pending {
            return Err(DomainError::InvalidStatus(format!(
                "cannot start processing task in status: {}",
                self.status
            )));
        }
        self.status = ProcessingStatus::Processing;
        Ok(())
    }

    /// PROCESSING -> COMPLETED, storing result and timing
    pub fn complete(
        &mut self,
        result: ProcessingResult,
        processing_time_ms: u64,
    ) -> Result<(), DomainError> {
        if self.status != ProcessingStatus::Processing {
            return Err(DomainError::InvalidStatus(format!(
                "cannot complete task in status: {}",
                self.status
            )));
        }
        self.pending_events.push(TaskEvent::Completed {
            task_id: self.id.clone(),
            confidence: result.confidence(),
        });
        self.result = Some(result);
        self.processing_time_ms = processing_time_ms;
        self.completed_at = Some(Utc::now());
        self.status = ProcessingStatus::Completed;
        Ok(())
    }

    /// Any non-COMPLETED state -> FAILED. Completed tasks are immutable
    /// with respect to failure.
    pub fn fail(&mut self, error_message: impl Into<String>) -> Result<(), DomainError> {
        if self.status == ProcessingStatus::Completed {
            return Err(DomainError::InvalidStatus(
                "cannot mark completed task as failed".to_string(),
            ));
        }
        let message = error_message.into();
        self.pending_events.push(TaskEvent::Failed {
            task_id: self.id.clone(),
            message: message.clone(),
        });
        self.error_message = Some(message);
        self.completed_at = Some(Utc::now());
        self.status = ProcessingStatus::Failed;
        Ok(())
    }

    /// FAILED -> PENDING, clearing prior error/result state
    pub fn retry(&mut self) -> Result<(), DomainError> {
        if self.status != ProcessingStatus::Failed {
            return Err(DomainError::InvalidStatus(format!(
                "can only retry failed tasks, current status: {}",
                self.status
            )));
        }
        self.status = ProcessingStatus::Pending;
        self.error_message = None;
        self.result = None;
        self.completed_at = None;
        self.processing_time_ms = 0;
        Ok(())
    }

    /// Any non-COMPLETED state -> CANCELLED
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        if self.status == ProcessingStatus::Completed {
            return Err(DomainError::InvalidStatus(
                "cannot cancel completed task".to_string(),
            ));
        }
        self.status = ProcessingStatus::Cancelled;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Build a replacement task with the given parameters merged in.
    /// Identity fields, lifecycle state and creation time are preserved.
    pub fn with_merged_parameters(mut self, extra: HashMap<String, String>) -> Self {
        if extra.is_empty() {
            return self;
        }
        self.parameters.extend(extra);
        self
    }

    /// Drain domain events recorded since the last call
    pub fn take_events(&mut self) -> Vec<TaskEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn id(&self) -> &ProcessingTaskId {
        &self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn input_modality(&self) -> &ModalityType {
        &self.input_modality
    }

    pub fn output_modality(&self) -> &ModalityType {
        &self.output_modality
    }

    pub fn prompt(&self) -> &ProcessingPrompt {
        &self.prompt
    }

    pub fn input_contents(&self) -> &[InputContent] {
        &self.input_contents
    }

    pub fn parameters(&self) -> &HashMap<String, String> {
        &self.parameters
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn status(&self) -> ProcessingStatus {
        self.status
    }

    pub fn result(&self) -> Option<&ProcessingResult> {
        self.result.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn processing_time_ms(&self) -> u64 {
        self.processing_time_ms
    }

    pub fn is_completed(&self) -> bool {
        self.status == ProcessingStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.status == ProcessingStatus::Failed
    }

    pub fn is_processing(&self) -> bool {
        self.status == ProcessingStatus::Processing
    }

    /// Non-text inputs always require attached files
    pub fn requires_input_files(&self) -> bool {
        !self.input_modality.is_text()
    }
}
