//! Generic LLM-backed text engine

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use modalflow_core::engine::{EngineError, ProcessingEngine};
use modalflow_core::types::{ProcessingResult, ProcessingTask};
use modalflow_nlp::{LlmClient, LlmRequest};

const TEXT_ENGINE_NAME: &str = "text-generation";
const SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Answer the user's request directly and concisely.";

/// TEXT -> TEXT engine delegating to an LLM. Lowest-priority fallback for
/// prompts no specialized engine claims.
pub struct TextGenerationEngine<C: LlmClient> {
    client: C,
    model: String,
    temperature: f32,
}

impl<C: LlmClient> TextGenerationEngine<C> {
    pub fn new(client: C, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            client,
            model: model.into(),
            temperature,
        }
    }
}

#[async_trait]
impl<C: LlmClient> ProcessingEngine for TextGenerationEngine<C> {
    fn name(&self) -> &str {
        TEXT_ENGINE_NAME
    }

    fn priority(&self) -> i32 {
        100
    }

    fn supports(&self, task: &ProcessingTask) -> bool {
        task.input_modality().is_text() && task.output_modality().is_text()
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn estimate_processing_time(&self, _task: &ProcessingTask) -> Duration {
        Duration::from_secs(5)
    }

    async fn process(&self, task: &ProcessingTask) -> Result<ProcessingResult, EngineError> {
        let request = LlmRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: task.prompt().content().to_string(),
            model: self.model.clone(),
            temperature: self.temperature,
        };
        let output = self
            .client
            .complete(request)
            .await
            .map_err(|e| EngineError::Backend(e.to_string()))?;
        if output.trim().is_empty() {
            return Err(EngineError::InvalidOutput(
                "model returned empty text".to_string(),
            ));
        }
        info!(task_id = %task.id(), output_chars = output.chars().count(), "text generated");

        let metadata = HashMap::from([(
            "model".to_string(),
            serde_json::Value::String(self.model.clone()),
        )]);
        ProcessingResult::text_with_metadata(output, 0.9, metadata)
            .map_err(|e| EngineError::InvalidOutput(e.to_string()))
    }
}
