//! Processing prompt value type

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::types::ModalityType;

/// Maximum prompt length in characters
const MAX_PROMPT_CHARS: usize = 10_000;

const DEFAULT_LANGUAGE: &str = "zh-CN";

/// Free-text processing instruction with a language tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingPrompt {
    content: String,
    language: String,
}

impl ProcessingPrompt {
    /// Create a prompt with the default language tag
    pub fn of(content: impl Into<String>) -> Result<Self, DomainError> {
        Self::with_language(content, DEFAULT_LANGUAGE)
    }

    /// Create a prompt with an explicit language tag
    pub fn with_language(
        content: impl Into<String>,
        language: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(DomainError::InvalidInput(
                "prompt content must not be empty".to_string(),
            ));
        }
        if content.chars().count() > MAX_PROMPT_CHARS {
            return Err(DomainError::InvalidInput(format!(
                "prompt content too long (max {} characters)",
                MAX_PROMPT_CHARS
            )));
        }
        Ok(Self {
            content,
            language: language.into(),
        })
    }

    /// Default instruction for a given input modality
    pub fn default_for(modality: &ModalityType) -> Self {
        let content = match modality.code() {
            "IMAGE" => "Summarize the image content",
            "AUDIO" => "Transcribe the audio content",
            "VIDEO" => "Summarize the main content of this video",
            "DOCUMENT" => "Summarize the document content",
            _ => "Process the input content",
        };
        Self {
            content: content.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn len(&self) -> usize {
        self.content.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}
