//! Processing result value type

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DomainError;

/// Outcome produced by a processing engine
///
/// Carries either text or binary output (at least one), a confidence score
/// and free-form metadata. Immutable; `with_metadata` returns a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    binary_content: Option<Vec<u8>>,
    content_type: String,
    confidence: f64,
    #[serde(default)]
    metadata: HashMap<String, Value>,
    generated_at: DateTime<Utc>,
}

impl ProcessingResult {
    /// Create a plain text result
    pub fn text(content: impl Into<String>, confidence: f64) -> Result<Self, DomainError> {
        Self::new(Some(content.into()), None, "text/plain", confidence, HashMap::new())
    }

    /// Create a text result carrying metadata
    pub fn text_with_metadata(
        content: impl Into<String>,
        confidence: f64,
        metadata: HashMap<String, Value>,
    ) -> Result<Self, DomainError> {
        Self::new(Some(content.into()), None, "text/plain", confidence, metadata)
    }

    /// Create a binary result
    pub fn binary(
        binary_content: Vec<u8>,
        content_type: impl Into<String>,
        confidence: f64,
    ) -> Result<Self, DomainError> {
        Self::new(None, Some(binary_content), content_type, confidence, HashMap::new())
    }

    /// Create a binary result carrying metadata
    pub fn binary_with_metadata(
        binary_content: Vec<u8>,
        content_type: impl Into<String>,
        confidence: f64,
        metadata: HashMap<String, Value>,
    ) -> Result<Self, DomainError> {
        Self::new(None, Some(binary_content), content_type, confidence, metadata)
    }

    fn new(
        content: Option<String>,
        binary_content: Option<Vec<u8>>,
        content_type: impl Into<String>,
        confidence: f64,
        metadata: HashMap<String, Value>,
    ) -> Result<Self, DomainError> {
        let content_type = content_type.into();
        let has_text = content.as_deref().is_some_and(|c| !c.trim().is_empty());
        let has_binary = binary_content.as_deref().is_some_and(|b| !b.is_empty());
        if !has_text && !has_binary {
            return Err(DomainError::InvalidInput(
                "processing result must have either text or binary content".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(DomainError::InvalidInput(
                "confidence must be between 0.0 and 1.0".to_string(),
            ));
        }
        if content_type.trim().is_empty() {
            return Err(DomainError::InvalidInput(
                "result content type must not be empty".to_string(),
            ));
        }
        Ok(Self {
            content,
            binary_content,
            content_type,
            confidence,
            metadata,
            generated_at: Utc::now(),
        })
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn binary_content(&self) -> Option<&[u8]> {
        self.binary_content.as_deref()
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn has_text_content(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.trim().is_empty())
    }

    pub fn has_binary_content(&self) -> bool {
        self.binary_content.as_deref().is_some_and(|b| !b.is_empty())
    }

    /// Content size: characters for text results, bytes for binary ones
    pub fn content_size(&self) -> usize {
        if self.has_text_content() {
            return self.content.as_deref().map(str::len).unwrap_or(0);
        }
        self.binary_content.as_deref().map(<[u8]>::len).unwrap_or(0)
    }

    /// Return a new result with one extra metadata entry
    pub fn with_metadata(&self, key: impl Into<String>, value: Value) -> Self {
        let mut next = self.clone();
        next.metadata.insert(key.into(), value);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_requires_some_content() {
        assert!(ProcessingResult::text("   ", 0.5).is_err());
        assert!(ProcessingResult::binary(Vec::new(), "image/png", 0.5).is_err());
        assert!(ProcessingResult::text("ok", 0.5).is_ok());
    }

    #[test]
    fn test_confidence_bounds() {
        assert!(ProcessingResult::text("ok", -0.1).is_err());
        assert!(ProcessingResult::text("ok", 1.1).is_err());
        assert!(ProcessingResult::text("ok", 0.0).is_ok());
        assert!(ProcessingResult::text("ok", 1.0).is_ok());
    }

    #[test]
    fn test_with_metadata_returns_new_instance() {
        let result = ProcessingResult::text("ok", 0.9).unwrap();
        let enriched = result.with_metadata("engine", json!("lending"));
        assert!(result.metadata().is_empty());
        assert_eq!(enriched.metadata().get("engine"), Some(&json!("lending")));
        assert_eq!(enriched.content(), Some("ok"));
    }

    #[test]
    fn test_content_size() {
        let text = ProcessingResult::text("hello", 0.9).unwrap();
        assert_eq!(text.content_size(), 5);
        let binary = ProcessingResult::binary(vec![0u8; 7], "image/png", 0.9).unwrap();
        assert_eq!(binary.content_size(), 7);
    }
}
