//! Input content value type

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::types::ModalityType;

/// Maximum accepted payload size (100 MB)
const MAX_CONTENT_BYTES: usize = 100 * 1024 * 1024;

/// One piece of input data attached to a processing task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputContent {
    file_name: String,
    content: Vec<u8>,
    content_type: String,
    size: usize,
    modality: ModalityType,
}

impl InputContent {
    /// Create input content from a named payload
    pub fn of(
        file_name: impl Into<String>,
        content: Vec<u8>,
        content_type: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let file_name = file_name.into();
        let content_type = content_type.into();

        if file_name.trim().is_empty() {
            return Err(DomainError::InvalidInput(
                "file name must not be empty".to_string(),
            ));
        }
        if content.is_empty() {
            return Err(DomainError::InvalidInput(
                "input content must not be empty".to_string(),
            ));
        }
        if content.len() > MAX_CONTENT_BYTES {
            return Err(DomainError::InvalidInput(format!(
                "input content exceeds maximum size of {} bytes",
                MAX_CONTENT_BYTES
            )));
        }
        if content_type.trim().is_empty() {
            return Err(DomainError::InvalidInput(
                "content type must not be empty".to_string(),
            ));
        }

        let size = content.len();
        let modality = infer_modality(&file_name, &content_type);
        Ok(Self {
            file_name,
            content,
            content_type,
            size,
            modality,
        })
    }

    /// Create plain-text input content
    pub fn text(text: impl Into<String>) -> Result<Self, DomainError> {
        Self::of("input.txt", text.into().into_bytes(), "text/plain")
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn modality(&self) -> &ModalityType {
        &self.modality
    }

    /// File extension (lowercase, without the dot); empty when absent
    pub fn file_extension(&self) -> String {
        match self.file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
            _ => String::new(),
        }
    }
}

/// Content-type prefix wins; extension lookup second; TEXT as the default
fn infer_modality(file_name: &str, content_type: &str) -> ModalityType {
    if content_type.starts_with("image/") {
        return ModalityType::image();
    }
    if content_type.starts_with("audio/") {
        return ModalityType::audio();
    }
    if content_type.starts_with("video/") {
        return ModalityType::video();
    }
    if content_type.starts_with("text/") {
        return ModalityType::text();
    }

    let extension = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext,
        _ => "",
    };
    ModalityType::infer_from_extension(extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_payload() {
        assert!(InputContent::of("a.txt", Vec::new(), "text/plain").is_err());
    }

    #[test]
    fn test_rejects_blank_file_name() {
        assert!(InputContent::of("  ", vec![1], "text/plain").is_err());
    }

    #[test]
    fn test_content_type_prefix_wins_over_extension() {
        let content = InputContent::of("photo.txt", vec![1, 2, 3], "image/png").unwrap();
        assert_eq!(content.modality(), &ModalityType::image());
    }

    #[test]
    fn test_extension_lookup_when_content_type_is_opaque() {
        let content =
            InputContent::of("clip.mp4", vec![0u8; 16], "application/octet-stream").unwrap();
        assert_eq!(content.modality(), &ModalityType::video());
    }

    #[test]
    fn test_defaults_to_text_modality() {
        let content =
            InputContent::of("blob.bin", vec![0u8; 4], "application/octet-stream").unwrap();
        assert_eq!(content.modality(), &ModalityType::text());
    }

    #[test]
    fn test_file_extension() {
        let content = InputContent::of("Report.PDF", vec![1], "application/pdf").unwrap();
        assert_eq!(content.file_extension(), "pdf");
        let content = InputContent::text("hello").unwrap();
        assert_eq!(content.file_extension(), "txt");
    }
}
