//! Modality type definitions
//!
//! A modality is a category of data (text, image, audio, ...) with
//! input/output support flags. Equality is by code only.

use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Modality type - value object describing one data category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModalityType {
    code: String,
    display_name: String,
    extensions: BTreeSet<String>,
    input_supported: bool,
    output_supported: bool,
}

impl ModalityType {
    /// Plain text (txt, md)
    pub fn text() -> Self {
        Self::predefined("TEXT", "Text", &["txt", "md"], true, true)
    }

    /// Still images
    pub fn image() -> Self {
        Self::predefined(
            "IMAGE",
            "Image",
            &["jpg", "jpeg", "png", "gif", "bmp", "webp"],
            true,
            true,
        )
    }

    /// Audio clips
    pub fn audio() -> Self {
        Self::predefined(
            "AUDIO",
            "Audio",
            &["mp3", "wav", "m4a", "aac", "flac"],
            true,
            true,
        )
    }

    /// Video clips. Input-only: no engine produces video output.
    pub fn video() -> Self {
        Self::predefined(
            "VIDEO",
            "Video",
            &["mp4", "avi", "mov", "wmv", "flv", "mkv"],
            true,
            false,
        )
    }

    /// Office/PDF documents. Input-only.
    pub fn document() -> Self {
        Self::predefined(
            "DOCUMENT",
            "Document",
            &["pdf", "doc", "docx", "ppt", "pptx", "xls", "xlsx"],
            true,
            false,
        )
    }

    fn predefined(
        code: &str,
        display_name: &str,
        extensions: &[&str],
        input_supported: bool,
        output_supported: bool,
    ) -> Self {
        Self {
            code: code.to_string(),
            display_name: display_name.to_string(),
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            input_supported,
            output_supported,
        }
    }

    /// Create a custom modality type outside the fixed catalog
    pub fn custom(
        code: impl Into<String>,
        display_name: impl Into<String>,
        extensions: impl IntoIterator<Item = String>,
        input_supported: bool,
        output_supported: bool,
    ) -> Result<Self, DomainError> {
        let code = code.into();
        let display_name = display_name.into();
        if code.trim().is_empty() {
            return Err(DomainError::InvalidInput(
                "modality code must not be empty".to_string(),
            ));
        }
        if display_name.trim().is_empty() {
            return Err(DomainError::InvalidInput(
                "modality display name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            code,
            display_name,
            extensions: extensions
                .into_iter()
                .map(|e| e.to_ascii_lowercase())
                .collect(),
            input_supported,
            output_supported,
        })
    }

    /// The fixed catalog of predefined modality types
    pub fn catalog() -> Vec<ModalityType> {
        vec![
            Self::text(),
            Self::image(),
            Self::audio(),
            Self::video(),
            Self::document(),
        ]
    }

    /// Look up a predefined modality type by code (case-insensitive)
    pub fn from_code(code: &str) -> Result<Self, DomainError> {
        Self::catalog()
            .into_iter()
            .find(|m| m.code.eq_ignore_ascii_case(code))
            .ok_or_else(|| DomainError::UnsupportedModality(code.to_string()))
    }

    /// Infer a modality type from a file extension; unknown extensions
    /// default to TEXT
    pub fn infer_from_extension(extension: &str) -> Self {
        let normalized = extension.trim().trim_start_matches('.').to_ascii_lowercase();
        if normalized.is_empty() {
            return Self::text();
        }
        Self::catalog()
            .into_iter()
            .find(|m| m.extensions.contains(&normalized))
            .unwrap_or_else(Self::text)
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn extensions(&self) -> &BTreeSet<String> {
        &self.extensions
    }

    pub fn input_supported(&self) -> bool {
        self.input_supported
    }

    pub fn output_supported(&self) -> bool {
        self.output_supported
    }

    pub fn is_text(&self) -> bool {
        self.code == "TEXT"
    }

    /// Check whether this modality recognizes the given file extension
    pub fn supports_extension(&self, extension: &str) -> bool {
        let normalized = extension.trim().trim_start_matches('.').to_ascii_lowercase();
        self.extensions.contains(&normalized)
    }
}

impl PartialEq for ModalityType {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for ModalityType {}

impl Hash for ModalityType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code.hash(state);
    }
}

impl std::fmt::Display for ModalityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.code)
    }
}
