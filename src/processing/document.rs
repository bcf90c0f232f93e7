//! Document and result structures

use crate::input::file_detector::DocumentFormat;
use serde::{Deserialize, Serialize};

/// Characters of extracted text carried in a result preview.
pub const PREVIEW_CHARS: usize = 200;

/// Preview shown when extraction succeeded but produced no text.
pub const NO_TEXT_PREVIEW: &str = "No text found";

/// Placeholder text for files that are neither PDF nor DOCX.
pub const UNSUPPORTED_PLACEHOLDER: &str = "Unsupported file format.";

/// An uploaded file. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    filename: String,
    bytes: Vec<u8>,
    format: DocumentFormat,
}

impl Document {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let format = DocumentFormat::from_filename(&filename);

        Self {
            filename,
            bytes,
            format,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }
}

/// Outcome of pulling plain text out of a [`Document`].
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Text(String),
    Failed { reason: String },
    Unsupported,
}

impl Extraction {
    /// Human-readable reason when no text could be produced.
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            Extraction::Text(_) => None,
            Extraction::Failed { reason } => Some(reason.clone()),
            Extraction::Unsupported => Some(UNSUPPORTED_PLACEHOLDER.to_string()),
        }
    }
}

/// One ranked row handed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub filename: String,
    pub score: f32,
    pub match_percentage: String,
    pub preview: String,
    pub chunk_count: usize,
    pub error: Option<String>,
}

impl MatchResult {
    pub fn scored(filename: &str, text: &str, score: f32, chunk_count: usize) -> Self {
        Self {
            filename: filename.to_string(),
            score,
            match_percentage: format_percentage(score),
            preview: preview(text),
            chunk_count,
            error: None,
        }
    }

    /// Zero-score result for a document whose text never reached the model.
    /// The preview is capped like any other; `error` keeps the full reason.
    pub fn unextracted(filename: &str, reason: String) -> Self {
        Self {
            filename: filename.to_string(),
            score: 0.0,
            match_percentage: format_percentage(0.0),
            preview: preview(&reason),
            chunk_count: 0,
            error: Some(reason),
        }
    }

    /// Zero-score result for a document whose chunks could not be embedded.
    pub fn unscored(filename: &str, text: &str, chunk_count: usize, reason: String) -> Self {
        Self {
            error: Some(reason),
            ..Self::scored(filename, text, 0.0, chunk_count)
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// `0.8567` becomes `"85.67%"`.
pub fn format_percentage(score: f32) -> String {
    format!("{:.2}%", score * 100.0)
}

/// First [`PREVIEW_CHARS`] characters, or [`NO_TEXT_PREVIEW`] for empty text.
pub fn preview(text: &str) -> String {
    if text.is_empty() {
        return NO_TEXT_PREVIEW.to_string();
    }
    text.chars().take(PREVIEW_CHARS).collect()
}
