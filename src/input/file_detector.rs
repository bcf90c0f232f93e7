//! File format detection

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Unsupported,
}

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => DocumentFormat::Pdf,
            "docx" => DocumentFormat::Docx,
            _ => DocumentFormat::Unsupported,
        }
    }

    /// Detect from the filename suffix. Names without an extension are unsupported.
    pub fn from_filename(filename: &str) -> Self {
        extension_of(filename)
            .map(Self::from_extension)
            .unwrap_or(DocumentFormat::Unsupported)
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, DocumentFormat::Unsupported)
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Pdf => write!(f, "pdf"),
            DocumentFormat::Docx => write!(f, "docx"),
            DocumentFormat::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// The extension part of `filename`, if any, for diagnostics.
pub fn extension_of(filename: &str) -> Option<&str> {
    filename.rsplit_once('.').map(|(_, ext)| ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_supported_formats() {
        assert_eq!(DocumentFormat::from_filename("cv.pdf"), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::from_filename("cv.docx"), DocumentFormat::Docx);
        assert_eq!(DocumentFormat::from_filename("Jane.Doe.Resume.PDF"), DocumentFormat::Pdf);
    }

    #[test]
    fn test_everything_else_is_unsupported() {
        assert_eq!(DocumentFormat::from_filename("cv.doc"), DocumentFormat::Unsupported);
        assert_eq!(DocumentFormat::from_filename("cv.txt"), DocumentFormat::Unsupported);
        assert_eq!(DocumentFormat::from_filename("resume"), DocumentFormat::Unsupported);
        assert_eq!(DocumentFormat::from_filename("archive.pdf.zip"), DocumentFormat::Unsupported);
        assert!(!DocumentFormat::Unsupported.is_supported());
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("a.tar.gz"), Some("gz"));
        assert_eq!(extension_of("README"), None);
    }
}
