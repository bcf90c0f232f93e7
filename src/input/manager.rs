//! Input manager for loading uploaded files into documents

use crate::error::{Result, RankerError};
use crate::processing::document::Document;
use log::{info, warn};
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Default)]
pub struct InputManager;

impl InputManager {
    pub fn new() -> Self {
        Self
    }

    /// Read a file into a [`Document`] named after its file name.
    ///
    /// Unsupported extensions are loaded anyway; the pipeline scores them as zero.
    pub async fn load_document(&self, path: &Path) -> Result<Document> {
        if !path.exists() {
            return Err(RankerError::Validation(format!(
                "File does not exist: {}",
                path.display()
            )));
        }

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| RankerError::Validation(format!("Not a file: {}", path.display())))?;

        let bytes = fs::read(path).await?;
        let document = Document::new(filename, bytes);

        if !document.format().is_supported() {
            warn!("{} is not a PDF or DOCX file and will score 0", path.display());
        }
        info!("Loaded {} ({} bytes)", path.display(), document.bytes().len());

        Ok(document)
    }

    pub async fn load_documents(&self, paths: &[PathBuf]) -> Result<Vec<Document>> {
        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            documents.push(self.load_document(path).await?);
        }
        Ok(documents)
    }

    /// Job descriptions are plain text files.
    pub async fn read_job_description(&self, path: &Path) -> Result<String> {
        if !path.exists() {
            return Err(RankerError::Validation(format!(
                "Job description file does not exist: {}",
                path.display()
            )));
        }
        Ok(fs::read_to_string(path).await?)
    }
}
