//! Configuration management for the resume ranker

use crate::error::{Result, RankerError};
use crate::processing::chunker::DEFAULT_OVERLAP;
use crate::processing::scorer::Reduction;
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Chunk sizes outside this range still work but were never tuned for.
pub const RECOMMENDED_CHUNK_SIZE: std::ops::RangeInclusive<usize> = 200..=1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub models: ModelConfig,
    pub processing: ProcessingConfig,
    pub scoring: ScoringConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub models_dir: PathBuf,
    pub embedding_model: String,
    pub batch_size: usize,
    pub max_sequence_length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub reduction: Reduction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub color_output: bool,
    pub preview_chars: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Console,
    Json,
}

impl Default for Config {
    fn default() -> Self {
        let models_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".resume-ranker")
            .join("models");

        Self {
            models: ModelConfig {
                models_dir,
                embedding_model: "all-MiniLM-L6-v2".to_string(),
                batch_size: 32,
                max_sequence_length: 256,
            },
            processing: ProcessingConfig {
                chunk_size: 500,
                chunk_overlap: DEFAULT_OVERLAP,
            },
            scoring: ScoringConfig {
                reduction: Reduction::Max,
            },
            output: OutputConfig {
                format: OutputFormat::Console,
                color_output: true,
                preview_chars: 80,
            },
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing file is created with the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| RankerError::Configuration(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| RankerError::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("resume-ranker")
            .join("config.toml")
    }

    pub fn models_dir(&self) -> &PathBuf {
        &self.models.models_dir
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.processing.chunk_size == 0 {
            return Err(RankerError::Configuration(
                "processing.chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.models.batch_size == 0 {
            return Err(RankerError::Configuration(
                "models.batch_size must be greater than zero".to_string(),
            ));
        }
        if self.models.max_sequence_length == 0 {
            return Err(RankerError::Configuration(
                "models.max_sequence_length must be greater than zero".to_string(),
            ));
        }
        if let Reduction::TopKMean { k: 0 } = self.scoring.reduction {
            return Err(RankerError::Configuration(
                "scoring.reduction top-k requires k > 0".to_string(),
            ));
        }

        if self.processing.chunk_overlap >= self.processing.chunk_size {
            warn!(
                "chunk_overlap ({}) >= chunk_size ({}); windows will advance one character at a time",
                self.processing.chunk_overlap, self.processing.chunk_size
            );
        }
        if !RECOMMENDED_CHUNK_SIZE.contains(&self.processing.chunk_size) {
            warn!(
                "chunk_size {} is outside the recommended range {}-{}",
                self.processing.chunk_size,
                RECOMMENDED_CHUNK_SIZE.start(),
                RECOMMENDED_CHUNK_SIZE.end()
            );
        }

        Ok(())
    }
}
