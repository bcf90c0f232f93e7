//! Embedding model registry: resolving, downloading and locating model files

use crate::error::{Result, RankerError};
use hf_hub::api::tokio::Api;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Every supported backend needs exactly these three files.
pub const MODEL_FILES: [&str; 3] = ["config.json", "tokenizer.json", "model.safetensors"];

/// Information about an available embedding model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingModelInfo {
    pub name: String,
    pub repo_id: String,
    pub size_mb: u64,
    pub description: String,
    pub backend: EmbeddingBackend,
    pub dimensions: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbeddingBackend {
    /// Transformer sentence encoder run with candle
    Bert,
    /// Model2Vec static token embeddings
    Static,
}

/// A model ready to load from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelLocation {
    pub id: String,
    pub dir: PathBuf,
    pub backend: EmbeddingBackend,
}

/// Manager for embedding models - handles download, caching, and selection
pub struct EmbeddingModelManager {
    models_dir: PathBuf,
    available_models: BTreeMap<String, EmbeddingModelInfo>,
    downloaded_models: HashSet<String>,
    api: Api,
}

impl EmbeddingModelManager {
    /// Create a new embedding model manager
    pub async fn new(models_dir: PathBuf) -> Result<Self> {
        if !models_dir.exists() {
            fs::create_dir_all(&models_dir).await.map_err(|e| {
                RankerError::ModelLoading(format!("Failed to create models directory: {}", e))
            })?;
        }

        let api = Api::new()
            .map_err(|e| RankerError::ModelLoading(format!("Failed to initialize HF API: {}", e)))?;

        let mut manager = Self {
            models_dir,
            available_models: BTreeMap::new(),
            downloaded_models: HashSet::new(),
            api,
        };

        manager.init_available_models();
        manager.scan_downloaded_models().await?;

        Ok(manager)
    }

    fn init_available_models(&mut self) {
        self.available_models.insert(
            "all-MiniLM-L6-v2".to_string(),
            EmbeddingModelInfo {
                name: "MiniLM L6 v2".to_string(),
                repo_id: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
                size_mb: 91,
                description: "General-purpose sentence encoder (default)".to_string(),
                backend: EmbeddingBackend::Bert,
                dimensions: 384,
            },
        );

        self.available_models.insert(
            "paraphrase-MiniLM-L3-v2".to_string(),
            EmbeddingModelInfo {
                name: "Paraphrase MiniLM L3 v2".to_string(),
                repo_id: "sentence-transformers/paraphrase-MiniLM-L3-v2".to_string(),
                size_mb: 70,
                description: "Three-layer encoder, faster and slightly less accurate".to_string(),
                backend: EmbeddingBackend::Bert,
                dimensions: 384,
            },
        );

        self.available_models.insert(
            "potion-base-8M".to_string(),
            EmbeddingModelInfo {
                name: "Potion Base 8M".to_string(),
                repo_id: "minishlab/potion-base-8M".to_string(),
                size_mb: 33,
                description: "Model2Vec static embeddings, no transformer pass".to_string(),
                backend: EmbeddingBackend::Static,
                dimensions: 256,
            },
        );
    }

    async fn scan_downloaded_models(&mut self) -> Result<()> {
        let mut entries = fs::read_dir(&self.models_dir).await.map_err(|e| {
            RankerError::ModelLoading(format!("Failed to scan models directory: {}", e))
        })?;

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() && has_model_files(&entry.path()).await {
                self.downloaded_models
                    .insert(entry.file_name().to_string_lossy().to_string());
            }
        }

        Ok(())
    }

    /// Download a registered model from the Hugging Face Hub into `models_dir/<id>`.
    pub async fn download_model(&mut self, model_id: &str, force: bool) -> Result<PathBuf> {
        let model_info = self
            .available_models
            .get(model_id)
            .ok_or_else(|| RankerError::ModelLoading(format!("Unknown embedding model: {}", model_id)))?
            .clone();

        let model_dir = self.models_dir.join(model_id);

        if !force && self.downloaded_models.contains(model_id) {
            return Ok(model_dir);
        }

        info!(
            "Downloading embedding model {} ({} MB) from {}",
            model_info.name, model_info.size_mb, model_info.repo_id
        );

        fs::create_dir_all(&model_dir).await?;
        let repo = self.api.model(model_info.repo_id.clone());

        for file in MODEL_FILES {
            let cached = repo.get(file).await.map_err(|e| {
                RankerError::ModelLoading(format!("Failed to download required file {}: {}", file, e))
            })?;
            fs::copy(&cached, model_dir.join(file))
                .await
                .map_err(|e| RankerError::ModelLoading(format!("Failed to copy {}: {}", file, e)))?;
            info!("Downloaded {}", file);
        }

        self.downloaded_models.insert(model_id.to_string());
        info!("Embedding model {} downloaded successfully", model_info.name);
        Ok(model_dir)
    }

    /// Resolve `input` to model files on disk, downloading a registered model on first use.
    ///
    /// `input` may be a registry id, a repo id, a display name, or a local
    /// directory containing the model files.
    pub async fn ensure_model_available(&mut self, input: &str) -> Result<ModelLocation> {
        let local = Path::new(input);
        if local.is_dir() {
            if !has_model_files(local).await {
                return Err(RankerError::ModelLoading(format!(
                    "{} is missing one of: {}",
                    local.display(),
                    MODEL_FILES.join(", ")
                )));
            }
            let backend = detect_backend(local).await?;
            return Ok(ModelLocation {
                id: input.to_string(),
                dir: local.to_path_buf(),
                backend,
            });
        }

        let model_id = self
            .resolve_model_id(input)
            .ok_or_else(|| RankerError::ModelLoading(format!("Unknown embedding model: {}", input)))?;
        let backend = self.available_models[&model_id].backend;

        let dir = match self.get_model_path(&model_id) {
            Some(path) => path,
            None => {
                warn!("Model {} not found locally, fetching it once", model_id);
                self.download_model(&model_id, false).await?
            }
        };

        Ok(ModelLocation {
            id: model_id,
            dir,
            backend,
        })
    }

    pub fn get_model_path(&self, model_id: &str) -> Option<PathBuf> {
        if self.downloaded_models.contains(model_id) {
            Some(self.models_dir.join(model_id))
        } else {
            None
        }
    }

    /// Registered models in id order
    pub fn list_available_models(&self) -> Vec<(&String, &EmbeddingModelInfo)> {
        self.available_models.iter().collect()
    }

    pub fn get_model_info(&self, model_id: &str) -> Option<&EmbeddingModelInfo> {
        self.available_models.get(model_id)
    }

    pub fn is_model_downloaded(&self, model_id: &str) -> bool {
        self.downloaded_models.contains(model_id)
    }

    /// Resolve model ID from various formats (id, repo_id, name)
    pub fn resolve_model_id(&self, input: &str) -> Option<String> {
        if self.available_models.contains_key(input) {
            return Some(input.to_string());
        }

        for (id, info) in &self.available_models {
            if info.repo_id == input {
                return Some(id.clone());
            }
        }

        let input_lower = input.to_lowercase();
        for (id, info) in &self.available_models {
            if info.name.to_lowercase() == input_lower || id.to_lowercase() == input_lower {
                return Some(id.clone());
            }
        }

        None
    }
}

async fn has_model_files(dir: &Path) -> bool {
    for file in MODEL_FILES {
        if fs::metadata(dir.join(file)).await.is_err() {
            return false;
        }
    }
    true
}

/// BERT configs carry transformer hyperparameters; Model2Vec configs do not.
async fn detect_backend(dir: &Path) -> Result<EmbeddingBackend> {
    let content = fs::read_to_string(dir.join("config.json")).await?;
    let config: serde_json::Value = serde_json::from_str(&content)?;

    let is_bert = config.get("model_type").and_then(serde_json::Value::as_str) == Some("bert")
        || config.get("num_hidden_layers").is_some();

    Ok(if is_bert {
        EmbeddingBackend::Bert
    } else {
        EmbeddingBackend::Static
    })
}
