//! Sentence embeddings
//!
//! Two backends sit behind [`Embedder`]: a BERT sentence-transformer run with
//! candle (`all-MiniLM-L6-v2` by default) and Model2Vec static embeddings.
//! The process entry point loads one of them once through
//! [`EmbeddingEngine::load`] and hands the `Arc` to the ranking pipeline.

use crate::config::Config;
use crate::error::{Result, RankerError};
use crate::processing::embedding_manager::{EmbeddingBackend, EmbeddingModelManager, ModelLocation};
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use log::{debug, info};
use model2vec_rs::model::StaticModel;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

/// A text-to-vector function shared by every document in a ranking run.
///
/// Implementations must be deterministic: the same text always yields the
/// same vector.
pub trait Embedder: Send + Sync {
    /// Embed `texts` in one logical batch, preserving order.
    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn encode_one(&self, text: &str) -> Result<Vec<f32>> {
        self.encode_batch(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| RankerError::Embedding("model returned no embedding".to_string()))
    }

    fn dimension(&self) -> usize;

    fn model_id(&self) -> &str;
}

/// BERT sentence-transformer with attention-masked mean pooling and L2 normalisation.
pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
    dimension: usize,
    batch_size: usize,
}

impl BertEmbedder {
    /// Load from a directory holding `config.json`, `tokenizer.json` and `model.safetensors`.
    pub fn from_dir(
        model_id: &str,
        dir: &Path,
        batch_size: usize,
        max_sequence_length: usize,
    ) -> Result<Self> {
        let device = select_device();

        let config_json = std::fs::read_to_string(dir.join("config.json"))?;
        let config: BertConfig = serde_json::from_str(&config_json)
            .map_err(|e| RankerError::ModelLoading(format!("Invalid config.json: {}", e)))?;
        let dimension = serde_json::from_str::<serde_json::Value>(&config_json)
            .map_err(|e| RankerError::ModelLoading(format!("Invalid config.json: {}", e)))?
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| RankerError::ModelLoading("config.json has no hidden_size".to_string()))?
            as usize;

        let mut tokenizer = Tokenizer::from_file(dir.join("tokenizer.json"))
            .map_err(|e| RankerError::ModelLoading(format!("Failed to load tokenizer: {}", e)))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_sequence_length,
                ..Default::default()
            }))
            .map_err(|e| RankerError::ModelLoading(format!("Failed to configure truncation: {}", e)))?;

        let weights = std::fs::read(dir.join("model.safetensors"))?;
        let vb = VarBuilder::from_buffered_safetensors(weights, DTYPE, &device)
            .map_err(|e| RankerError::ModelLoading(format!("Failed to read weights: {}", e)))?;
        let model = BertModel::load(vb, &config)
            .map_err(|e| RankerError::ModelLoading(format!("Failed to build BERT model: {}", e)))?;

        Ok(Self {
            model,
            tokenizer,
            device,
            model_id: model_id.to_string(),
            dimension,
            batch_size: batch_size.max(1),
        })
    }

    fn encode_sub_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| RankerError::Embedding(format!("Tokenization failed: {}", e)))?;

        let ids = encodings
            .iter()
            .map(|enc| Tensor::new(enc.get_ids(), &self.device))
            .collect::<candle_core::Result<Vec<_>>>()?;
        let masks = encodings
            .iter()
            .map(|enc| Tensor::new(enc.get_attention_mask(), &self.device))
            .collect::<candle_core::Result<Vec<_>>>()?;

        let input_ids = Tensor::stack(&ids, 0)?;
        let attention_mask = Tensor::stack(&masks, 0)?;
        let token_type_ids = input_ids.zeros_like()?;

        // [batch, seq_len, hidden]
        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // Mean over real tokens only; padding positions are masked out
        let mask = attention_mask.to_dtype(DTYPE)?.unsqueeze(2)?;
        let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?.maximum(1e-9)?;
        let pooled = summed.broadcast_div(&counts)?;

        let norms = pooled.sqr()?.sum_keepdim(1)?.sqrt()?.maximum(1e-12)?;
        let normalized = pooled.broadcast_div(&norms)?;

        Ok(normalized.to_vec2::<f32>()?)
    }
}

impl Embedder for BertEmbedder {
    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start_time = Instant::now();
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            embeddings.extend(self.encode_sub_batch(batch)?);
        }

        debug!("Encoded {} texts in {:.2?}", texts.len(), start_time.elapsed());
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Model2Vec static embeddings: token vectors averaged, no transformer pass.
pub struct StaticEmbedder {
    model: StaticModel,
    model_id: String,
    dimension: usize,
}

impl StaticEmbedder {
    pub fn from_dir(model_id: &str, dir: &Path) -> Result<Self> {
        let model = StaticModel::from_pretrained(
            dir,
            None, // token
            None, // normalize
            None, // subfolder
        )?;
        let dimension = model.encode_single("").len();

        Ok(Self {
            model,
            model_id: model_id.to_string(),
            dimension,
        })
    }
}

impl Embedder for StaticEmbedder {
    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(self.model.encode(texts))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Selects the best available compute device.
pub fn select_device() -> Device {
    if let Ok(cuda_device) = Device::new_cuda(0) {
        info!("Using CUDA GPU");
        return cuda_device;
    }

    if let Ok(metal_device) = Device::new_metal(0) {
        info!("Using Metal GPU");
        return metal_device;
    }

    info!("Using CPU");
    Device::Cpu
}

pub struct EmbeddingEngine;

impl EmbeddingEngine {
    /// Resolve, fetch if needed, and load the configured embedding model.
    pub async fn load(config: &Config) -> Result<Arc<dyn Embedder>> {
        let mut manager = EmbeddingModelManager::new(config.models_dir().clone()).await?;
        let location = manager.ensure_model_available(&config.models.embedding_model).await?;
        Self::load_from(&location, config)
    }

    /// Load an already-downloaded model.
    pub fn load_from(location: &ModelLocation, config: &Config) -> Result<Arc<dyn Embedder>> {
        let start_time = Instant::now();
        info!(
            "Loading {:?} embedding model '{}' from: {}",
            location.backend,
            location.id,
            location.dir.display()
        );

        let embedder: Arc<dyn Embedder> = match location.backend {
            EmbeddingBackend::Bert => Arc::new(BertEmbedder::from_dir(
                &location.id,
                &location.dir,
                config.models.batch_size,
                config.models.max_sequence_length,
            )?),
            EmbeddingBackend::Static => Arc::new(StaticEmbedder::from_dir(&location.id, &location.dir)?),
        };

        info!(
            "Model loaded successfully in {:.2?} ({} dimensions)",
            start_time.elapsed(),
            embedder.dimension()
        );
        Ok(embedder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixed(Vec<f32>);

    impl Embedder for Fixed {
        fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| self.0.clone()).collect())
        }

        fn dimension(&self) -> usize {
            self.0.len()
        }

        fn model_id(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn test_encode_one_uses_batch() {
        let embedder = Fixed(vec![1.0, 2.0]);
        assert_eq!(embedder.encode_one("anything").unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_bert_from_missing_dir_fails() {
        let temp_dir = TempDir::new().unwrap();
        let result = BertEmbedder::from_dir("missing", temp_dir.path(), 8, 128);
        assert!(result.is_err());
    }

    const TINY_BERT_CONFIG: &str = r#"{"vocab_size": 10, "hidden_size": 4, "num_hidden_layers": 1,
        "num_attention_heads": 1, "intermediate_size": 8, "hidden_act": "gelu",
        "hidden_dropout_prob": 0.0, "max_position_embeddings": 16,
        "type_vocab_size": 2, "initializer_range": 0.02, "layer_norm_eps": 1e-12,
        "pad_token_id": 0}"#;

    const TINY_TOKENIZER: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {"[UNK]": 0, "[PAD]": 1, "rust": 2, "engineer": 3},
            "unk_token": "[UNK]"
        }
    }"#;

    fn model_dir(tokenizer: &str, weights: &[u8]) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("config.json"), TINY_BERT_CONFIG).unwrap();
        std::fs::write(temp_dir.path().join("tokenizer.json"), tokenizer).unwrap();
        std::fs::write(temp_dir.path().join("model.safetensors"), weights).unwrap();
        temp_dir
    }

    fn load_error(dir: &TempDir) -> String {
        match BertEmbedder::from_dir("broken", dir.path(), 8, 128) {
            Err(RankerError::ModelLoading(msg)) => msg,
            Err(other) => panic!("expected ModelLoading, got {:?}", other),
            Ok(_) => panic!("expected the model load to fail"),
        }
    }

    #[test]
    fn test_bert_rejects_invalid_tokenizer() {
        let dir = model_dir("{}", &[1, 2, 3]);
        assert!(load_error(&dir).starts_with("Failed to load tokenizer"));
    }

    #[test]
    fn test_bert_rejects_bad_weights() {
        let dir = model_dir(TINY_TOKENIZER, &[1, 2, 3]);
        assert!(load_error(&dir).starts_with("Failed to read weights"));
    }

    #[test]
    fn test_select_device_falls_back_to_cpu() {
        // Default build has neither CUDA nor Metal compiled in
        if cfg!(not(any(feature = "cuda", feature = "metal"))) {
            assert!(select_device().is_cpu());
        }
    }
}
