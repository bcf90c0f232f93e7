//! Similarity scoring between a job description and a document's chunks

use crate::error::{Result, RankerError};
use crate::processing::embeddings::Embedder;
use log::debug;
use ndarray::{Array2, ArrayView1, Axis, Zip};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// How the 1xN row of chunk similarities collapses into one document score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Reduction {
    /// Best single chunk. A long resume with one strong section is not penalised.
    Max,
    Mean,
    /// Mean of the `k` best chunks
    TopKMean { k: usize },
}

impl Reduction {
    /// Reduce similarity scores; an empty slice reduces to 0.0.
    pub fn reduce(&self, scores: &[f32]) -> f32 {
        if scores.is_empty() {
            return 0.0;
        }

        match self {
            Reduction::Max => scores.iter().copied().fold(f32::NEG_INFINITY, f32::max),
            Reduction::Mean => scores.iter().sum::<f32>() / scores.len() as f32,
            Reduction::TopKMean { k } => {
                let mut sorted = scores.to_vec();
                sorted.sort_by(|a, b| b.total_cmp(a));
                let k = (*k).clamp(1, sorted.len());
                sorted[..k].iter().sum::<f32>() / k as f32
            }
        }
    }
}

impl Default for Reduction {
    fn default() -> Self {
        Reduction::Max
    }
}

impl fmt::Display for Reduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reduction::Max => write!(f, "max"),
            Reduction::Mean => write!(f, "mean"),
            Reduction::TopKMean { k } => write!(f, "top-k:{}", k),
        }
    }
}

impl FromStr for Reduction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "max" => Ok(Reduction::Max),
            "mean" => Ok(Reduction::Mean),
            other => {
                let k = other
                    .strip_prefix("top-k:")
                    .ok_or_else(|| format!("Invalid reduction: {}. Supported: max, mean, top-k:N", s))?;
                let k: usize = k
                    .parse()
                    .map_err(|_| format!("Invalid top-k count in reduction: {}", s))?;
                if k == 0 {
                    return Err("top-k reduction requires k > 0".to_string());
                }
                Ok(Reduction::TopKMean { k })
            }
        }
    }
}

impl TryFrom<String> for Reduction {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Reduction> for String {
    fn from(reduction: Reduction) -> Self {
        reduction.to_string()
    }
}

/// Cosine similarity of one query against N chunk embeddings, as a 1xN matrix.
/// A zero vector on either side gives 0.
pub fn similarity_matrix(query: &[f32], chunks: &[Vec<f32>]) -> Result<Array2<f32>> {
    let dim = query.len();
    if let Some(bad) = chunks.iter().find(|c| c.len() != dim) {
        return Err(RankerError::Embedding(format!(
            "Embedding dimensions don't match: {} vs {}",
            dim,
            bad.len()
        )));
    }

    let flat: Vec<f32> = chunks.iter().flatten().copied().collect();
    let chunk_matrix = Array2::from_shape_vec((chunks.len(), dim), flat)
        .map_err(|e| RankerError::Embedding(format!("Failed to build embedding matrix: {}", e)))?;

    let query = ArrayView1::from(query);
    let query_norm = query.dot(&query).sqrt();
    let dots = chunk_matrix.dot(&query);
    let chunk_norms = chunk_matrix.map_axis(Axis(1), |row| row.dot(&row).sqrt());

    let similarities = Zip::from(&dots).and(&chunk_norms).map_collect(|&dot, &norm| {
        if query_norm == 0.0 || norm == 0.0 {
            0.0
        } else {
            dot / (query_norm * norm)
        }
    });

    Ok(similarities.insert_axis(Axis(0)))
}

/// Scores documents against a query with a shared embedder.
pub struct SimilarityScorer {
    embedder: Arc<dyn Embedder>,
    reduction: Reduction,
}

impl SimilarityScorer {
    pub fn new(embedder: Arc<dyn Embedder>, reduction: Reduction) -> Self {
        Self { embedder, reduction }
    }

    pub fn reduction(&self) -> Reduction {
        self.reduction
    }

    pub fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        self.embedder.encode_one(query)
    }

    /// Score `chunks` against `query`. No chunks means 0.0 without touching the model.
    pub fn score(&self, query: &str, chunks: &[String]) -> Result<f32> {
        if chunks.is_empty() {
            return Ok(0.0);
        }
        let query_embedding = self.embed_query(query)?;
        self.score_with_query(&query_embedding, chunks)
    }

    /// Like [`score`](Self::score) with the query already embedded.
    pub fn score_with_query(&self, query_embedding: &[f32], chunks: &[String]) -> Result<f32> {
        if chunks.is_empty() {
            return Ok(0.0);
        }

        let chunk_embeddings = self.embedder.encode_batch(chunks)?;
        if chunk_embeddings.len() != chunks.len() {
            return Err(RankerError::Embedding(format!(
                "Expected {} embeddings, model returned {}",
                chunks.len(),
                chunk_embeddings.len()
            )));
        }

        let matrix = similarity_matrix(query_embedding, &chunk_embeddings)?;
        let similarities: Vec<f32> = matrix.iter().copied().collect();
        let score = self.reduction.reduce(&similarities);

        debug!(
            "Scored {} chunks with {} reduction: {:.4}",
            chunks.len(),
            self.reduction,
            score
        );
        Ok(score)
    }
}
