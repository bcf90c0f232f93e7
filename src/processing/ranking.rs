//! Ranking pipeline: extract, chunk, score and sort every uploaded document

use crate::config::{Config, RECOMMENDED_CHUNK_SIZE};
use crate::error::{Result, RankerError};
use crate::input::text_extractor;
use crate::processing::chunker::{CharWindowChunker, ChunkingStrategy};
use crate::processing::document::{Document, Extraction, MatchResult};
use crate::processing::embeddings::Embedder;
use crate::processing::scorer::{Reduction, SimilarityScorer};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Instant;

/// Emitted once per document, in input order, after it has been scored.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub filename: String,
}

pub trait ProgressSink {
    fn report(&mut self, progress: &Progress);
}

impl<F: FnMut(&Progress)> ProgressSink for F {
    fn report(&mut self, progress: &Progress) {
        self(progress)
    }
}

pub struct RankingPipeline {
    scorer: SimilarityScorer,
    overlap: usize,
}

impl RankingPipeline {
    pub fn new(embedder: Arc<dyn Embedder>, overlap: usize, reduction: Reduction) -> Self {
        Self {
            scorer: SimilarityScorer::new(embedder, reduction),
            overlap,
        }
    }

    pub fn from_config(embedder: Arc<dyn Embedder>, config: &Config) -> Self {
        Self::new(
            embedder,
            config.processing.chunk_overlap,
            config.scoring.reduction,
        )
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn reduction(&self) -> Reduction {
        self.scorer.reduction()
    }

    /// Rank `documents` against `job_description` using character windows of `chunk_size`.
    ///
    /// Returns exactly one result per document, best score first. Documents
    /// that cannot be read or embedded score 0.0 and carry an `error`.
    pub fn rank(
        &self,
        job_description: &str,
        documents: &[Document],
        chunk_size: usize,
        progress: &mut dyn ProgressSink,
    ) -> Result<Vec<MatchResult>> {
        validate_inputs(job_description, documents)?;
        if chunk_size == 0 {
            return Err(RankerError::Validation(
                "Chunk size must be greater than zero.".to_string(),
            ));
        }
        if !RECOMMENDED_CHUNK_SIZE.contains(&chunk_size) {
            warn!(
                "Chunk size {} is outside the recommended range {}-{}",
                chunk_size,
                RECOMMENDED_CHUNK_SIZE.start(),
                RECOMMENDED_CHUNK_SIZE.end()
            );
        }

        let chunker = CharWindowChunker::new(chunk_size, self.overlap);
        self.rank_with(job_description, documents, &chunker, progress)
    }

    /// Same as [`rank`](Self::rank) with a caller-supplied chunking strategy.
    pub fn rank_with(
        &self,
        job_description: &str,
        documents: &[Document],
        chunker: &dyn ChunkingStrategy,
        progress: &mut dyn ProgressSink,
    ) -> Result<Vec<MatchResult>> {
        validate_inputs(job_description, documents)?;

        let start_time = Instant::now();
        let total = documents.len();
        info!("Ranking {} documents with {} reduction", total, self.reduction());

        // Embedded lazily so a batch of unreadable files never touches the model
        let mut query = QueryEmbedding::Pending;
        let mut results = Vec::with_capacity(total);

        for (index, document) in documents.iter().enumerate() {
            let result = self.score_document(job_description, &mut query, document, chunker);
            debug!(
                "{}: {} ({} chunks)",
                result.filename, result.match_percentage, result.chunk_count
            );
            results.push(result);

            progress.report(&Progress {
                completed: index + 1,
                total,
                filename: document.filename().to_string(),
            });
        }

        sort_by_score(&mut results);

        info!("Ranked {} documents in {:.2?}", total, start_time.elapsed());
        Ok(results)
    }

    /// Never fails: every problem becomes a zero-score result with an `error`.
    fn score_document(
        &self,
        job_description: &str,
        query: &mut QueryEmbedding,
        document: &Document,
        chunker: &dyn ChunkingStrategy,
    ) -> MatchResult {
        let filename = document.filename();

        let text = match text_extractor::extract(document) {
            Extraction::Text(text) => text,
            failed => {
                let reason = failed.failure_reason().unwrap_or_default();
                debug!("Skipping {}: {}", filename, reason);
                return MatchResult::unextracted(filename, reason);
            }
        };

        let chunks = chunker.chunk(&text);
        if chunks.is_empty() {
            debug!("No text found in {}", filename);
            return MatchResult::scored(filename, &text, 0.0, 0);
        }

        let outcome = query
            .get_or_embed(&self.scorer, job_description)
            .and_then(|query| {
                self.scorer.score_with_query(query, &chunks).map_err(|e| {
                    warn!("Embedding failed for {}: {}", filename, e);
                    embedding_cause(e)
                })
            });

        match outcome {
            Ok(score) => MatchResult::scored(filename, &text, score, chunks.len()),
            Err(cause) => MatchResult::unscored(
                filename,
                &text,
                chunks.len(),
                format!("Embedding failed: {}", cause),
            ),
        }
    }
}

/// The job description vector, computed at most once per run.
enum QueryEmbedding {
    Pending,
    Ready(Vec<f32>),
    Failed(String),
}

impl QueryEmbedding {
    /// A failure is remembered, so every later document gets the same cause
    /// without another model call.
    fn get_or_embed(
        &mut self,
        scorer: &SimilarityScorer,
        job_description: &str,
    ) -> std::result::Result<&[f32], String> {
        if let QueryEmbedding::Pending = self {
            *self = match scorer.embed_query(job_description) {
                Ok(vector) => QueryEmbedding::Ready(vector),
                Err(e) => {
                    warn!("Failed to embed job description: {}", e);
                    QueryEmbedding::Failed(embedding_cause(e))
                }
            };
        }

        match self {
            QueryEmbedding::Ready(vector) => Ok(vector.as_slice()),
            QueryEmbedding::Failed(cause) => Err(cause.clone()),
            QueryEmbedding::Pending => Err("job description was not embedded".to_string()),
        }
    }
}

fn embedding_cause(error: RankerError) -> String {
    match error {
        RankerError::Embedding(msg) => msg,
        other => other.to_string(),
    }
}

/// The checks [`RankingPipeline::rank`] runs before touching any document.
pub fn validate_inputs(job_description: &str, documents: &[Document]) -> Result<()> {
    if job_description.trim().is_empty() {
        return Err(RankerError::Validation("Job Description is required.".to_string()));
    }
    if documents.is_empty() {
        return Err(RankerError::Validation("No resume files uploaded.".to_string()));
    }
    Ok(())
}

/// Best first. Stable, so equal scores keep their input order.
pub fn sort_by_score(results: &mut [MatchResult]) {
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
}
