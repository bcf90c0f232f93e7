//! Resume ranker library
//!
//! Ranks resumes (PDF, DOCX) against a job description: text is extracted,
//! cut into overlapping character windows, embedded with a sentence model,
//! and each document is scored by its best-matching window.

pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod output;
pub mod processing;

pub use config::Config;
pub use error::{RankerError, Result};
pub use processing::document::{Document, Extraction, MatchResult};
pub use processing::embeddings::Embedder;
pub use processing::ranking::{Progress, ProgressSink, RankingPipeline};
pub use processing::scorer::Reduction;
