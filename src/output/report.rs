//! Report structures for a ranking run

use crate::processing::document::{format_percentage, MatchResult};
use crate::processing::scorer::Reduction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Characters of the job description echoed back in a report.
pub const JOB_PREVIEW_CHARS: usize = 120;

/// Everything a formatter needs to present one ranking run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingReport {
    pub job_description_preview: String,
    pub model: String,
    pub chunk_size: usize,
    pub reduction: Reduction,

    /// Best match first
    pub results: Vec<MatchResult>,

    pub summary: RankingSummary,
    pub metadata: ReportMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingSummary {
    pub total: usize,
    pub scored: usize,
    pub failed: usize,
    pub best_match: Option<String>,
    pub best_score: Option<f32>,

    /// Mean over documents that were actually scored
    pub mean_score: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub processing_time_ms: u64,
    pub tool_version: String,
}

/// Coarse label for a cosine score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    Strong,
    Good,
    Moderate,
    Weak,
}

impl ScoreBand {
    pub fn from_score(score: f32) -> Self {
        if score >= 0.7 {
            ScoreBand::Strong
        } else if score >= 0.5 {
            ScoreBand::Good
        } else if score >= 0.3 {
            ScoreBand::Moderate
        } else {
            ScoreBand::Weak
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoreBand::Strong => "STRONG",
            ScoreBand::Good => "GOOD",
            ScoreBand::Moderate => "MODERATE",
            ScoreBand::Weak => "WEAK",
        }
    }
}

impl RankingReport {
    /// Build a report from already ranked results.
    pub fn new(
        job_description: &str,
        model: &str,
        chunk_size: usize,
        reduction: Reduction,
        results: Vec<MatchResult>,
        processing_time: Duration,
    ) -> Self {
        let summary = RankingSummary::from_results(&results);

        Self {
            job_description_preview: job_preview(job_description),
            model: model.to_string(),
            chunk_size,
            reduction,
            results,
            summary,
            metadata: ReportMetadata {
                generated_at: Utc::now(),
                processing_time_ms: processing_time.as_millis() as u64,
                tool_version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }
}

impl RankingSummary {
    pub fn from_results(results: &[MatchResult]) -> Self {
        let scored: Vec<&MatchResult> = results.iter().filter(|r| !r.is_failure()).collect();

        let best = scored.iter().copied().fold(None, |best: Option<&MatchResult>, r| match best {
            Some(b) if b.score >= r.score => Some(b),
            _ => Some(r),
        });

        let mean_score = if scored.is_empty() {
            None
        } else {
            Some(scored.iter().map(|r| r.score).sum::<f32>() / scored.len() as f32)
        };

        Self {
            total: results.len(),
            scored: scored.len(),
            failed: results.len() - scored.len(),
            best_match: best.map(|r| r.filename.clone()),
            best_score: best.map(|r| r.score),
            mean_score,
        }
    }

    pub fn mean_percentage(&self) -> Option<String> {
        self.mean_score.map(format_percentage)
    }
}

/// Job description collapsed to one line and cut to [`JOB_PREVIEW_CHARS`].
fn job_preview(job_description: &str) -> String {
    let single_line = job_description.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() > JOB_PREVIEW_CHARS {
        let cut: String = single_line.chars().take(JOB_PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        single_line
    }
}
