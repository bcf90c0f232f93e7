//! Output formatters for ranking reports

use crate::config::{OutputConfig, OutputFormat};
use crate::error::Result;
use crate::output::report::{RankingReport, ScoreBand};
use crate::processing::document::MatchResult;
use colored::{Color, Colorize};

/// Trait for formatting ranking reports
pub trait OutputFormatter {
    fn format_report(&self, report: &RankingReport) -> Result<String>;
    fn supports_format(&self) -> OutputFormat;
}

/// Ranked table for the terminal
pub struct ConsoleFormatter {
    use_colors: bool,
    detailed: bool,
    preview_chars: usize,
}

/// JSON formatter for scripting and API integration
pub struct JsonFormatter {
    pretty: bool,
}

/// Report generator that coordinates the formatters
pub struct ReportGenerator {
    console_formatter: ConsoleFormatter,
    json_formatter: JsonFormatter,
}

impl ConsoleFormatter {
    pub fn new(use_colors: bool, detailed: bool, preview_chars: usize) -> Self {
        Self {
            use_colors,
            detailed,
            preview_chars,
        }
    }

    fn colorize(&self, text: &str, color: Color) -> String {
        if self.use_colors {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn format_header(&self, title: &str, level: u8) -> String {
        let prefix = match level {
            1 => "█",
            2 => "▓",
            _ => "▒",
        };

        let color = match level {
            1 => Color::Blue,
            2 => Color::Green,
            _ => Color::Yellow,
        };

        if self.use_colors {
            format!("\n{} {}\n", prefix.color(color).bold(), title.color(color).bold())
        } else {
            format!("\n{} {}\n", prefix, title)
        }
    }

    fn format_score_badge(&self, score: f32) -> String {
        let band = ScoreBand::from_score(score);
        let color = match band {
            ScoreBand::Strong => Color::Green,
            ScoreBand::Good => Color::BrightGreen,
            ScoreBand::Moderate => Color::Yellow,
            ScoreBand::Weak => Color::BrightRed,
        };

        if self.use_colors {
            format!("[{}]", band.label().color(color).bold())
        } else {
            format!("[{}]", band.label())
        }
    }

    fn format_result(&self, rank: usize, result: &MatchResult) -> String {
        let mut output = String::new();

        if let Some(error) = &result.error {
            output.push_str(&format!(
                "{:>3}. {}  {}\n",
                rank,
                result.filename,
                self.colorize(&result.match_percentage, Color::BrightBlack)
            ));
            output.push_str(&format!("     {}\n", self.colorize(&format!("⚠ {}", error), Color::Red)));
            return output;
        }

        output.push_str(&format!(
            "{:>3}. {}  {} {}\n",
            rank,
            self.colorize(&result.filename, Color::White),
            self.colorize(&result.match_percentage, Color::Cyan),
            self.format_score_badge(result.score)
        ));

        if self.detailed {
            output.push_str(&format!(
                "     Score: {:.4} | Chunks: {}\n",
                result.score, result.chunk_count
            ));
        }

        let preview = truncate_preview(&result.preview, self.preview_chars);
        if !preview.is_empty() {
            output.push_str(&format!("     {}\n", self.colorize(&preview, Color::BrightBlack)));
        }

        output
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_report(&self, report: &RankingReport) -> Result<String> {
        let mut output = String::new();

        output.push_str(&self.format_header("📊 RESUME RANKING", 1));
        output.push_str(&format!(
            "Generated: {} | Processing time: {}ms\n",
            report.metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            report.metadata.processing_time_ms
        ));
        output.push_str(&format!(
            "Model: {} | Chunk size: {} | Reduction: {}\n",
            report.model, report.chunk_size, report.reduction
        ));
        output.push_str(&format!(
            "Job: {}\n",
            self.colorize(&report.job_description_preview, Color::Cyan)
        ));

        output.push_str(&self.format_header("Ranking", 2));
        for (i, result) in report.results.iter().enumerate() {
            output.push_str(&self.format_result(i + 1, result));
        }

        output.push_str(&self.format_header("Summary", 3));
        let summary = &report.summary;
        output.push_str(&format!(
            "Documents: {} | Scored: {} | Failed: {}\n",
            summary.total,
            summary.scored,
            self.colorize(
                &summary.failed.to_string(),
                if summary.failed > 0 { Color::Red } else { Color::Green }
            )
        ));
        if let (Some(best), Some(score)) = (&summary.best_match, summary.best_score) {
            output.push_str(&format!(
                "Best match: {} ({:.2}%)\n",
                self.colorize(best, Color::Green),
                score * 100.0
            ));
        }
        if let Some(mean) = summary.mean_percentage() {
            output.push_str(&format!("Mean score: {}\n", mean));
        }

        Ok(output)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Console
    }
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &RankingReport) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(report)?)
        } else {
            Ok(serde_json::to_string(report)?)
        }
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Json
    }
}

impl ReportGenerator {
    pub fn with_options(use_colors: bool, detailed: bool, pretty_json: bool, preview_chars: usize) -> Self {
        Self {
            console_formatter: ConsoleFormatter::new(use_colors, detailed, preview_chars),
            json_formatter: JsonFormatter::new(pretty_json),
        }
    }

    pub fn from_config(config: &OutputConfig, detailed: bool) -> Self {
        Self::with_options(config.color_output, detailed, true, config.preview_chars)
    }

    pub fn generate_report(&self, report: &RankingReport, format: &OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Console => self.console_formatter.format_report(report),
            OutputFormat::Json => self.json_formatter.format_report(report),
        }
    }
}

/// Collapse whitespace and cut to `max_chars`, marking the cut with an ellipsis.
pub fn truncate_preview(text: &str, max_chars: usize) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= max_chars {
        return single_line;
    }
    let cut: String = single_line.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}
