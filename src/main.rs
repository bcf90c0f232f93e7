//! resume-ranker: rank resumes against a job description by semantic similarity

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use resume_ranker::cli::{self, Cli, Commands, ConfigAction, ModelAction};
use resume_ranker::config::{Config, OutputFormat};
use resume_ranker::input::manager::InputManager;
use resume_ranker::output::formatter::ReportGenerator;
use resume_ranker::output::report::RankingReport;
use resume_ranker::processing::document::Document;
use resume_ranker::processing::embedding_manager::EmbeddingModelManager;
use resume_ranker::processing::embeddings::EmbeddingEngine;
use resume_ranker::processing::ranking::{self, Progress, RankingPipeline};
use resume_ranker::{RankerError, Result};
use std::path::PathBuf;
use std::process;
use std::time::Instant;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);
    let config = match Config::load(Some(config_path.as_path())) {
        Ok(config) => config,
        Err(e) if matches!(cli.command, Commands::Config { action: Some(ConfigAction::Reset) }) => {
            warn!("Ignoring unreadable configuration: {}", e);
            Config::default()
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command, config, config_path).await {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

async fn run_command(command: Commands, mut config: Config, config_path: PathBuf) -> Result<()> {
    match command {
        Commands::Rank {
            job,
            job_text,
            files,
            chunk_size,
            model,
            reduction,
            output,
            detailed,
        } => {
            if let Some(model) = model {
                config.models.embedding_model = model;
            }
            if let Some(reduction) = reduction {
                config.scoring.reduction = cli::parse_reduction(&reduction).map_err(RankerError::Validation)?;
            }
            if let Some(chunk_size) = chunk_size {
                config.processing.chunk_size = chunk_size;
            }
            let output_format = match output {
                Some(format) => cli::parse_output_format(&format).map_err(RankerError::Validation)?,
                None => config.output.format,
            };
            config.validate()?;

            let input_manager = InputManager::new();
            let job_description = match (job, job_text) {
                (Some(path), _) => input_manager.read_job_description(&path).await?,
                (None, Some(text)) => text,
                (None, None) => String::new(),
            };
            let documents = input_manager.load_documents(&files).await?;

            // Fail on a bad request before paying for the model load
            ranking::validate_inputs(&job_description, &documents)?;

            run_ranking(&config, job_description, documents, output_format, detailed).await?;
        }

        Commands::Models { action } => {
            let mut manager = EmbeddingModelManager::new(config.models_dir().clone()).await?;

            match action {
                ModelAction::List => {
                    println!("🧠 Embedding Models\n");
                    for (id, info) in manager.list_available_models() {
                        let status = if manager.is_model_downloaded(id) {
                            "✅ Downloaded"
                        } else {
                            "⬇️  Available"
                        };
                        let default_marker = if *id == config.models.embedding_model {
                            " (default)"
                        } else {
                            ""
                        };

                        println!(
                            "  • {}{} ({}) - {} MB, {} dims [{}]",
                            id, default_marker, info.repo_id, info.size_mb, info.dimensions, status
                        );
                        println!("    {}", info.description);
                        if !manager.is_model_downloaded(id) {
                            println!("    💡 Download: resume-ranker models download {}", id);
                        }
                        println!();
                    }
                }

                ModelAction::Download { model, force } => {
                    let model_id = manager
                        .resolve_model_id(&model)
                        .ok_or_else(|| RankerError::ModelLoading(format!("Unknown embedding model: {}", model)))?;

                    if !force && manager.is_model_downloaded(&model_id) {
                        println!("✅ Model '{}' is already downloaded!", model_id);
                        println!("💡 Use --force to re-download");
                        return Ok(());
                    }

                    println!("⬇️  Downloading model: {}", model_id);
                    let model_path = manager.download_model(&model_id, force).await?;
                    println!("✅ Model '{}' downloaded successfully!", model_id);
                    println!("📁 Location: {}", model_path.display());
                }

                ModelAction::Info { model } => {
                    let model_id = manager
                        .resolve_model_id(&model)
                        .ok_or_else(|| RankerError::ModelLoading(format!("Unknown embedding model: {}", model)))?;
                    let info = manager
                        .get_model_info(&model_id)
                        .ok_or_else(|| RankerError::ModelLoading(format!("Unknown embedding model: {}", model)))?;

                    println!("📋 Model Information for '{}'\n", model_id);
                    println!("Name: {}", info.name);
                    println!("Repository: {}", info.repo_id);
                    println!("Backend: {:?}", info.backend);
                    println!("Dimensions: {}", info.dimensions);
                    println!("Size: {} MB", info.size_mb);
                    println!("Description: {}", info.description);

                    match manager.get_model_path(&model_id) {
                        Some(path) => {
                            println!("Status: ✅ Downloaded");
                            println!("Location: {}", path.display());
                        }
                        None => {
                            println!("Status: ⬇️  Available for download");
                            println!("\n💡 To download this model, run:");
                            println!("   resume-ranker models download {}", model_id);
                        }
                    }
                }
            }
        }

        Commands::Config { action } => match action {
            Some(ConfigAction::Show) | None => {
                println!("⚙️  Current Configuration ({})\n", config_path.display());
                let content = toml::to_string_pretty(&config)
                    .map_err(|e| RankerError::Configuration(format!("Failed to serialize config: {}", e)))?;
                println!("{}", content);
            }

            Some(ConfigAction::Reset) => {
                println!("🔄 Resetting configuration to defaults...");
                Config::default().save_to(&config_path)?;
                println!("✅ Configuration reset successfully!");
            }

            Some(ConfigAction::Path) => {
                println!("{}", config_path.display());
            }
        },
    }

    Ok(())
}

/// Load the model once, rank on a blocking thread, print the report.
async fn run_ranking(
    config: &Config,
    job_description: String,
    documents: Vec<Document>,
    output_format: OutputFormat,
    detailed: bool,
) -> Result<()> {
    let embedder = EmbeddingEngine::load(config).await?;
    let model_id = embedder.model_id().to_string();
    let pipeline = RankingPipeline::from_config(embedder, config);
    let chunk_size = config.processing.chunk_size;

    info!(
        "Ranking {} files with {} (chunk size {}, overlap {})",
        documents.len(),
        model_id,
        chunk_size,
        pipeline.overlap()
    );

    let progress_bar = ProgressBar::new(documents.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40}] {pos}/{len}")
            .map_err(|e| RankerError::OutputFormatting(e.to_string()))?,
    );
    progress_bar.set_message("Ranking");

    let start_time = Instant::now();
    let bar = progress_bar.clone();
    let job = job_description.clone();
    let results = tokio::task::spawn_blocking(move || {
        pipeline.rank(&job, &documents, chunk_size, &mut |progress: &Progress| {
            bar.set_position(progress.completed as u64);
            bar.set_message(progress.filename.clone());
        })
    })
    .await
    .map_err(|e| RankerError::Io(e.into()))??;
    progress_bar.finish_and_clear();

    let report = RankingReport::new(
        &job_description,
        &model_id,
        chunk_size,
        config.scoring.reduction,
        results,
        start_time.elapsed(),
    );

    let generator = ReportGenerator::from_config(&config.output, detailed);
    println!("{}", generator.generate_report(&report, &output_format)?);

    Ok(())
}
