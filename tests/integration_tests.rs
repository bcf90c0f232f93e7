//! Integration tests for the resume ranker

mod common;

use approx::assert_relative_eq;
use common::*;
use resume_ranker::input::manager::InputManager;
use resume_ranker::output::formatter::ReportGenerator;
use resume_ranker::output::report::RankingReport;
use resume_ranker::config::OutputFormat;
use resume_ranker::{Document, Progress, RankerError, RankingPipeline, Reduction};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn pipeline() -> RankingPipeline {
    RankingPipeline::new(Arc::new(HashingEmbedder::default()), 50, Reduction::Max)
}

fn quiet() -> impl FnMut(&Progress) {
    |_: &Progress| {}
}

#[test]
fn test_python_engineer_outranks_pastry_chef() {
    let documents = vec![
        docx_document("chef.docx", PASTRY_RESUME),
        docx_document("engineer.docx", PYTHON_RESUME),
    ];

    let results = pipeline().rank(PYTHON_JOB, &documents, 500, &mut quiet()).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].filename, "engineer.docx");
    assert_eq!(results[1].filename, "chef.docx");
    assert!(results[0].score > results[1].score);
    assert!(results[1].score != 0.0);
    assert!(results.iter().all(|r| r.error.is_none()));
    assert!(results[0].preview.starts_with("Jane Doe\nBackend engineer"));
}

#[test]
fn test_backend_phrase_outranks_unrelated_resume() {
    let job = "Senior Python backend engineer with distributed systems experience";
    let documents = vec![
        docx_document(
            "candidate_a.docx",
            &[
                "Alex Kim",
                "Senior Python backend engineer with distributed systems experience",
                "Built event pipelines at scale.",
            ],
        ),
        docx_document("candidate_b.docx", &["pastry chef with 10 years baking experience"]),
    ];

    let results = pipeline().rank(job, &documents, 500, &mut quiet()).unwrap();

    assert_eq!(results[0].filename, "candidate_a.docx");
    assert_eq!(results[1].filename, "candidate_b.docx");
    assert!(results[0].score > results[1].score);
    // shared words like "with" and "experience" keep B above zero
    assert!(results[1].score != 0.0);
}

#[test]
fn test_identical_text_scores_one() {
    let documents = vec![docx_document("same.docx", &[PYTHON_JOB])];
    let results = pipeline().rank(PYTHON_JOB, &documents, 500, &mut quiet()).unwrap();

    assert_relative_eq!(results[0].score, 1.0, epsilon = 1e-5);
    assert_eq!(results[0].match_percentage, "100.00%");
}

#[test]
fn test_unreadable_bytes_still_reported() {
    let documents = vec![
        Document::new("corrupt.pdf", vec![0x25, 0x50, 0x44, 0x46, 0xff, 0x00, 0x13]),
        Document::new("corrupt.docx", b"PK but not really".to_vec()),
        docx_document("engineer.docx", PYTHON_RESUME),
    ];

    let results = pipeline().rank(PYTHON_JOB, &documents, 500, &mut quiet()).unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].filename, "engineer.docx");

    let pdf = results.iter().find(|r| r.filename == "corrupt.pdf").unwrap();
    assert_eq!(pdf.score, 0.0);
    assert_eq!(pdf.chunk_count, 0);
    assert!(pdf.preview.starts_with("Error reading PDF: "));
    assert!(pdf.error.as_deref().unwrap().starts_with(&pdf.preview));

    let docx = results.iter().find(|r| r.filename == "corrupt.docx").unwrap();
    assert_eq!(docx.score, 0.0);
    assert!(docx.preview.starts_with("Error reading DOCX: "));
}

#[test]
fn test_failed_documents_never_reach_the_model() {
    let embedder = Arc::new(CountingEmbedder::default());
    let pipeline = RankingPipeline::new(embedder.clone(), 50, Reduction::Max);
    let documents = vec![
        Document::new("corrupt.pdf", b"garbage".to_vec()),
        Document::new("notes.txt", b"Python Django PostgreSQL".to_vec()),
        docx_document("empty.docx", &[]),
    ];

    let results = pipeline.rank(PYTHON_JOB, &documents, 500, &mut quiet()).unwrap();

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.score == 0.0));
    assert_eq!(embedder.batches(), 0);

    let empty = results.iter().find(|r| r.filename == "empty.docx").unwrap();
    assert_eq!(empty.preview, "No text found");
    assert_eq!(empty.chunk_count, 0);
    assert!(empty.error.is_none());

    let unsupported = results.iter().find(|r| r.filename == "notes.txt").unwrap();
    assert_eq!(unsupported.preview, "Unsupported file format.");
}

#[test]
fn test_model_calls_per_run() {
    let embedder = Arc::new(CountingEmbedder::default());
    let pipeline = RankingPipeline::new(embedder.clone(), 50, Reduction::Max);
    let long_paragraph = "python django ".repeat(90);
    let documents = vec![
        docx_document("a.docx", PYTHON_RESUME),
        docx_document("b.docx", &[long_paragraph.as_str()]),
    ];

    let results = pipeline.rank(PYTHON_JOB, &documents, 500, &mut quiet()).unwrap();

    // job description once, then one batch per document
    assert_eq!(embedder.batches(), 3);
    let chunk_total: usize = results.iter().map(|r| r.chunk_count).sum();
    assert_eq!(embedder.texts(), 1 + chunk_total);
}

#[test]
fn test_chunk_counts_follow_window_size() {
    let text: String = "abcdefghij".repeat(120);
    let documents = vec![docx_document("long.docx", &[text.as_str()])];

    // 1200 chars plus the paragraph newline
    let results = pipeline().rank("alphabet", &documents, 500, &mut quiet()).unwrap();
    assert_eq!(results[0].chunk_count, 3);

    let results = pipeline().rank("alphabet", &documents, 200, &mut quiet()).unwrap();
    assert_eq!(results[0].chunk_count, 1201usize.div_ceil(150));
}

#[test]
fn test_equal_scores_keep_upload_order() {
    let documents: Vec<Document> = ["first.docx", "second.docx", "third.docx"]
        .iter()
        .map(|name| docx_document(name, PYTHON_RESUME))
        .collect();

    let results = pipeline().rank(PYTHON_JOB, &documents, 500, &mut quiet()).unwrap();

    let names: Vec<&str> = results.iter().map(|r| r.filename.as_str()).collect();
    assert_eq!(names, vec!["first.docx", "second.docx", "third.docx"]);
}

#[test]
fn test_every_upload_appears_exactly_once() {
    let documents = vec![
        docx_document("a.docx", PASTRY_RESUME),
        Document::new("b.pdf", b"not a pdf".to_vec()),
        docx_document("c.docx", PYTHON_RESUME),
        Document::new("d.odt", b"odt".to_vec()),
        docx_document("e.docx", &[]),
    ];

    let results = pipeline().rank(PYTHON_JOB, &documents, 300, &mut quiet()).unwrap();

    assert_eq!(results.len(), documents.len());
    for document in &documents {
        let count = results.iter().filter(|r| r.filename == document.filename()).count();
        assert_eq!(count, 1, "{}", document.filename());
    }
    assert!(results.windows(2).all(|pair| pair[0].score >= pair[1].score));
}

#[test]
fn test_validation_errors() {
    let documents = vec![docx_document("a.docx", PYTHON_RESUME)];

    match pipeline().rank("", &documents, 500, &mut quiet()) {
        Err(RankerError::Validation(msg)) => assert_eq!(msg, "Job Description is required."),
        other => panic!("expected validation error, got {:?}", other),
    }

    match pipeline().rank(PYTHON_JOB, &[], 500, &mut quiet()) {
        Err(RankerError::Validation(msg)) => assert_eq!(msg, "No resume files uploaded."),
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn test_progress_reports_each_document_in_order() {
    let documents = vec![
        docx_document("one.docx", PASTRY_RESUME),
        Document::new("two.pdf", b"junk".to_vec()),
        docx_document("three.docx", PYTHON_RESUME),
    ];
    let mut seen = Vec::new();

    pipeline()
        .rank(PYTHON_JOB, &documents, 500, &mut |p: &Progress| {
            seen.push((p.completed, p.total, p.filename.clone()))
        })
        .unwrap();

    assert_eq!(
        seen,
        vec![
            (1, 3, "one.docx".to_string()),
            (2, 3, "two.pdf".to_string()),
            (3, 3, "three.docx".to_string()),
        ]
    );
}

#[test]
fn test_mean_reduction_penalises_diluted_resumes() {
    let filler = "Gardening, woodworking, sailing and amateur astronomy. ".repeat(20);
    let documents = vec![docx_document(
        "diluted.docx",
        &[PYTHON_RESUME[1], PYTHON_RESUME[2], filler.as_str()],
    )];

    let max = RankingPipeline::new(Arc::new(HashingEmbedder::default()), 50, Reduction::Max)
        .rank(PYTHON_JOB, &documents, 300, &mut quiet())
        .unwrap();
    let mean = RankingPipeline::new(Arc::new(HashingEmbedder::default()), 50, Reduction::Mean)
        .rank(PYTHON_JOB, &documents, 300, &mut quiet())
        .unwrap();

    assert!(max[0].chunk_count > 1);
    assert!(max[0].score > mean[0].score);
}

#[tokio::test]
async fn test_rank_files_loaded_from_disk() {
    let temp_dir = TempDir::new().unwrap();
    let engineer = temp_dir.path().join("Engineer.DOCX");
    let chef = temp_dir.path().join("chef.docx");
    let job = temp_dir.path().join("job.txt");
    tokio::fs::write(&engineer, docx_bytes(PYTHON_RESUME)).await.unwrap();
    tokio::fs::write(&chef, docx_bytes(PASTRY_RESUME)).await.unwrap();
    tokio::fs::write(&job, PYTHON_JOB).await.unwrap();

    let manager = InputManager::new();
    let job_description = manager.read_job_description(&job).await.unwrap();
    let documents = manager.load_documents(&[chef, engineer]).await.unwrap();

    let results = tokio::task::spawn_blocking(move || {
        pipeline().rank(&job_description, &documents, 500, &mut quiet())
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(results[0].filename, "Engineer.DOCX");
    assert!(results[0].error.is_none());
}

#[test]
fn test_report_from_pipeline_results() {
    let documents = vec![
        docx_document("engineer.docx", PYTHON_RESUME),
        Document::new("broken.pdf", b"junk".to_vec()),
    ];
    let results = pipeline().rank(PYTHON_JOB, &documents, 500, &mut quiet()).unwrap();
    let report = RankingReport::new(
        PYTHON_JOB,
        "hashing-bow",
        500,
        Reduction::Max,
        results,
        Duration::from_millis(5),
    );

    assert_eq!(report.summary.total, 2);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.best_match.as_deref(), Some("engineer.docx"));

    let json = ReportGenerator::with_options(false, false, false, 80)
        .generate_report(&report, &OutputFormat::Json)
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["results"][0]["filename"], "engineer.docx");
    assert_eq!(value["results"][1]["matchPercentage"], "0.00%");
}
