//! Text extraction from PDF and DOCX documents

use crate::error::{Result, RankerError};
use crate::input::file_detector::DocumentFormat;
use crate::processing::document::{Document, Extraction};
use docx_rs::{DocumentChild, Paragraph, ParagraphChild, RunChild};
use log::{debug, info, warn};
use std::any::Any;
use std::panic;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Once;
use std::thread;
use std::time::Duration;

/// Upper bound on a single PDF parse.
const PDF_TIMEOUT: Duration = Duration::from_secs(60);

const PDF_THREAD_NAME: &str = "pdf-extract";

static QUIET_PDF_PANICS: Once = Once::new();

pub trait TextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String>;
}

pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    /// Text layer of every page, in order, each followed by a newline.
    fn extract(&self, bytes: &[u8]) -> Result<String> {
        let data = bytes.to_vec();
        let pages = run_isolated(move || {
            pdf_extract::extract_text_from_mem_by_pages(&data).map_err(|e| e.to_string())
        })?;

        let mut text = String::new();
        for page in &pages {
            text.push_str(page);
            text.push('\n');
        }

        debug!("Extracted {} pages ({} chars) from PDF", pages.len(), text.len());
        Ok(text)
    }
}

pub struct DocxExtractor;

impl TextExtractor for DocxExtractor {
    /// Text of every body paragraph, each followed by a newline.
    fn extract(&self, bytes: &[u8]) -> Result<String> {
        let docx = docx_rs::read_docx(bytes).map_err(|e| RankerError::DocxExtraction(e.to_string()))?;

        let mut text = String::new();
        let mut paragraphs = 0;
        for child in &docx.document.children {
            if let DocumentChild::Paragraph(paragraph) = child {
                text.push_str(&paragraph_text(paragraph));
                text.push('\n');
                paragraphs += 1;
            }
        }

        debug!("Extracted {} paragraphs ({} chars) from DOCX", paragraphs, text.len());
        Ok(text)
    }
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                match run_child {
                    RunChild::Text(t) => text.push_str(&t.text),
                    RunChild::Tab(_) => text.push('\t'),
                    RunChild::Break(_) => text.push('\n'),
                    _ => {}
                }
            }
        }
    }
    text
}

/// Run a parser job on its own named thread.
///
/// pdf-extract panics on some malformed streams and can spin on others, so the
/// job is bounded by [`PDF_TIMEOUT`] and a panic surfaces as `PdfExtraction`.
fn run_isolated<T, F>(job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> std::result::Result<T, String> + Send + 'static,
{
    install_quiet_panic_hook();

    let (tx, rx) = mpsc::channel();
    let handle = thread::Builder::new()
        .name(PDF_THREAD_NAME.to_string())
        .spawn(move || {
            let _ = tx.send(job());
        })
        .map_err(|e| RankerError::PdfExtraction(format!("failed to start parser thread: {}", e)))?;

    match rx.recv_timeout(PDF_TIMEOUT) {
        Ok(result) => {
            let _ = handle.join();
            result.map_err(RankerError::PdfExtraction)
        }
        // The thread is left to finish on its own
        Err(RecvTimeoutError::Timeout) => Err(RankerError::PdfExtraction(format!(
            "extraction timed out after {}s",
            PDF_TIMEOUT.as_secs()
        ))),
        // Sender dropped without a result: the parser panicked
        Err(RecvTimeoutError::Disconnected) => {
            let reason = match handle.join() {
                Err(payload) => panic_message(payload.as_ref()),
                Ok(()) => "parser thread exited without a result".to_string(),
            };
            Err(RankerError::PdfExtraction(reason))
        }
    }
}

/// Keep parser-thread panics off stderr, where they would tear through the
/// progress bar. Every other thread still reaches the previous hook.
fn install_quiet_panic_hook() {
    QUIET_PDF_PANICS.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if thread::current().name() == Some(PDF_THREAD_NAME) {
                debug!("PDF parser panicked: {}", info);
            } else {
                previous(info);
            }
        }));
    });
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "parser panicked".to_string()
    }
}

/// Extractor for `format`; anything but PDF and DOCX is `UnsupportedFormat`.
pub fn extractor_for(format: DocumentFormat, filename: &str) -> Result<&'static dyn TextExtractor> {
    match format {
        DocumentFormat::Pdf => Ok(&PdfExtractor),
        DocumentFormat::Docx => Ok(&DocxExtractor),
        DocumentFormat::Unsupported => Err(RankerError::UnsupportedFormat(filename.to_string())),
    }
}

/// Route a document to its extractor. Never fails: errors become [`Extraction::Failed`].
pub fn extract(document: &Document) -> Extraction {
    let extractor = match extractor_for(document.format(), document.filename()) {
        Ok(extractor) => extractor,
        Err(e) => {
            warn!("{}", e);
            return Extraction::Unsupported;
        }
    };

    info!("Extracting text from {} file: {}", document.format(), document.filename());
    match extractor.extract(document.bytes()) {
        Ok(text) => Extraction::Text(text),
        Err(e) => {
            warn!("Extraction failed for {}: {}", document.filename(), e);
            Extraction::Failed { reason: e.to_string() }
        }
    }
}
