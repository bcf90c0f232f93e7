//! Shared helpers for integration tests: deterministic embedders and in-memory fixtures

#![allow(dead_code)]

use docx_rs::{Docx, Paragraph, Run};
use resume_ranker::{Document, Embedder, Result};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Bag-of-words embedder: each lowercase word is hashed (FNV-1a) into one of `dimension` buckets.
///
/// Texts sharing vocabulary get a positive cosine, disjoint texts get ~0.
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimension];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = fnv1a(&word.to_lowercase()) as usize % self.dimension;
            vector[bucket] += 1.0;
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(512)
    }
}

impl Embedder for HashingEmbedder {
    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        "hashing-bow"
    }
}

fn fnv1a(word: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in word.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Wraps [`HashingEmbedder`] and counts model calls.
#[derive(Default)]
pub struct CountingEmbedder {
    inner: HashingEmbedder,
    batches: AtomicUsize,
    texts: AtomicUsize,
}

impl CountingEmbedder {
    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    pub fn texts(&self) -> usize {
        self.texts.load(Ordering::SeqCst)
    }
}

impl Embedder for CountingEmbedder {
    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.texts.fetch_add(texts.len(), Ordering::SeqCst);
        self.inner.encode_batch(texts)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_id(&self) -> &str {
        "counting"
    }
}

/// A .docx file with one paragraph per entry.
pub fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
    let mut docx = Docx::new();
    for text in paragraphs {
        docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*text)));
    }
    let mut cursor = Cursor::new(Vec::new());
    docx.build().pack(&mut cursor).unwrap();
    cursor.into_inner()
}

pub fn docx_document(filename: &str, paragraphs: &[&str]) -> Document {
    Document::new(filename, docx_bytes(paragraphs))
}

pub const PYTHON_JOB: &str = "Senior Python backend engineer with Django and PostgreSQL experience.";

pub const PYTHON_RESUME: &[&str] = &[
    "Jane Doe",
    "Backend engineer with eight years of Python experience.",
    "Built Django services on PostgreSQL for a payments platform.",
];

pub const PASTRY_RESUME: &[&str] = &[
    "John Roe",
    "Pastry chef with ten years of experience in laminated doughs and French desserts.",
];
