//! Splitting extracted text into overlapping windows
//!
//! Windows are measured in characters (Unicode scalar values), not model
//! tokens. A window may cut a word in half.

use log::warn;
use std::iter;

/// Characters shared by consecutive windows unless configured otherwise.
pub const DEFAULT_OVERLAP: usize = 50;

/// How a document's text is cut into the units that get embedded.
pub trait ChunkingStrategy: Send + Sync {
    fn chunk(&self, text: &str) -> Vec<String>;
}

/// Fixed-width character windows sharing `overlap` characters with their predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharWindowChunker {
    chunk_size: usize,
    overlap: usize,
}

impl CharWindowChunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunker = Self { chunk_size, overlap };
        if overlap >= chunk_size {
            warn!(
                "Chunk overlap {} is not smaller than chunk size {}; stepping by {}",
                overlap,
                chunk_size,
                chunker.step()
            );
        }
        chunker
    }

    /// Distance between window starts, never less than one.
    pub fn step(&self) -> usize {
        self.chunk_size.saturating_sub(self.overlap).max(1)
    }
}

impl ChunkingStrategy for CharWindowChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every char boundary, including the end of the text
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(idx, _)| idx)
            .chain(iter::once(text.len()))
            .collect();
        let char_count = boundaries.len() - 1;

        let size = self.chunk_size.max(1);
        let step = self.step();
        let mut chunks = Vec::with_capacity(char_count.div_ceil(step));

        let mut start = 0;
        while start < char_count {
            let end = (start + size).min(char_count);
            chunks.push(text[boundaries[start]..boundaries[end]].to_string());
            start += step;
        }

        chunks
    }
}

/// Chunk `text` into `chunk_size`-character windows overlapping by `overlap`.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    CharWindowChunker::new(chunk_size, overlap).chunk(text)
}
