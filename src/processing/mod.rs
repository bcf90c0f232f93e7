//! Chunking, embedding, scoring and ranking

pub mod chunker;
pub mod document;
pub mod embedding_manager;
pub mod embeddings;
pub mod ranking;
pub mod scorer;
