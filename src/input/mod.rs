//! Input processing module
//! Handles format detection, text extraction, and loading uploaded files

pub mod file_detector;
pub mod text_extractor;
pub mod manager;
