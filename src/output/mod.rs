//! Report building and formatting

pub mod formatter;
pub mod report;
