//! Error types for Stress Flux

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while extracting, merging or predicting
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("File or directory not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to parse export: {0}")]
    ParseError(String),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Duplicate date {date} in {table}")]
    DuplicateDate { table: String, date: String },

    #[error("No rows produced by {0}")]
    EmptyResult(String),

    #[error("Feature vector has {actual} values, expected {expected}")]
    ShapeError { expected: usize, actual: usize },

    #[error("Failed to load model: {0}")]
    LoadError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}
