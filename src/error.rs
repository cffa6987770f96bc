// src/error.rs

use thiserror::Error;

/// Result type for fallible construction and ingestion.
pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// Errors raised while building a sample store or reading a log.
///
/// The analyzers never return these: a missing or degenerate signal is reported as
/// `None` for the affected metric.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// Malformed input (bad sample rate, mismatched channel lengths, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Signal present but too short or degenerate for the requested computation
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// CSV decoding error (wraps csv::Error)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
