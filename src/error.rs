//! Error types for the assessment metrics engine
//!
//! Sparse or degenerate data is not an error here. It shows up as a
//! not-calculated [`MetricResult`](crate::types::MetricResult). These errors
//! only cover malformed input payloads, bad configuration, and encoding.

use thiserror::Error;

/// Errors that can occur while parsing input or encoding a report
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
