//! Error types for Somnolog

use thiserror::Error;

/// Errors that abort a run before any stage executes.
///
/// Data-quality problems inside a run never surface here; they are reported as
/// [`Notice`](crate::types::Notice)s alongside the stage results.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse interval log: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
