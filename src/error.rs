//! Error types for breath-flux

use thiserror::Error;

/// Errors that can occur during decoding replay, validation or analysis
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid filter design: {0}")]
    InvalidFilter(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Time goes backwards in {stream} stream at sample {index}")]
    NonMonotonicTime { stream: String, index: usize },

    #[error("Non-finite value in {stream} stream at sample {index}")]
    NonFiniteValue { stream: String, index: usize },
}
