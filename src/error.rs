//! Error types for peershuffle
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur while scheduling or publishing a shuffle
#[derive(Debug, Error)]
pub enum ShuffleError {
    /// Malformed or blank participant/question input, or a structurally invalid ring
    #[error("Validation error: {0}")]
    Validation(String),

    /// An identity does not correspond to a known participant
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// A single relation mutation or notification post failed
    #[error("Upload error: {0}")]
    Upload(String),

    /// Gradebook service returned an error or an unexpected response
    #[error("Gradebook error: {0}")]
    Gradebook(String),

    /// Configuration is missing or invalid
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ShuffleError {
    /// Errors from the pure computation layer abort a run; everything else is per participant.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ShuffleError::Validation(_) | ShuffleError::Config(_))
    }
}

/// Result type alias for peershuffle operations
pub type Result<T> = std::result::Result<T, ShuffleError>;
