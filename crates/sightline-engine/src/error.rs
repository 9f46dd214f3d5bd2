//! Error types for engine operations.

use thiserror::Error;

use sightline_media::MediaError;
use sightline_models::TargetId;
use sightline_vision::VisionError;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur in the pipeline, registry, or search.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown target: {0}")]
    UnknownTarget(TargetId),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Vision error: {0}")]
    Vision(#[from] VisionError),
}

impl EngineError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}
