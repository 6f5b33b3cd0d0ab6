//! Error types for facestate

use std::path::PathBuf;

use thiserror::Error;

use crate::types::ExpressionTag;

/// Errors raised by configuration, ingestion and the file formats around them
#[derive(Error, Debug)]
pub enum StabilityError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid input: unknown expression tag '{tag}'")]
    InvalidInput { tag: ExpressionTag },

    #[error("Invalid trace at line {line}: {reason}")]
    InvalidTrace { line: usize, reason: String },

    #[error("Missing asset for '{tag}': {}", path.display())]
    MissingAsset { tag: ExpressionTag, path: PathBuf },

    #[error("Pipeline closed: {0}")]
    PipelineClosed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StabilityError {
    /// Shorthand for configuration failures
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// True for errors caused by the caller's data rather than the environment
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfiguration(_)
                | Self::InvalidInput { .. }
                | Self::InvalidTrace { .. }
                | Self::Json(_)
        )
    }
}

/// Result type for facestate operations
pub type Result<T> = std::result::Result<T, StabilityError>;
