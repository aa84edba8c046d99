//! Error types for talkforge-rs

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`ForgeError`]
pub type Result<T> = std::result::Result<T, ForgeError>;

/// Main error type for talkforge-rs
///
/// Only failures that end a stream show up here. Malformed protocol
/// records are dropped inside the ingestor and never become an error.
#[derive(Debug, Error)]
pub enum ForgeError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parse error
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// Configuration validation error
    #[error("Invalid configuration: {0}")]
    ConfigValidation(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server answered with a non-success status
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Reading the response body failed mid-stream
    #[error("Transport error: {0}")]
    Transport(String),

    /// Stream was cancelled by the caller
    #[error("Operation cancelled by user")]
    Cancelled,

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl ForgeError {
    /// Whether this error ended an in-flight stream at the transport level
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Api { .. } | Self::Transport(_))
    }
}

impl From<String> for ForgeError {
    fn from(s: String) -> Self {
        ForgeError::Other(s)
    }
}

impl From<&str> for ForgeError {
    fn from(s: &str) -> Self {
        ForgeError::Other(s.to_string())
    }
}
