//! Error types for CLI operations.

use std::path::Path;

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// No media configured or the file is missing
    #[error("Media not available: {message}")]
    MediaMissing { message: String },

    /// The session ended with a fatal error
    #[error("Session failed: {message}")]
    SessionFailed { message: String },
}

impl CliError {
    pub fn config_not_found(path: &Path) -> Self {
        Self::ConfigNotFound {
            path: path.display().to_string(),
        }
    }

    pub fn media_missing(message: impl Into<String>) -> Self {
        Self::MediaMissing {
            message: message.into(),
        }
    }

    pub fn session_failed(message: impl Into<String>) -> Self {
        Self::SessionFailed {
            message: message.into(),
        }
    }
}
