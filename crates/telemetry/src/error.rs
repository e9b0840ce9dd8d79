//! Telemetry error types

use thiserror::Error;

/// Telemetry errors
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Replay file could not be read
    #[error("failed to read replay file {path}: {source}")]
    ReplayIo {
        /// File path
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A replay line is not a valid sample
    #[error("invalid sample at {path}:{line}: {message}")]
    ReplayParse {
        /// File path
        path: String,
        /// 1-based line number
        line: usize,
        /// Parser message
        message: String,
    },

    /// Source configuration is unusable
    #[error("invalid telemetry source: {message}")]
    InvalidSource {
        /// Error message
        message: String,
    },
}

/// Telemetry Result alias
pub type Result<T> = std::result::Result<T, TelemetryError>;
