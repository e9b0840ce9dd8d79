//! Layered error definitions
//!
//! Categorized by source: config / sync file / transport / sample

use thiserror::Error;

/// Unified error type for configuration and data contracts
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Sync File Errors =====
    /// Sync file content is unusable (unordered, negative, non-finite)
    #[error("invalid sync file '{path}': {message}")]
    InvalidSyncFile { path: String, message: String },

    // ===== Sample Errors =====
    /// Sample name exceeds bounds or contains control characters
    #[error("invalid sample name: {message}")]
    InvalidSampleName { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create sync file error
    pub fn invalid_sync_file(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSyncFile {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by a transport backend
///
/// Fatal variants end the session; `Rejected` is transient and the
/// command is re-derived on the next telemetry tick.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The backend cannot open or play the media
    #[error("media unavailable '{path}': {message}")]
    MediaUnavailable { path: String, message: String },

    /// The decoder died or the backend connection was lost
    #[error("decoder fault: {message}")]
    DecoderFault { message: String },

    /// A single command was refused; state is unchanged
    #[error("transport rejected '{command}': {message}")]
    Rejected {
        command: &'static str,
        message: String,
    },

    /// No media is open
    #[error("no media loaded")]
    NotLoaded,
}

impl TransportError {
    pub fn media_unavailable(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MediaUnavailable {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn decoder_fault(message: impl Into<String>) -> Self {
        Self::DecoderFault {
            message: message.into(),
        }
    }

    pub fn rejected(command: &'static str, message: impl Into<String>) -> Self {
        Self::Rejected {
            command,
            message: message.into(),
        }
    }

    /// Whether this error must stop the session
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MediaUnavailable { .. } | Self::DecoderFault { .. }
        )
    }
}
