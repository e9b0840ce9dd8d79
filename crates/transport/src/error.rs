//! Transport factory error types

use contracts::TransportBackend;
use thiserror::Error;

/// Backend construction errors
#[derive(Debug, Error)]
pub enum TransportSetupError {
    /// Backend needs a setting that is absent
    #[error("backend {backend:?} requires {setting}")]
    MissingSetting {
        backend: TransportBackend,
        setting: &'static str,
    },

    /// Backend is not available on this platform
    #[error("backend {0:?} is not supported on this platform")]
    Unsupported(TransportBackend),
}

/// Result alias
pub type Result<T> = std::result::Result<T, TransportSetupError>;
