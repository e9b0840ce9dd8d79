//! Sync engine errors

use contracts::{PlaybackState, TransportError};
use thiserror::Error;

/// Errors returned by engine operations
///
/// Only the media/decoder variants end a session; transient transport
/// rejections never surface here.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Media cannot be opened or played; the engine is Stopped
    #[error("media unavailable: {0}")]
    MediaUnavailable(String),

    /// Backend died mid-session; the engine is Stopped
    #[error("decoder fault: {0}")]
    DecoderFault(String),

    /// Operation not allowed in the current state; nothing changed
    #[error("cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: PlaybackState,
    },

    /// The backend refused a user command; state is unchanged
    #[error("transport rejected {0}")]
    Rejected(String),

    /// The session actor is gone
    #[error("session closed")]
    SessionClosed,
}

impl SyncError {
    pub(crate) fn invalid(operation: &'static str, state: PlaybackState) -> Self {
        Self::InvalidTransition { operation, state }
    }

    /// Whether this error ended the session
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MediaUnavailable(_) | Self::DecoderFault(_))
    }
}

impl From<TransportError> for SyncError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::DecoderFault { message } => Self::DecoderFault(message),
            other => Self::MediaUnavailable(other.to_string()),
        }
    }
}
