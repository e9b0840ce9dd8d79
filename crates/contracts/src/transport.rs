//! TransportAdapter trait - video backend capability set
//!
//! The sync engine only talks to this trait; the concrete backend is
//! chosen at runtime from configuration.

use std::path::Path;

use crate::TransportError;

/// Video playback backend
///
/// Commands may complete asynchronously inside the backend (the decoder
/// runs on its own worker). Callers must not assume a seek is visible in
/// `position()` immediately; they re-derive on the next tick.
pub trait TransportAdapter: Send {
    /// Backend name (used for logging/metrics)
    fn backend_name(&self) -> &str;

    /// Open media. Fails with `TransportError::MediaUnavailable`.
    fn open(&mut self, path: &Path) -> Result<(), TransportError>;

    /// Start or resume playback
    fn play(&mut self) -> Result<(), TransportError>;

    /// Pause playback
    fn pause(&mut self) -> Result<(), TransportError>;

    /// Seek to an absolute video position (ms)
    fn seek(&mut self, position_ms: f64) -> Result<(), TransportError>;

    /// Set playback rate multiplier (1.0 = native)
    fn set_rate(&mut self, rate: f64) -> Result<(), TransportError>;

    /// Current video position (ms)
    fn position(&mut self) -> Result<f64, TransportError>;

    /// Media duration (ms), `None` if unknown
    fn duration(&mut self) -> Option<f64>;

    /// Release the media handle.
    ///
    /// Must return without waiting for in-flight decoder work.
    fn close(&mut self);
}

impl<T: TransportAdapter + ?Sized> TransportAdapter for Box<T> {
    fn backend_name(&self) -> &str {
        (**self).backend_name()
    }

    fn open(&mut self, path: &Path) -> Result<(), TransportError> {
        (**self).open(path)
    }

    fn play(&mut self) -> Result<(), TransportError> {
        (**self).play()
    }

    fn pause(&mut self) -> Result<(), TransportError> {
        (**self).pause()
    }

    fn seek(&mut self, position_ms: f64) -> Result<(), TransportError> {
        (**self).seek(position_ms)
    }

    fn set_rate(&mut self, rate: f64) -> Result<(), TransportError> {
        (**self).set_rate(rate)
    }

    fn position(&mut self) -> Result<f64, TransportError> {
        (**self).position()
    }

    fn duration(&mut self) -> Option<f64> {
        (**self).duration()
    }

    fn close(&mut self) {
        (**self).close()
    }
}
