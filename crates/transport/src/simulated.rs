//! Simulated player
//!
//! Implements `TransportAdapter` without a decoder: position advances by
//! `rate × clock time` while playing. Seeks land after a configurable
//! latency, the way a real decoder completes them on its own worker.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{TransportAdapter, TransportConfig, TransportError};
use tracing::{debug, instrument, trace};

use crate::clock::{Clock, SystemClock};

/// Simulated player configuration
#[derive(Debug, Clone, Default)]
pub struct SimulatedConfig {
    /// Delay before a seek becomes visible in `position()`
    pub seek_latency_ms: u64,
    /// Reported media duration; `None` plays forever
    pub duration_ms: Option<f64>,
}

impl From<&TransportConfig> for SimulatedConfig {
    fn from(config: &TransportConfig) -> Self {
        Self {
            seek_latency_ms: config.simulated_seek_latency_ms,
            duration_ms: config.simulated_duration_ms,
        }
    }
}

#[derive(Debug, Default)]
struct Faults {
    reject_next: HashSet<&'static str>,
    decoder_dead: bool,
    closes: u64,
}

/// Fault injection handle, shared with the player it came from
#[derive(Debug, Clone, Default)]
pub struct SimulatedControls {
    faults: Arc<Mutex<Faults>>,
}

impl SimulatedControls {
    /// Refuse the next `command` (`"play"`, `"pause"`, `"seek"`, `"set_rate"`)
    pub fn reject_next(&self, command: &'static str) {
        self.lock().reject_next.insert(command);
    }

    /// Every following command fails with a decoder fault
    pub fn kill_decoder(&self) {
        self.lock().decoder_dead = true;
    }

    /// Number of `close()` calls that released loaded media
    pub fn close_count(&self) -> u64 {
        self.lock().closes
    }

    fn check(&self, command: &'static str) -> Result<(), TransportError> {
        let mut faults = self.lock();
        if faults.decoder_dead {
            return Err(TransportError::decoder_fault("simulated decoder died"));
        }
        if faults.reject_next.remove(command) {
            return Err(TransportError::rejected(command, "simulated rejection"));
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingSeek {
    target_ms: f64,
    ready_at_ms: f64,
}

#[derive(Debug)]
struct LoadedMedia {
    path: PathBuf,
    playing: bool,
    rate: f64,
    anchor_position_ms: f64,
    anchor_clock_ms: f64,
    pending_seek: Option<PendingSeek>,
}

/// Clock-driven software player
pub struct SimulatedTransport<C: Clock = SystemClock> {
    config: SimulatedConfig,
    clock: C,
    controls: SimulatedControls,
    media: Option<LoadedMedia>,
}

impl SimulatedTransport<SystemClock> {
    pub fn new(config: SimulatedConfig) -> Self {
        Self::with_clock(config, SystemClock::new())
    }
}

impl<C: Clock> SimulatedTransport<C> {
    pub fn with_clock(config: SimulatedConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            controls: SimulatedControls::default(),
            media: None,
        }
    }

    /// Handle for injecting faults after the player is boxed
    pub fn controls(&self) -> SimulatedControls {
        self.controls.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.media.as_ref().is_some_and(|m| m.playing)
    }

    /// Current rate, 1.0 when nothing is loaded
    pub fn rate(&self) -> f64 {
        self.media.as_ref().map_or(1.0, |m| m.rate)
    }

    pub fn loaded_path(&self) -> Option<&Path> {
        self.media.as_ref().map(|m| m.path.as_path())
    }

    fn clamp(&self, position_ms: f64) -> f64 {
        let position_ms = position_ms.max(0.0);
        match self.config.duration_ms {
            Some(duration) => position_ms.min(duration),
            None => position_ms,
        }
    }

    /// Land a due seek, then extrapolate from the anchor
    fn settle(&mut self) -> Result<f64, TransportError> {
        let now = self.clock.now_ms();
        let media = self.media.as_mut().ok_or(TransportError::NotLoaded)?;

        if let Some(pending) = media.pending_seek {
            if now >= pending.ready_at_ms {
                media.anchor_position_ms = pending.target_ms;
                media.anchor_clock_ms = pending.ready_at_ms;
                media.pending_seek = None;
                trace!(target_ms = pending.target_ms, "seek landed");
            }
        }

        let advanced = if media.playing {
            (now - media.anchor_clock_ms).max(0.0) * media.rate
        } else {
            0.0
        };
        let raw = media.anchor_position_ms + advanced;
        Ok(self.clamp(raw))
    }

    /// Re-anchor at the current position so a state change applies from now
    fn reanchor(&mut self) -> Result<&mut LoadedMedia, TransportError> {
        let position = self.settle()?;
        let now = self.clock.now_ms();
        let media = self.media.as_mut().ok_or(TransportError::NotLoaded)?;
        media.anchor_position_ms = position;
        media.anchor_clock_ms = now;
        Ok(media)
    }
}

impl<C: Clock> TransportAdapter for SimulatedTransport<C> {
    fn backend_name(&self) -> &str {
        "simulated"
    }

    #[instrument(name = "simulated_open", skip(self), fields(path = %path.display()))]
    fn open(&mut self, path: &Path) -> Result<(), TransportError> {
        if !path.is_file() {
            return Err(TransportError::media_unavailable(
                path.display().to_string(),
                "file not found",
            ));
        }
        self.controls.check("open")?;

        self.media = Some(LoadedMedia {
            path: path.to_path_buf(),
            playing: false,
            rate: 1.0,
            anchor_position_ms: 0.0,
            anchor_clock_ms: self.clock.now_ms(),
            pending_seek: None,
        });
        debug!(duration_ms = ?self.config.duration_ms, "media opened");
        Ok(())
    }

    fn play(&mut self) -> Result<(), TransportError> {
        self.controls.check("play")?;
        self.reanchor()?.playing = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), TransportError> {
        self.controls.check("pause")?;
        self.reanchor()?.playing = false;
        Ok(())
    }

    fn seek(&mut self, position_ms: f64) -> Result<(), TransportError> {
        self.controls.check("seek")?;
        if !position_ms.is_finite() {
            return Err(TransportError::rejected("seek", "non-finite target"));
        }
        let target_ms = self.clamp(position_ms);
        let ready_at_ms = self.clock.now_ms() + self.config.seek_latency_ms as f64;
        let immediate = self.config.seek_latency_ms == 0;

        let media = self.reanchor()?;
        if immediate {
            media.anchor_position_ms = target_ms;
            media.pending_seek = None;
        } else {
            media.pending_seek = Some(PendingSeek {
                target_ms,
                ready_at_ms,
            });
        }
        trace!(target_ms, immediate, "seek issued");
        Ok(())
    }

    fn set_rate(&mut self, rate: f64) -> Result<(), TransportError> {
        self.controls.check("set_rate")?;
        if !(rate.is_finite() && rate > 0.0) {
            return Err(TransportError::rejected("set_rate", format!("invalid rate {rate}")));
        }
        self.reanchor()?.rate = rate;
        Ok(())
    }

    fn position(&mut self) -> Result<f64, TransportError> {
        self.controls.check("position")?;
        self.settle()
    }

    fn duration(&mut self) -> Option<f64> {
        self.media.as_ref().and(self.config.duration_ms)
    }

    fn close(&mut self) {
        if let Some(media) = self.media.take() {
            self.controls.lock().closes += 1;
            debug!(path = %media.path.display(), "media closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn player(latency: u64, duration: Option<f64>) -> (SimulatedTransport<ManualClock>, ManualClock, tempfile::NamedTempFile) {
        let clock = ManualClock::new();
        let transport = SimulatedTransport::with_clock(
            SimulatedConfig {
                seek_latency_ms: latency,
                duration_ms: duration,
            },
            clock.clone(),
        );
        let media = tempfile::Builder::new().suffix(".mp4").tempfile().unwrap();
        (transport, clock, media)
    }

    #[test]
    fn test_open_missing_file() {
        let (mut t, _, _) = player(0, None);
        let err = t.open(Path::new("/nonexistent/ride.mp4")).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, TransportError::MediaUnavailable { .. }));
    }

    #[test]
    fn test_commands_need_media() {
        let (mut t, _, _) = player(0, None);
        assert!(matches!(t.play(), Err(TransportError::NotLoaded)));
        assert!(matches!(t.position(), Err(TransportError::NotLoaded)));
        assert_eq!(t.duration(), None);
    }

    #[test]
    fn test_position_follows_rate() {
        let (mut t, clock, media) = player(0, None);
        t.open(media.path()).unwrap();
        clock.advance_ms(1000);
        assert_eq!(t.position().unwrap(), 0.0);

        t.play().unwrap();
        clock.advance_ms(1000);
        assert_eq!(t.position().unwrap(), 1000.0);

        t.set_rate(1.5).unwrap();
        clock.advance_ms(1000);
        assert_eq!(t.position().unwrap(), 2500.0);

        t.pause().unwrap();
        clock.advance_ms(1000);
        assert_eq!(t.position().unwrap(), 2500.0);
        assert!(!t.is_playing());
    }

    #[test]
    fn test_seek_latency() {
        let (mut t, clock, media) = player(200, None);
        t.open(media.path()).unwrap();
        t.play().unwrap();
        clock.advance_ms(100);
        t.seek(10_000.0).unwrap();

        clock.advance_ms(100);
        assert_eq!(t.position().unwrap(), 200.0);

        clock.advance_ms(150);
        assert_eq!(t.position().unwrap(), 10_050.0);
    }

    #[test]
    fn test_clamped_to_duration() {
        let (mut t, clock, media) = player(0, Some(5000.0));
        t.open(media.path()).unwrap();
        assert_eq!(t.duration(), Some(5000.0));
        t.seek(-50.0).unwrap();
        assert_eq!(t.position().unwrap(), 0.0);
        t.seek(9000.0).unwrap();
        assert_eq!(t.position().unwrap(), 5000.0);
        t.play().unwrap();
        clock.advance_ms(1000);
        assert_eq!(t.position().unwrap(), 5000.0);
    }

    #[test]
    fn test_close_drops_pending_seek() {
        let (mut t, clock, media) = player(5000, None);
        let controls = t.controls();
        t.open(media.path()).unwrap();
        t.seek(60_000.0).unwrap();
        t.close();
        assert_eq!(controls.close_count(), 1);

        clock.advance_ms(10_000);
        assert!(matches!(t.position(), Err(TransportError::NotLoaded)));
    }

    #[test]
    fn test_invalid_rate_rejected() {
        let (mut t, _, media) = player(0, None);
        t.open(media.path()).unwrap();
        let err = t.set_rate(0.0).unwrap_err();
        assert!(!err.is_fatal());
        assert!(t.set_rate(f64::NAN).is_err());
        assert_eq!(t.rate(), 1.0);
    }

    #[test]
    fn test_fault_injection() {
        let (mut t, _, media) = player(0, None);
        let controls = t.controls();
        t.open(media.path()).unwrap();

        controls.reject_next("seek");
        assert!(matches!(t.seek(1.0), Err(TransportError::Rejected { command: "seek", .. })));
        assert!(t.seek(1.0).is_ok());

        controls.kill_decoder();
        let err = t.position().unwrap_err();
        assert!(matches!(err, TransportError::DecoderFault { .. }));
    }

    #[test]
    fn test_close_unloads() {
        let (mut t, _, media) = player(0, Some(1.0));
        let controls = t.controls();
        t.open(media.path()).unwrap();
        assert_eq!(t.loaded_path(), Some(media.path()));
        t.close();
        t.close();
        assert!(t.loaded_path().is_none());
        assert_eq!(controls.close_count(), 1);
        assert_eq!(t.duration(), None);
    }
}
