//! Main sync engine implementation.

use std::path::{Path, PathBuf};

use contracts::{
    ActualTotals, AdjustmentFactors, PlaybackState, RealtimeSample, SyncDecision,
    SyncEngineConfig, SyncFileProvider, SyncMode, SyncReport, SyncStatus, TransportAdapter,
    TransportError,
};
use tracing::{debug, info, instrument, warn};

use crate::adjust;
use crate::error::SyncError;
use crate::history::DriftHistory;
use crate::position::{resolve_sync_mode, SessionOdometer};
use crate::rate::{Correction, RateController};
use crate::table::SyncTable;

const NATIVE_RATE: f64 = 1.0;

#[derive(Debug, Default, Clone, Copy)]
struct EngineCounters {
    seeks: u64,
    nudges: u64,
    transient_errors: u64,
}

/// Telemetry-driven video sync engine
///
/// Owns the playback state machine and issues at most one transport
/// mutation per telemetry update.
pub struct SyncEngine {
    config: SyncEngineConfig,
    transport: Box<dyn TransportAdapter>,
    provider: Box<dyn SyncFileProvider>,
    state: PlaybackState,
    media: Option<PathBuf>,
    table: Option<SyncTable>,
    factors: AdjustmentFactors,
    actual: ActualTotals,
    /// Container duration read after open
    media_duration_ms: Option<f64>,
    odometer: SessionOdometer,
    controller: RateController,
    history: DriftHistory,
    /// Rate currently applied on the transport
    rate: f64,
    /// Added to identity targets after a user seek
    identity_offset_ms: f64,
    last_sample: Option<RealtimeSample>,
    last_target_ms: Option<f64>,
    counters: EngineCounters,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("backend", &self.transport.backend_name())
            .field("state", &self.state)
            .field("media", &self.media)
            .field("synced", &self.is_synced())
            .field("rate", &self.rate)
            .finish()
    }
}

impl SyncEngine {
    /// Create an engine in the Stopped state with no media selected
    pub fn new(
        config: SyncEngineConfig,
        transport: Box<dyn TransportAdapter>,
        provider: Box<dyn SyncFileProvider>,
    ) -> Self {
        let controller = RateController::new(config.seek_threshold_ms, config.rate.clone());
        let history = DriftHistory::new(config.drift_history);
        Self {
            config,
            transport,
            provider,
            state: PlaybackState::Stopped,
            media: None,
            table: None,
            factors: AdjustmentFactors::default(),
            actual: ActualTotals::default(),
            media_duration_ms: None,
            odometer: SessionOdometer::new(),
            controller,
            history,
            rate: NATIVE_RATE,
            identity_offset_ms: 0.0,
            last_sample: None,
            last_target_ms: None,
            counters: EngineCounters::default(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Whether a usable sync table is loaded for the selected media
    pub fn is_synced(&self) -> bool {
        self.mode() != SyncMode::Identity
    }

    /// Mapping mode that the next update will use
    pub fn mode(&self) -> SyncMode {
        resolve_sync_mode(
            self.table.as_ref().map(SyncTable::axis),
            self.config.distance_tracking,
        )
    }

    pub fn factors(&self) -> AdjustmentFactors {
        self.factors
    }

    pub fn table(&self) -> Option<&SyncTable> {
        self.table.as_ref()
    }

    /// Select media and load its sync table.
    ///
    /// Only allowed while Stopped. A missing or invalid sync file is not an
    /// error: the session runs unsynced with an identity mapping.
    #[instrument(name = "sync_engine_media_selected", skip(self, path), fields(media = %path.as_ref().display()))]
    pub fn media_selected(&mut self, path: impl AsRef<Path>) -> Result<(), SyncError> {
        if self.state != PlaybackState::Stopped {
            return Err(SyncError::invalid("select media", self.state));
        }

        let path = path.as_ref();
        self.table = match self.provider.load(path) {
            Ok(Some(file)) => match SyncTable::from_sync_file(file, &path.display().to_string()) {
                Ok(table) => {
                    info!(axis = ?table.axis(), points = table.len(), "sync table loaded");
                    Some(table)
                }
                Err(e) => {
                    warn!(error = %e, "sync table rejected, playing unsynced");
                    None
                }
            },
            Ok(None) => {
                warn!("no sync file for media, playing unsynced");
                None
            }
            Err(e) => {
                warn!(error = %e, "sync file unreadable, playing unsynced");
                None
            }
        };

        if self.table.is_some() && !self.is_synced() {
            warn!("distance table loaded but distance tracking disabled, playing unsynced");
        }

        self.media = Some(path.to_path_buf());
        self.media_duration_ms = None;
        self.factors = AdjustmentFactors::default();
        Ok(())
    }

    /// Replace the authoritative session totals and recompute factors
    #[instrument(name = "sync_engine_update_totals", skip(self))]
    pub fn update_actual_totals(&mut self, totals: ActualTotals) {
        self.actual = totals;
        self.recompute_factors();
    }

    /// Stopped -> Playing.
    ///
    /// Opens the media, seeks to the first table target and plays.
    #[instrument(name = "sync_engine_start", skip(self), fields(backend = %self.transport.backend_name()))]
    pub fn start_playback(&mut self) -> Result<(), SyncError> {
        if self.state != PlaybackState::Stopped {
            return Err(SyncError::invalid("start", self.state));
        }
        let Some(media) = self.media.clone() else {
            return Err(SyncError::MediaUnavailable("no media selected".to_string()));
        };

        // Any open failure means the media cannot be played
        if let Err(e) = self.transport.open(&media) {
            warn!(error = %e, "open failed");
            return Err(SyncError::MediaUnavailable(e.to_string()));
        }

        // Playing from here so a fatal error below routes through force_stop
        self.state = PlaybackState::Playing;
        self.media_duration_ms = self.transport.duration();
        self.recompute_factors();
        self.odometer.reset();
        self.history.clear();
        self.rate = NATIVE_RATE;
        self.identity_offset_ms = 0.0;
        self.last_sample = None;

        let target = self.table.as_ref().map_or(0.0, SyncTable::first_target);
        let result = self.transport.seek(target);
        self.apply("seek", result)?;
        self.last_target_ms = Some(target);

        let result = self.transport.play();
        self.apply("play", result)?;

        info!(
            media = %media.display(),
            mode = ?self.mode(),
            time_scale = self.factors.time_scale,
            distance_scale = self.factors.distance_scale,
            "playback started"
        );
        Ok(())
    }

    /// Playing -> Paused
    #[instrument(name = "sync_engine_pause", skip(self))]
    pub fn pause_playback(&mut self) -> Result<(), SyncError> {
        if self.state != PlaybackState::Playing {
            return Err(SyncError::invalid("pause", self.state));
        }
        let result = self.transport.pause();
        if !self.apply("pause", result)? {
            return Err(SyncError::Rejected("pause".to_string()));
        }
        self.state = PlaybackState::Paused;
        debug!("playback paused");
        Ok(())
    }

    /// Paused -> Playing.
    ///
    /// Tracking re-arms from the buffered sample; the next update reconciles.
    #[instrument(name = "sync_engine_resume", skip(self))]
    pub fn resume_playback(&mut self) -> Result<(), SyncError> {
        if self.state != PlaybackState::Paused {
            return Err(SyncError::invalid("resume", self.state));
        }
        let result = self.transport.play();
        if !self.apply("play", result)? {
            return Err(SyncError::Rejected("play".to_string()));
        }
        if let Some(sample) = &self.last_sample {
            self.odometer.rebase(sample.elapsed_ms);
        }
        self.state = PlaybackState::Playing;
        debug!("playback resumed");
        Ok(())
    }

    /// Any state -> Stopped.
    ///
    /// Requests release of the media handle without waiting for it.
    #[instrument(name = "sync_engine_stop", skip(self))]
    pub fn stop_playback(&mut self) {
        if self.state == PlaybackState::Stopped {
            return;
        }
        self.transport.close();
        self.reset_session();
        info!("playback stopped");
    }

    /// User seek to an absolute video position.
    ///
    /// Factors are unchanged. Unsynced sessions continue from the new
    /// position; synced sessions are pulled back to the table on the next
    /// update.
    #[instrument(name = "sync_engine_seek", skip(self))]
    pub fn seek_playback(&mut self, position_ms: f64) -> Result<(), SyncError> {
        if self.state == PlaybackState::Stopped {
            return Err(SyncError::invalid("seek", self.state));
        }
        if !position_ms.is_finite() {
            return Err(SyncError::Rejected(format!("seek to {position_ms}")));
        }

        let position_ms = position_ms.max(0.0);
        let result = self.transport.seek(position_ms);
        if !self.apply("seek", result)? {
            return Err(SyncError::Rejected("seek".to_string()));
        }

        if self.mode() == SyncMode::Identity {
            self.identity_offset_ms = position_ms - self.odometer.elapsed_ms() as f64;
        }
        self.last_target_ms = Some(position_ms);
        Ok(())
    }

    /// Process one telemetry sample.
    ///
    /// Playing: re-derive the target and issue at most one correction.
    /// Paused: keep the sample as last sample (`Buffered`).
    /// Stopped: no-op (`Ignored`).
    #[instrument(
        level = "debug",
        name = "sync_engine_telemetry_update",
        skip(self, sample),
        fields(state = %self.state, elapsed_ms = sample.elapsed_ms)
    )]
    pub fn telemetry_update(&mut self, sample: RealtimeSample) -> Result<SyncReport, SyncError> {
        let (sample, clamped) = sample.sanitized();
        if clamped > 0 {
            metrics::counter!("trainer_sync_samples_clamped_total").increment(clamped as u64);
            debug!(clamped, "sample fields out of range, clamped to 0");
        }

        match self.state {
            PlaybackState::Stopped => Ok(self.idle_report(SyncDecision::Ignored, clamped)),
            PlaybackState::Paused => {
                self.last_sample = Some(sample);
                Ok(self.idle_report(SyncDecision::Buffered, clamped))
            }
            PlaybackState::Playing => self.track(sample, clamped),
        }
    }

    /// Diagnostics snapshot
    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            state: self.state,
            media: self.media.as_ref().map(|p| p.display().to_string()),
            synced: self.is_synced(),
            mode: self.mode(),
            factors: self.factors,
            rate: self.rate,
            session_elapsed_ms: self.odometer.elapsed_ms(),
            session_distance_km: self.odometer.distance_km(),
            last_target_ms: self.last_target_ms,
            mean_abs_drift_ms: self.history.mean_abs(),
            max_abs_drift_ms: self.history.max_abs(),
            seeks: self.counters.seeks,
            nudges: self.counters.nudges,
            transient_errors: self.counters.transient_errors,
        }
    }

    fn track(&mut self, sample: RealtimeSample, clamped: u32) -> Result<SyncReport, SyncError> {
        self.odometer
            .advance(&sample, self.config.distance_tracking);
        self.last_sample = Some(sample);

        let mode = self.mode();
        let session_position = self.odometer.position(mode);
        let target_ms = self.target_for(mode, session_position);
        self.last_target_ms = Some(target_ms);

        let current_ms = match self.transport.position() {
            Ok(position) => position,
            Err(e) if e.is_fatal() => {
                self.force_stop(&e);
                return Err(e.into());
            }
            Err(e) => {
                self.note_transient("position", &e);
                return Ok(self.report(SyncDecision::Retry, mode, session_position, target_ms, f64::NAN, clamped));
            }
        };

        let delta_ms = target_ms - current_ms;
        self.history.record(delta_ms);

        let decision = match self.controller.plan(delta_ms, self.rate != NATIVE_RATE) {
            Correction::Seek => {
                let result = self.transport.seek(target_ms);
                if self.apply("seek", result)? {
                    self.counters.seeks += 1;
                    metrics::counter!("trainer_sync_seeks_total").increment(1);
                    debug!(target_ms, delta_ms, "hard resync");
                    SyncDecision::Seek { target_ms }
                } else {
                    SyncDecision::Retry
                }
            }
            Correction::Nudge(rate) if self.controller.within_epsilon(rate, self.rate) => {
                SyncDecision::Hold
            }
            Correction::Nudge(rate) => self.change_rate(rate)?,
            Correction::Hold if self.rate != NATIVE_RATE => self.change_rate(NATIVE_RATE)?,
            Correction::Hold => SyncDecision::Hold,
        };

        Ok(self.report(decision, mode, session_position, target_ms, current_ms, clamped))
    }

    fn target_for(&self, mode: SyncMode, session_position: f64) -> f64 {
        match (&self.table, mode) {
            (Some(table), SyncMode::Distance | SyncMode::Time) => {
                let scale = self.factors.for_axis(table.axis());
                table.lookup(session_position / scale)
            }
            _ => (session_position + self.identity_offset_ms).max(0.0),
        }
    }

    fn change_rate(&mut self, rate: f64) -> Result<SyncDecision, SyncError> {
        let result = self.transport.set_rate(rate);
        if !self.apply("set_rate", result)? {
            return Ok(SyncDecision::Retry);
        }
        debug!(from = self.rate, to = rate, "playback rate changed");
        self.rate = rate;
        self.counters.nudges += 1;
        metrics::counter!("trainer_sync_rate_nudges_total").increment(1);
        Ok(SyncDecision::Nudge { rate })
    }

    /// Classify a transport result.
    ///
    /// `Ok(true)` applied, `Ok(false)` rejected (counted, retried next
    /// tick), `Err` fatal (engine forced to Stopped).
    fn apply(
        &mut self,
        command: &'static str,
        result: Result<(), TransportError>,
    ) -> Result<bool, SyncError> {
        match result {
            Ok(()) => Ok(true),
            Err(e) if e.is_fatal() => {
                self.force_stop(&e);
                Err(e.into())
            }
            Err(e) => {
                self.note_transient(command, &e);
                Ok(false)
            }
        }
    }

    fn note_transient(&mut self, command: &'static str, error: &TransportError) {
        self.counters.transient_errors += 1;
        metrics::counter!("trainer_sync_transport_transient_total", "command" => command)
            .increment(1);
        warn!(command, error = %error, "transport command rejected, retrying next tick");
    }

    fn force_stop(&mut self, error: &TransportError) {
        tracing::error!(error = %error, state = %self.state, "fatal transport error, stopping");
        self.transport.close();
        self.reset_session();
    }

    fn reset_session(&mut self) {
        self.state = PlaybackState::Stopped;
        self.rate = NATIVE_RATE;
        self.last_sample = None;
    }

    fn recompute_factors(&mut self) {
        let media_duration = if self.config.scale_to_media_duration {
            self.media_duration_ms
        } else {
            None
        };
        self.factors = adjust::compute_for_table(self.table.as_ref(), self.actual, media_duration);
    }

    fn idle_report(&self, decision: SyncDecision, clamped: u32) -> SyncReport {
        let mode = self.mode();
        let target = self.last_target_ms.unwrap_or(0.0);
        self.report(decision, mode, self.odometer.position(mode), target, target, clamped)
    }

    fn report(
        &self,
        decision: SyncDecision,
        mode: SyncMode,
        session_position: f64,
        target_ms: f64,
        current_ms: f64,
        clamped_fields: u32,
    ) -> SyncReport {
        SyncReport {
            decision,
            mode,
            session_position,
            target_ms,
            current_ms,
            delta_ms: target_ms - current_ms,
            rate: self.rate,
            factors: self.factors,
            clamped_fields,
        }
    }
}
