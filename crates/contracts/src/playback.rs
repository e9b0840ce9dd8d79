//! Playback state and sync engine outputs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::AdjustmentFactors;

/// Transport state owned by the sync engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Stopped => "stopped",
            Self::Playing => "playing",
            Self::Paused => "paused",
        };
        f.write_str(s)
    }
}

/// How session position is mapped onto the video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Integrated distance through a distance-axis table
    Distance,
    /// Elapsed time through a time-axis table
    Time,
    /// Elapsed time maps directly to video time (unsynced)
    Identity,
}

/// Action taken for one telemetry update
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SyncDecision {
    /// Hard resync to the target
    Seek { target_ms: f64 },
    /// Playback rate changed
    Nudge { rate: f64 },
    /// Within tolerance, no transport command
    Hold,
    /// Correction was rejected by the backend; retried next tick
    Retry,
    /// Paused: sample kept as last sample only
    Buffered,
    /// Stopped: sample ignored
    Ignored,
}

impl SyncDecision {
    /// Whether a transport mutation was issued
    pub fn issued_command(&self) -> bool {
        matches!(self, Self::Seek { .. } | Self::Nudge { .. })
    }
}

/// Per-update diagnostics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    /// Decision taken
    pub decision: SyncDecision,

    /// Mapping mode used
    pub mode: SyncMode,

    /// Session position on the mode's axis (km or ms), before scaling
    pub session_position: f64,

    /// Target video position (ms)
    pub target_ms: f64,

    /// Backend position when the sample was processed (ms)
    pub current_ms: f64,

    /// target - current (ms)
    pub delta_ms: f64,

    /// Active playback rate after this update
    pub rate: f64,

    /// Factors applied
    pub factors: AdjustmentFactors,

    /// Fields clamped in the incoming sample
    pub clamped_fields: u32,
}

/// Snapshot of engine state (for diagnostics / UI)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatus {
    pub state: PlaybackState,
    pub media: Option<String>,
    pub synced: bool,
    pub mode: SyncMode,
    pub factors: AdjustmentFactors,
    pub rate: f64,
    pub session_elapsed_ms: u64,
    pub session_distance_km: f64,
    pub last_target_ms: Option<f64>,
    pub mean_abs_drift_ms: f64,
    pub max_abs_drift_ms: f64,
    pub seeks: u64,
    pub nudges: u64,
    pub transient_errors: u64,
}
