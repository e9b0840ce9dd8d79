//! SessionBlueprint - Config Loader output
//!
//! Describes a complete training session: media, transport backend,
//! engine tuning, telemetry source and authoritative session totals.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

use crate::{ActualTotals, RateConfig, SyncEngineConfig};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete session blueprint
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SessionBlueprint {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Media selection
    #[serde(default)]
    pub media: MediaConfig,

    /// Video backend selection
    #[serde(default)]
    #[validate(nested)]
    pub transport: TransportConfig,

    /// Engine overrides
    #[serde(default)]
    pub engine: EngineOverrides,

    /// Telemetry source
    #[serde(default)]
    #[validate(nested)]
    pub telemetry: TelemetryConfig,

    /// Authoritative session totals, if known up front
    #[serde(default)]
    #[validate(nested)]
    pub session: SessionTotalsConfig,
}

/// Media configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Video file to play
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Directory searched for sync files when no sidecar exists
    #[serde(default)]
    pub sync_dir: Option<PathBuf>,
}

/// Runtime-selected transport backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportBackend {
    /// Clock-driven software player
    #[default]
    Simulated,
    /// External mpv process over JSON IPC
    Mpv,
}

/// Transport configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TransportConfig {
    /// Backend to instantiate
    #[serde(default)]
    pub backend: TransportBackend,

    /// mpv IPC socket path (`--input-ipc-server`)
    #[serde(default)]
    pub mpv_socket: Option<PathBuf>,

    /// mpv IPC read timeout (ms)
    #[serde(default = "default_ipc_timeout_ms")]
    #[validate(range(min = 10, max = 10000))]
    pub ipc_timeout_ms: u64,

    /// Simulated decoder seek latency (ms)
    #[serde(default)]
    #[validate(range(max = 5000))]
    pub simulated_seek_latency_ms: u64,

    /// Simulated media duration (ms)
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub simulated_duration_ms: Option<f64>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            backend: TransportBackend::Simulated,
            mpv_socket: None,
            ipc_timeout_ms: default_ipc_timeout_ms(),
            simulated_seek_latency_ms: 0,
            simulated_duration_ms: None,
        }
    }
}

fn default_ipc_timeout_ms() -> u64 {
    500
}

/// Optional engine overrides applied on top of `SyncEngineConfig::default()`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineOverrides {
    #[serde(default)]
    pub seek_threshold_ms: Option<f64>,
    #[serde(default)]
    pub rate: Option<RateConfig>,
    #[serde(default)]
    pub distance_tracking: Option<bool>,
    #[serde(default)]
    pub scale_to_media_duration: Option<bool>,
    #[serde(default)]
    pub drift_history: Option<usize>,
}

/// Telemetry source kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetrySourceKind {
    /// Synthetic ride
    #[default]
    Simulated,
    /// JSONL replay of recorded samples
    Replay,
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub source: TelemetrySourceKind,

    /// Polling interval (ms)
    #[serde(default = "default_poll_interval_ms")]
    #[validate(range(min = 10, max = 1000))]
    pub poll_interval_ms: u64,

    /// Replay file (JSONL of `RealtimeSample`)
    #[serde(default)]
    pub replay_path: Option<PathBuf>,

    /// Replay speed multiplier
    #[serde(default = "default_replay_speed")]
    #[validate(range(min = 0.1, max = 100.0))]
    pub replay_speed: f64,

    /// Simulated ride mean speed (km/h)
    #[serde(default = "default_ride_speed")]
    #[validate(range(min = 0.0, max = 120.0))]
    pub ride_speed_kmh: f64,

    /// Simulated ride speed noise amplitude (km/h)
    #[serde(default)]
    #[validate(range(min = 0.0, max = 50.0))]
    pub ride_noise_kmh: f64,

    /// Seed for the simulated ride noise
    #[serde(default)]
    pub ride_seed: u64,

    /// Channel capacity between sources and the session
    #[serde(default = "default_channel_capacity")]
    #[validate(range(min = 1))]
    pub channel_capacity: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            source: TelemetrySourceKind::Simulated,
            poll_interval_ms: default_poll_interval_ms(),
            replay_path: None,
            replay_speed: default_replay_speed(),
            ride_speed_kmh: default_ride_speed(),
            ride_noise_kmh: 0.0,
            ride_seed: 0,
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_replay_speed() -> f64 {
    1.0
}

fn default_ride_speed() -> f64 {
    30.0
}

fn default_channel_capacity() -> usize {
    64
}

/// Session totals section
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SessionTotalsConfig {
    /// Planned session duration (ms)
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub duration_ms: Option<f64>,

    /// Planned session distance (km)
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub distance_km: Option<f64>,
}

impl SessionBlueprint {
    /// Build a SyncEngineConfig using defaults and blueprint overrides
    pub fn to_sync_engine_config(&self) -> SyncEngineConfig {
        let overrides = &self.engine;
        let defaults = SyncEngineConfig::default();

        let mut rate = overrides.rate.clone().unwrap_or(defaults.rate);
        if rate.release_tolerance_ms > rate.engage_tolerance_ms {
            std::mem::swap(&mut rate.release_tolerance_ms, &mut rate.engage_tolerance_ms);
        }

        SyncEngineConfig {
            seek_threshold_ms: overrides
                .seek_threshold_ms
                .unwrap_or(defaults.seek_threshold_ms),
            rate,
            distance_tracking: overrides
                .distance_tracking
                .unwrap_or(defaults.distance_tracking),
            scale_to_media_duration: overrides
                .scale_to_media_duration
                .unwrap_or(defaults.scale_to_media_duration),
            drift_history: overrides.drift_history.unwrap_or(defaults.drift_history),
        }
    }

    /// Session totals as engine input
    pub fn actual_totals(&self) -> ActualTotals {
        ActualTotals {
            duration_ms: self.session.duration_ms,
            distance_km: self.session.distance_km,
        }
    }
}
