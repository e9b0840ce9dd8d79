//! SyncFile - parsed course-to-video mapping
//!
//! Produced by a `SyncFileProvider`, consumed once per media selection.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ContractError;

/// Axis the recorded course is indexed by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAxis {
    /// Source positions are kilometres along the course
    #[default]
    Distance,
    /// Source positions are milliseconds of recorded time
    Time,
}

/// One recorded sync point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyncFilePoint {
    /// Course position (km or ms, depending on axis)
    pub source: f64,
    /// Video position (ms)
    pub target_ms: f64,
}

impl SyncFilePoint {
    pub fn new(source: f64, target_ms: f64) -> Self {
        Self { source, target_ms }
    }
}

/// Totals declared by the sync file metadata
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DeclaredTotals {
    /// Recorded duration (ms)
    #[serde(default)]
    pub duration_ms: Option<f64>,
    /// Recorded distance (km)
    #[serde(default)]
    pub distance_km: Option<f64>,
}

/// Totals measured for the running session
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActualTotals {
    /// Session duration (ms)
    #[serde(default)]
    pub duration_ms: Option<f64>,
    /// Session distance (km)
    #[serde(default)]
    pub distance_km: Option<f64>,
}

/// Parsed sync file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncFile {
    /// Axis of `SyncFilePoint::source`
    #[serde(default)]
    pub axis: SyncAxis,

    /// Declared totals (optional)
    #[serde(default)]
    pub declared: DeclaredTotals,

    /// Points ordered by ascending source
    #[serde(default)]
    pub points: Vec<SyncFilePoint>,
}

/// Scale corrections between declared and actual totals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentFactors {
    /// actual duration / declared duration
    pub time_scale: f64,
    /// actual distance / declared distance
    pub distance_scale: f64,
}

impl AdjustmentFactors {
    /// Build factors, replacing non-positive or non-finite scales by 1.0
    pub fn new(time_scale: f64, distance_scale: f64) -> Self {
        Self {
            time_scale: sanitize_scale(time_scale),
            distance_scale: sanitize_scale(distance_scale),
        }
    }

    /// Scale for the given axis
    pub fn for_axis(&self, axis: SyncAxis) -> f64 {
        match axis {
            SyncAxis::Distance => self.distance_scale,
            SyncAxis::Time => self.time_scale,
        }
    }
}

impl Default for AdjustmentFactors {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            distance_scale: 1.0,
        }
    }
}

fn sanitize_scale(scale: f64) -> f64 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    }
}

/// Sync file lookup for a selected media file
///
/// Implementations locate and parse the sync file that belongs to a video.
/// `Ok(None)` means the media has no sync file.
pub trait SyncFileProvider: Send {
    fn load(&self, media: &Path) -> Result<Option<SyncFile>, ContractError>;
}
