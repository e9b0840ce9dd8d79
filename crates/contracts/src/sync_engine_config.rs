//! Sync engine configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Sync engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SyncEngineConfig {
    /// |delta| above which the engine seeks instead of nudging (ms)
    #[validate(range(min = 1.0))]
    pub seek_threshold_ms: f64,

    /// Rate controller configuration
    #[serde(default)]
    #[validate(nested)]
    pub rate: RateConfig,

    /// Integrate speed into distance and use distance-axis tables
    #[serde(default = "default_true")]
    pub distance_tracking: bool,

    /// Use the media duration as actual duration when the session has none
    #[serde(default = "default_true")]
    pub scale_to_media_duration: bool,

    /// Number of recent deltas kept for drift statistics
    #[serde(default = "default_drift_history")]
    #[validate(range(min = 1, max = 10000))]
    pub drift_history: usize,
}

impl Default for SyncEngineConfig {
    fn default() -> Self {
        Self {
            seek_threshold_ms: 3000.0,
            rate: RateConfig::default(),
            distance_tracking: true,
            scale_to_media_duration: true,
            drift_history: default_drift_history(),
        }
    }
}

/// Rate-nudge controller configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RateConfig {
    /// |delta| that starts a nudge (ms)
    #[validate(range(min = 0.0))]
    pub engage_tolerance_ms: f64,
    /// |delta| at or below which an active nudge is released (ms)
    #[validate(range(min = 0.0))]
    pub release_tolerance_ms: f64,
    /// Horizon over which a delta is caught up (ms)
    #[validate(range(min = 1.0))]
    pub catch_up_ms: f64,
    /// Lowest rate multiplier
    #[validate(range(min = 0.05, max = 1.0))]
    pub min_rate: f64,
    /// Highest rate multiplier
    #[validate(range(min = 1.0, max = 16.0))]
    pub max_rate: f64,
    /// Rate changes smaller than this are not re-issued
    #[validate(range(min = 0.0, max = 0.5))]
    pub rate_epsilon: f64,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            engage_tolerance_ms: 250.0,
            release_tolerance_ms: 100.0,
            catch_up_ms: 4000.0,
            min_rate: 0.5,
            max_rate: 2.0,
            rate_epsilon: 0.02,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_drift_history() -> usize {
    32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(SyncEngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_nested_rate_range_checked() {
        let mut config = SyncEngineConfig::default();
        config.rate.max_rate = 0.8;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_rate"), "got: {err}");
    }
}
