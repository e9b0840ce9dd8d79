//! Playback rate controller.
//!
//! Turns a drift (`target - current`, ms) into one correction: a hard seek,
//! a bounded rate nudge, or nothing. Engage/release tolerances give the
//! nudge hysteresis so the rate does not chatter around the threshold.

use contracts::RateConfig;

/// Correction chosen for one drift sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correction {
    /// Drift too large to catch up, jump to target
    Seek,
    /// Play at this rate until the drift is absorbed
    Nudge(f64),
    /// Within tolerance, native rate
    Hold,
}

/// Drift to correction mapping
#[derive(Debug, Clone)]
pub struct RateController {
    seek_threshold_ms: f64,
    config: RateConfig,
}

impl RateController {
    /// Unusable rate bounds (NaN, non-positive) fall back to the defaults;
    /// inverted bounds are swapped.
    pub fn new(seek_threshold_ms: f64, config: RateConfig) -> Self {
        let mut config = config;
        if config.release_tolerance_ms > config.engage_tolerance_ms {
            config.release_tolerance_ms = config.engage_tolerance_ms;
        }

        let defaults = RateConfig::default();
        let usable = |rate: f64| rate.is_finite() && rate > 0.0;
        if !usable(config.min_rate) {
            config.min_rate = defaults.min_rate;
        }
        if !usable(config.max_rate) {
            config.max_rate = defaults.max_rate;
        }
        if config.min_rate > config.max_rate {
            std::mem::swap(&mut config.min_rate, &mut config.max_rate);
        }

        Self {
            seek_threshold_ms,
            config,
        }
    }

    /// Plan a correction.
    ///
    /// `nudging` is true while a non-native rate is active; the release
    /// tolerance applies then instead of the engage tolerance.
    pub fn plan(&self, delta_ms: f64, nudging: bool) -> Correction {
        if !delta_ms.is_finite() || delta_ms.abs() > self.seek_threshold_ms {
            return Correction::Seek;
        }

        let tolerance = if nudging {
            self.config.release_tolerance_ms
        } else {
            self.config.engage_tolerance_ms
        };
        if delta_ms.abs() <= tolerance {
            return Correction::Hold;
        }

        Correction::Nudge(self.rate_for(delta_ms))
    }

    /// Rate that absorbs `delta_ms` over the catch-up horizon, bounded
    pub fn rate_for(&self, delta_ms: f64) -> f64 {
        let raw = 1.0 + delta_ms / self.config.catch_up_ms.max(1.0);
        raw.clamp(self.config.min_rate, self.config.max_rate)
    }

    /// Whether `candidate` is close enough to `active` to skip re-issuing
    pub fn within_epsilon(&self, candidate: f64, active: f64) -> bool {
        (candidate - active).abs() < self.config.rate_epsilon
    }

    pub fn seek_threshold_ms(&self) -> f64 {
        self.seek_threshold_ms
    }
}
