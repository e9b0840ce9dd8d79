//! Session position tracking and sync-mode policy.

use contracts::{RealtimeSample, SyncAxis, SyncMode};

/// Pick how session position maps onto the video.
///
/// | table axis | distance tracking | mode     |
/// |------------|-------------------|----------|
/// | distance   | on                | Distance |
/// | distance   | off               | Identity |
/// | time       | any               | Time     |
/// | none       | any               | Identity |
pub fn resolve_sync_mode(table_axis: Option<SyncAxis>, distance_tracking: bool) -> SyncMode {
    match table_axis {
        Some(SyncAxis::Distance) if distance_tracking => SyncMode::Distance,
        Some(SyncAxis::Time) => SyncMode::Time,
        _ => SyncMode::Identity,
    }
}

/// Elapsed time and integrated distance of the running session
#[derive(Debug, Clone, Default)]
pub struct SessionOdometer {
    elapsed_ms: u64,
    distance_km: f64,
    /// Elapsed time of the last integrated sample
    baseline_ms: u64,
}

impl SessionOdometer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a sample's elapsed time and, with `integrate_distance`, add
    /// `speed * dt` to the distance.
    ///
    /// A sample older than the baseline contributes no distance.
    pub fn advance(&mut self, sample: &RealtimeSample, integrate_distance: bool) {
        let dt_ms = sample.elapsed_ms.saturating_sub(self.baseline_ms);
        if integrate_distance && sample.speed_kmh.is_finite() && sample.speed_kmh > 0.0 {
            self.distance_km += sample.speed_kmh * dt_ms as f64 / 3_600_000.0;
        }
        self.elapsed_ms = sample.elapsed_ms;
        self.baseline_ms = self.baseline_ms.max(sample.elapsed_ms);
    }

    /// Move the integration baseline without adding distance
    pub fn rebase(&mut self, elapsed_ms: u64) {
        self.elapsed_ms = elapsed_ms;
        self.baseline_ms = elapsed_ms;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_km
    }

    /// Position on the axis used by `mode` (km or ms)
    pub fn position(&self, mode: SyncMode) -> f64 {
        match mode {
            SyncMode::Distance => self.distance_km,
            SyncMode::Time | SyncMode::Identity => self.elapsed_ms as f64,
        }
    }
}
