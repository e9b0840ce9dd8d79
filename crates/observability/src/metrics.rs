//! Sync engine metrics
//!
//! Records and aggregates per-update `SyncReport`s.

use std::collections::HashMap;

use contracts::{PlaybackState, SyncDecision, SyncReport};
use metrics::{counter, gauge, histogram};

/// Stable label for a decision
pub fn decision_label(decision: &SyncDecision) -> &'static str {
    match decision {
        SyncDecision::Seek { .. } => "seek",
        SyncDecision::Nudge { .. } => "nudge",
        SyncDecision::Hold => "hold",
        SyncDecision::Retry => "retry",
        SyncDecision::Buffered => "buffered",
        SyncDecision::Ignored => "ignored",
    }
}

/// Whether the report carries a measured drift
fn is_measured(decision: &SyncDecision) -> bool {
    !matches!(decision, SyncDecision::Buffered | SyncDecision::Ignored)
}

/// Record metrics for one telemetry update
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_sync_metrics;
///
/// let report = engine.telemetry_update(sample)?;
/// record_sync_metrics(&report);
/// ```
pub fn record_sync_metrics(report: &SyncReport) {
    counter!(
        "trainer_sync_updates_total",
        "decision" => decision_label(&report.decision)
    )
    .increment(1);

    gauge!("trainer_sync_rate").set(report.rate);
    gauge!("trainer_sync_target_ms").set(report.target_ms);

    if is_measured(&report.decision) && report.delta_ms.is_finite() {
        gauge!("trainer_sync_drift_ms").set(report.delta_ms);
        histogram!("trainer_sync_abs_drift_ms").record(report.delta_ms.abs());
    }

    gauge!("trainer_sync_time_scale").set(report.factors.time_scale);
    gauge!("trainer_sync_distance_scale").set(report.factors.distance_scale);
}

/// Record the playback state as a one-hot gauge
pub fn record_playback_state(state: PlaybackState) {
    for candidate in [
        PlaybackState::Stopped,
        PlaybackState::Playing,
        PlaybackState::Paused,
    ] {
        let value = if candidate == state { 1.0 } else { 0.0 };
        gauge!("trainer_sync_state", "state" => candidate.to_string()).set(value);
    }
}

/// Record a telemetry sample reaching the session
pub fn record_sample_received(source_id: &str) {
    counter!(
        "trainer_sync_samples_received_total",
        "source_id" => source_id.to_string()
    )
    .increment(1);
}

/// Record the telemetry queue depth
pub fn record_queue_depth(depth: usize) {
    gauge!("trainer_sync_queue_depth").set(depth as f64);
}

/// In-memory aggregation of a run, for the end-of-run summary
#[derive(Debug, Clone, Default)]
pub struct SyncMetricsAggregator {
    pub total_updates: u64,
    /// Updates per decision label
    pub decisions: HashMap<&'static str, u64>,
    pub clamped_fields: u64,
    /// |target - current| over measured updates (ms)
    pub drift_stats: RunningStats,
    pub rate_stats: RunningStats,
}

impl SyncMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, report: &SyncReport) {
        self.total_updates += 1;
        *self
            .decisions
            .entry(decision_label(&report.decision))
            .or_insert(0) += 1;
        self.clamped_fields += u64::from(report.clamped_fields);

        if is_measured(&report.decision) && report.delta_ms.is_finite() {
            self.drift_stats.push(report.delta_ms.abs());
            self.rate_stats.push(report.rate);
        }
    }

    pub fn count(&self, label: &str) -> u64 {
        self.decisions.get(label).copied().unwrap_or(0)
    }

    pub fn summary(&self) -> MetricsSummary {
        let measured = self.drift_stats.count();
        let percent = |n: u64| {
            if measured > 0 {
                n as f64 / measured as f64 * 100.0
            } else {
                0.0
            }
        };

        MetricsSummary {
            total_updates: self.total_updates,
            seeks: self.count("seek"),
            nudges: self.count("nudge"),
            holds: self.count("hold"),
            retries: self.count("retry"),
            buffered: self.count("buffered"),
            ignored: self.count("ignored"),
            clamped_fields: self.clamped_fields,
            seek_rate: percent(self.count("seek")),
            abs_drift_ms: StatsSummary::from(&self.drift_stats),
            rate: StatsSummary::from(&self.rate_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Run summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_updates: u64,
    pub seeks: u64,
    pub nudges: u64,
    pub holds: u64,
    pub retries: u64,
    pub buffered: u64,
    pub ignored: u64,
    pub clamped_fields: u64,
    /// Seeks as a percentage of measured updates
    pub seek_rate: f64,
    pub abs_drift_ms: StatsSummary,
    pub rate: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Sync Metrics Summary ===")?;
        writeln!(f, "Telemetry updates: {}", self.total_updates)?;
        writeln!(f, "Seeks: {} ({:.2}%)", self.seeks, self.seek_rate)?;
        writeln!(f, "Rate nudges: {}", self.nudges)?;
        writeln!(f, "Holds: {}", self.holds)?;
        writeln!(f, "Retries: {}", self.retries)?;
        writeln!(
            f,
            "Buffered / ignored: {} / {}",
            self.buffered, self.ignored
        )?;
        if self.clamped_fields > 0 {
            writeln!(f, "Clamped sample fields: {}", self.clamped_fields)?;
        }
        writeln!(f, "Abs drift (ms): {}", self.abs_drift_ms)?;
        writeln!(f, "Playback rate: {}", self.rate)?;
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{AdjustmentFactors, SyncMode};

    fn report(decision: SyncDecision, delta_ms: f64, rate: f64) -> SyncReport {
        SyncReport {
            decision,
            mode: SyncMode::Time,
            session_position: 0.0,
            target_ms: 1000.0 + delta_ms,
            current_ms: 1000.0,
            delta_ms,
            rate,
            factors: AdjustmentFactors::default(),
            clamped_fields: 0,
        }
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for value in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(value);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_counts_decisions() {
        let mut aggregator = SyncMetricsAggregator::new();
        aggregator.update(&report(SyncDecision::Seek { target_ms: 9000.0 }, 8000.0, 1.0));
        aggregator.update(&report(SyncDecision::Nudge { rate: 1.1 }, -300.0, 1.1));
        aggregator.update(&report(SyncDecision::Hold, 20.0, 1.1));
        aggregator.update(&report(SyncDecision::Buffered, 0.0, 1.1));

        let summary = aggregator.summary();
        assert_eq!(summary.total_updates, 4);
        assert_eq!(summary.seeks, 1);
        assert_eq!(summary.nudges, 1);
        assert_eq!(summary.holds, 1);
        assert_eq!(summary.buffered, 1);
        // Buffered updates carry no drift
        assert_eq!(summary.abs_drift_ms.count, 3);
        assert!((summary.abs_drift_ms.max - 8000.0).abs() < 1e-10);
        assert!((summary.seek_rate - 100.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_record_without_recorder_is_noop() {
        record_sync_metrics(&report(SyncDecision::Hold, f64::NAN, 1.0));
        record_playback_state(PlaybackState::Playing);
        record_queue_depth(3);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = SyncMetricsAggregator::new();
        aggregator.update(&report(SyncDecision::Seek { target_ms: 1.0 }, 5000.0, 1.0));
        aggregator.update(&report(SyncDecision::Hold, 0.0, 1.0));

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Telemetry updates: 2"));
        assert!(output.contains("Seeks: 1 (50.00%)"));
    }
}
