//! Session statistics.

use std::time::Duration;

use contracts::SyncStatus;
use observability::SyncMetricsAggregator;
use telemetry::MetricsSnapshot;

/// Statistics from a session run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Transport backend name
    pub backend: String,

    /// Media played
    pub media: String,

    /// Whether a sync table was in use
    pub synced: bool,

    /// Samples handed to the session
    pub samples_received: u64,

    /// Total duration of the run
    pub duration: Duration,

    /// Telemetry channel counters
    pub telemetry: MetricsSnapshot,

    /// Engine status after stop
    pub final_status: Option<SyncStatus>,

    /// Per-update aggregation
    pub sync_metrics: SyncMetricsAggregator,
}

impl PipelineStats {
    /// Telemetry updates per second
    pub fn updates_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.sync_metrics.total_updates as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        println!("\n=== Session Statistics ===\n");

        println!("Overview");
        println!("   Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   Backend: {}", self.backend);
        println!("   Media: {}", self.media);
        println!("   Synced: {}", self.synced);
        println!("   Samples received: {}", self.samples_received);
        println!(
            "   Samples dropped (queue full): {}",
            self.telemetry.samples_dropped
        );
        println!("   Updates/s: {:.2}", self.updates_per_sec());

        if let Some(status) = &self.final_status {
            println!("\nSession");
            println!("   Elapsed: {:.1}s", status.session_elapsed_ms as f64 / 1000.0);
            println!("   Distance: {:.3} km", status.session_distance_km);
            println!("   Mode: {:?}", status.mode);
            println!(
                "   Factors: time x{:.3}, distance x{:.3}",
                status.factors.time_scale, status.factors.distance_scale
            );
            if let Some(target) = status.last_target_ms {
                println!("   Last target: {:.1}s", target / 1000.0);
            }
            println!("   Transient transport errors: {}", status.transient_errors);
        }

        println!("\n{}", self.sync_metrics.summary());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_updates_per_sec() {
        let mut stats = PipelineStats::default();
        assert_eq!(stats.updates_per_sec(), 0.0);

        stats.duration = Duration::from_secs(4);
        stats.sync_metrics.total_updates = 10;
        assert!((stats.updates_per_sec() - 2.5).abs() < 1e-12);
    }
}
