//! Session orchestrator - wires transport, telemetry and the sync session.

use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use config_loader::FileSyncProvider;
use contracts::{PlaybackState, SessionBlueprint, SyncDecision};
use observability::{
    record_playback_state, record_queue_depth, record_sample_received, record_sync_metrics,
};
use sync_engine::{SessionHandle, SyncEngine};
use telemetry::{source_from_config, TelemetryPipeline};
use tracing::{debug, info, warn};
use transport::TransportFactory;

use super::PipelineStats;
use crate::error::CliError;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The session blueprint
    pub blueprint: SessionBlueprint,

    /// Stop after this long (None = until telemetry ends)
    pub max_duration: Option<Duration>,

    /// Stop after this many samples (None = unlimited)
    pub max_samples: Option<u64>,

    /// Session command queue size
    pub queue_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main session orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the session until telemetry ends, a limit is hit or `shutdown` resolves
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let media = blueprint
            .media
            .path
            .clone()
            .ok_or_else(|| CliError::media_missing("no media.path configured"))?;
        if !media.is_file() {
            let message = format!("{} does not exist", media.display());
            return Err(CliError::media_missing(message).into());
        }

        // Transport + engine
        let transport = TransportFactory::create(&blueprint.transport)
            .context("Failed to create transport backend")?;
        let backend = transport.backend_name().to_string();
        let provider = FileSyncProvider::from_blueprint(blueprint);

        let mut engine = SyncEngine::new(
            blueprint.to_sync_engine_config(),
            transport,
            Box::new(provider),
        );
        engine.update_actual_totals(blueprint.actual_totals());
        let session = SessionHandle::spawn(engine, self.config.queue_size);

        session
            .select_media(&media)
            .await
            .context("Failed to select media")?;
        session
            .start()
            .await
            .with_context(|| format!("Failed to start playback of {}", media.display()))?;

        let status = session.status().await?;
        record_playback_state(status.state);
        info!(
            backend = %backend,
            media = %media.display(),
            synced = status.synced,
            mode = ?status.mode,
            "Playback started"
        );
        if !status.synced {
            warn!("No usable sync table, video follows elapsed time");
        }

        // Telemetry
        let mut telemetry = TelemetryPipeline::new(blueprint.telemetry.channel_capacity);
        let source = source_from_config(&blueprint.telemetry)
            .context("Failed to create telemetry source")?;
        let source_id = source.source_id().to_string();
        telemetry.register_source(source);
        let rx = telemetry
            .take_receiver()
            .context("Failed to get telemetry receiver")?;
        telemetry.start_all();

        info!(
            source = %source_id,
            max_samples = ?self.config.max_samples,
            max_duration = ?self.config.max_duration,
            "Session running"
        );

        let mut stats = PipelineStats {
            backend,
            media: media.display().to_string(),
            synced: status.synced,
            ..Default::default()
        };

        let poll_ms = telemetry.poll_interval_ms().unwrap_or(1000).max(100);
        let idle = Duration::from_millis(poll_ms * 2);
        let max_duration = self.config.max_duration;
        let deadline = async move {
            match max_duration {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);
        tokio::pin!(shutdown);

        let mut failure = None;
        loop {
            let next = tokio::select! {
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping session...");
                    break;
                }
                _ = &mut deadline => {
                    info!("Reached max duration");
                    break;
                }
                next = tokio::time::timeout(idle, rx.recv()) => next,
            };

            let sample = match next {
                Ok(Ok(sample)) => sample,
                Ok(Err(_)) => break,
                Err(_) => {
                    if telemetry.is_active() {
                        continue;
                    }
                    info!("Telemetry finished");
                    break;
                }
            };

            stats.samples_received += 1;
            record_sample_received(&source_id);
            record_queue_depth(rx.len());

            match session.telemetry(sample).await {
                Ok(report) => {
                    record_sync_metrics(&report);
                    stats.sync_metrics.update(&report);
                    debug!(
                        decision = ?report.decision,
                        target_ms = format!("{:.0}", report.target_ms),
                        delta_ms = format!("{:.0}", report.delta_ms),
                        rate = format!("{:.3}", report.rate),
                        "Telemetry applied"
                    );
                    if report.decision == SyncDecision::Ignored {
                        warn!("Playback stopped, ending session");
                        break;
                    }
                }
                Err(e) if e.is_fatal() => {
                    failure = Some(e);
                    break;
                }
                Err(e) => warn!(error = %e, "Telemetry update failed"),
            }

            if let Some(max) = self.config.max_samples {
                if stats.samples_received >= max {
                    info!(samples = stats.samples_received, "Reached max samples limit");
                    break;
                }
            }
        }

        info!("Shutting down session...");
        telemetry.stop_all();
        stats.telemetry = telemetry.metrics().snapshot();

        let final_status = session.shutdown().await?;
        record_playback_state(PlaybackState::Stopped);
        stats.final_status = Some(final_status);
        stats.duration = start_time.elapsed();

        if let Some(e) = failure {
            return Err(CliError::session_failed(e.to_string()).into());
        }

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            updates_per_sec = format!("{:.2}", stats.updates_per_sec()),
            "Session shutdown complete"
        );

        Ok(stats)
    }
}
