//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(&args.config).into());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides, then re-validate the result
    if let Some(ref media) = args.media {
        info!(media = %media.display(), "Overriding media from CLI");
        blueprint.media.path = Some(media.clone());
    }
    if let Some(backend) = args.backend {
        info!(backend = ?backend, "Overriding transport backend from CLI");
        blueprint.transport.backend = backend.into();
    }
    if let Some(ref socket) = args.mpv_socket {
        blueprint.transport.mpv_socket = Some(socket.clone());
    }
    config_loader::ConfigLoader::validate(&blueprint)
        .context("Configuration invalid after CLI overrides")?;

    info!(
        media = ?blueprint.media.path,
        backend = ?blueprint.transport.backend,
        telemetry = ?blueprint.telemetry.source,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        max_duration: (args.max_duration > 0).then(|| Duration::from_secs(args.max_duration)),
        max_samples: (args.max_samples > 0).then_some(args.max_samples),
        queue_size: args.queue_size,
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    });

    info!("Starting session...");
    let stats = pipeline
        .run(shutdown_signal())
        .await
        .context("Session execution failed")?;

    info!(
        samples = stats.samples_received,
        updates = stats.sync_metrics.total_updates,
        duration_secs = stats.duration.as_secs_f64(),
        "Session completed"
    );
    stats.print_summary();

    info!("Trainer Sync finished");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::SessionBlueprint) {
    let engine = blueprint.to_sync_engine_config();

    println!("\n=== Configuration Summary ===\n");
    println!("Media:");
    match &blueprint.media.path {
        Some(path) => println!("  File: {}", path.display()),
        None => println!("  File: (none)"),
    }
    if let Some(dir) = &blueprint.media.sync_dir {
        println!("  Sync dir: {}", dir.display());
    }

    println!("\nTransport: {:?}", blueprint.transport.backend);
    println!("Telemetry: {:?}", blueprint.telemetry.source);

    println!("\nEngine:");
    println!("  Seek threshold: {} ms", engine.seek_threshold_ms);
    println!(
        "  Rate: {}..{} (engage {} ms, release {} ms)",
        engine.rate.min_rate,
        engine.rate.max_rate,
        engine.rate.engage_tolerance_ms,
        engine.rate.release_tolerance_ms
    );
    println!("  Distance tracking: {}", engine.distance_tracking);

    println!();
}
