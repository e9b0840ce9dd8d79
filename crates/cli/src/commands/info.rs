//! `info` command implementation.

use anyhow::{Context, Result};
use config_loader::{load_sync_file, FileSyncProvider};
use contracts::{AdjustmentFactors, SessionBlueprint, SyncEngineConfig, SyncFilePoint};
use serde::Serialize;
use sync_engine::{adjust, SyncTable};
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    media: MediaInfo,
    transport: TransportInfo,
    engine: SyncEngineConfig,
    telemetry: TelemetryInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    sync_table: Option<TableInfo>,
}

#[derive(Serialize)]
struct MediaInfo {
    path: Option<String>,
    sync_dir: Option<String>,
    sync_file: Option<String>,
}

#[derive(Serialize)]
struct TransportInfo {
    backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    mpv_socket: Option<String>,
}

#[derive(Serialize)]
struct TelemetryInfo {
    source: String,
    poll_interval_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    replay_path: Option<String>,
}

#[derive(Serialize)]
struct TableInfo {
    axis: String,
    point_count: usize,
    first_target_ms: f64,
    last_target_ms: f64,
    declared_duration_ms: Option<f64>,
    declared_distance_km: Option<f64>,
    /// Factors against the configured session totals
    factors: AdjustmentFactors,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    points: Vec<SyncFilePoint>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(&args.config).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&blueprint, args)?;
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(blueprint: &SessionBlueprint, args: &InfoArgs) -> Result<ConfigInfo> {
    let provider = FileSyncProvider::from_blueprint(blueprint);
    let sync_file = blueprint
        .media
        .path
        .as_deref()
        .and_then(|media| provider.locate(media));

    let sync_table = match &sync_file {
        Some(path) => {
            let origin = path.display().to_string();
            let file = load_sync_file(path)
                .with_context(|| format!("Failed to load sync file {origin}"))?;
            let table = SyncTable::from_sync_file(file, &origin)
                .with_context(|| format!("Unusable sync table {origin}"))?;
            Some(table_info(&table, blueprint, args.table))
        }
        None => None,
    };

    Ok(ConfigInfo {
        version: format!("{:?}", blueprint.version),
        media: MediaInfo {
            path: display(blueprint.media.path.as_deref()),
            sync_dir: display(blueprint.media.sync_dir.as_deref()),
            sync_file: display(sync_file.as_deref()),
        },
        transport: TransportInfo {
            backend: format!("{:?}", blueprint.transport.backend),
            mpv_socket: display(blueprint.transport.mpv_socket.as_deref()),
        },
        engine: blueprint.to_sync_engine_config(),
        telemetry: TelemetryInfo {
            source: format!("{:?}", blueprint.telemetry.source),
            poll_interval_ms: blueprint.telemetry.poll_interval_ms,
            replay_path: display(blueprint.telemetry.replay_path.as_deref()),
        },
        sync_table,
    })
}

fn table_info(table: &SyncTable, blueprint: &SessionBlueprint, with_points: bool) -> TableInfo {
    TableInfo {
        axis: format!("{:?}", table.axis()),
        point_count: table.len(),
        first_target_ms: table.first_target(),
        last_target_ms: table.last_target(),
        declared_duration_ms: table.declared_duration_ms(),
        declared_distance_km: table.declared_distance_km(),
        factors: adjust::compute_for_table(Some(table), blueprint.actual_totals(), None),
        points: if with_points {
            table.points().to_vec()
        } else {
            Vec::new()
        },
    }
}

fn display(path: Option<&std::path::Path>) -> Option<String> {
    path.map(|p| p.display().to_string())
}

fn print_config_info(info: &ConfigInfo) {
    println!("=== Trainer Sync Configuration ===\n");

    println!("Media");
    println!("   Version: {}", info.version);
    println!("   File: {}", info.media.path.as_deref().unwrap_or("(none)"));
    if let Some(dir) = &info.media.sync_dir {
        println!("   Sync dir: {}", dir);
    }
    println!(
        "   Sync file: {}",
        info.media.sync_file.as_deref().unwrap_or("(none, unsynced)")
    );

    println!("\nTransport");
    println!("   Backend: {}", info.transport.backend);
    if let Some(socket) = &info.transport.mpv_socket {
        println!("   mpv socket: {}", socket);
    }

    let engine = &info.engine;
    println!("\nEngine");
    println!("   Seek threshold: {} ms", engine.seek_threshold_ms);
    println!(
        "   Tolerance: engage {} ms / release {} ms",
        engine.rate.engage_tolerance_ms, engine.rate.release_tolerance_ms
    );
    println!(
        "   Rate range: {}..{} (catch-up {} ms)",
        engine.rate.min_rate, engine.rate.max_rate, engine.rate.catch_up_ms
    );
    println!("   Distance tracking: {}", engine.distance_tracking);

    println!("\nTelemetry");
    println!("   Source: {}", info.telemetry.source);
    println!("   Poll interval: {} ms", info.telemetry.poll_interval_ms);
    if let Some(path) = &info.telemetry.replay_path {
        println!("   Replay file: {}", path);
    }

    if let Some(table) = &info.sync_table {
        println!("\nSync table");
        println!("   Axis: {}", table.axis);
        println!("   Points: {}", table.point_count);
        println!(
            "   Video span: {:.1}s .. {:.1}s",
            table.first_target_ms / 1000.0,
            table.last_target_ms / 1000.0
        );
        println!(
            "   Factors: time x{:.3}, distance x{:.3}",
            table.factors.time_scale, table.factors.distance_scale
        );
        for point in &table.points {
            println!("     {:>12.3} -> {:>10.1} ms", point.source, point.target_ms);
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_info_includes_sidecar_table() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("alps.mp4");
        fs::write(&media, b"").unwrap();
        fs::write(
            dir.path().join("alps.sync.toml"),
            "axis = \"time\"\n\n[[points]]\nsource = 0.0\ntarget_ms = 0.0\n\n[[points]]\nsource = 60000.0\ntarget_ms = 58000.0\n",
        )
        .unwrap();

        let mut blueprint = SessionBlueprint::default();
        blueprint.media.path = Some(media);
        blueprint.session.duration_ms = Some(66_000.0);

        let args = InfoArgs {
            config: "unused.toml".into(),
            json: true,
            table: true,
        };
        let info = build_config_info(&blueprint, &args).unwrap();
        let table = info.sync_table.unwrap();
        assert_eq!(table.point_count, 2);
        assert_eq!(table.points.len(), 2);
        assert_eq!(table.last_target_ms, 58_000.0);
        assert!((table.factors.time_scale - 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_info_without_media() {
        let args = InfoArgs {
            config: "unused.toml".into(),
            json: false,
            table: false,
        };
        let info = build_config_info(&SessionBlueprint::default(), &args).unwrap();
        assert!(info.sync_table.is_none());
        assert!(info.media.path.is_none());
    }
}
