//! `validate` command implementation.

use anyhow::{Context, Result};
use config_loader::FileSyncProvider;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    media: Option<String>,
    sync_file: Option<String>,
    backend: String,
    telemetry: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let sync_file = blueprint
                .media
                .path
                .as_deref()
                .and_then(|media| FileSyncProvider::from_blueprint(&blueprint).locate(media));
            let warnings = collect_warnings(&blueprint, sync_file.is_some());

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    media: blueprint
                        .media
                        .path
                        .as_ref()
                        .map(|p| p.display().to_string()),
                    sync_file: sync_file.map(|p| p.display().to_string()),
                    backend: format!("{:?}", blueprint.transport.backend),
                    telemetry: format!("{:?}", blueprint.telemetry.source),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &contracts::SessionBlueprint, has_sync_file: bool) -> Vec<String> {
    let mut warnings = Vec::new();

    match &blueprint.media.path {
        None => warnings.push("No media.path configured - pass --media to run".to_string()),
        Some(path) if !path.is_file() => {
            warnings.push(format!("Media file does not exist: {}", path.display()));
        }
        Some(_) if !has_sync_file => warnings.push(
            "No sync file found for media - playback will follow elapsed time".to_string(),
        ),
        Some(_) => {}
    }

    if !blueprint.to_sync_engine_config().distance_tracking {
        warnings.push("distance_tracking is off - distance-axis tables will not be used".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("OK  Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Media: {}", summary.media.as_deref().unwrap_or("(none)"));
            println!(
                "  Sync file: {}",
                summary.sync_file.as_deref().unwrap_or("(none)")
            );
            println!("  Backend: {}", summary.backend);
            println!("  Telemetry: {}", summary.telemetry);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\nWarnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("ERR Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
