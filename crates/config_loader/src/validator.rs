//! Config validation
//!
//! Rules:
//! - field ranges (`validator` derive on the contract types)
//! - effective engine config in range
//! - release tolerance <= engage tolerance < seek threshold
//! - min_rate < 1 < max_rate
//! - media extension is a supported container
//! - mpv backend has a socket path
//! - replay source has a replay file

use std::path::Path;

use contracts::{
    ContractError, RateConfig, SessionBlueprint, TelemetrySourceKind, TransportBackend,
};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Container extensions the backends can open
pub const SUPPORTED_MEDIA_EXTENSIONS: &[&str] = &[
    "mp4", "m4v", "mkv", "mov", "avi", "webm", "mpg", "mpeg", "wmv", "ogv",
];

/// Validate a SessionBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    validate_structure(blueprint)?;
    validate_engine(blueprint)?;
    validate_media(blueprint)?;
    validate_transport(blueprint)?;
    validate_telemetry(blueprint)?;
    Ok(())
}

fn validate_structure(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    blueprint
        .validate()
        .map_err(|e| to_contract_error("", &e))
}

fn validate_engine(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    if let Some(rate) = &blueprint.engine.rate {
        validate_rate(rate)?;
    }

    let config = blueprint.to_sync_engine_config();
    config
        .validate()
        .map_err(|e| to_contract_error("engine", &e))?;

    if config.seek_threshold_ms <= config.rate.engage_tolerance_ms {
        return Err(ContractError::config_validation(
            "engine.seek_threshold_ms",
            format!(
                "seek_threshold_ms ({}) must be > engage_tolerance_ms ({})",
                config.seek_threshold_ms, config.rate.engage_tolerance_ms
            ),
        ));
    }
    Ok(())
}

fn validate_rate(rate: &RateConfig) -> Result<(), ContractError> {
    if rate.release_tolerance_ms > rate.engage_tolerance_ms {
        return Err(ContractError::config_validation(
            "engine.rate.release_tolerance_ms",
            format!(
                "release_tolerance_ms ({}) must be <= engage_tolerance_ms ({})",
                rate.release_tolerance_ms, rate.engage_tolerance_ms
            ),
        ));
    }
    if !(rate.min_rate < 1.0 && rate.max_rate > 1.0) {
        return Err(ContractError::config_validation(
            "engine.rate.min_rate / engine.rate.max_rate",
            format!(
                "expected min_rate < 1 < max_rate, got {} / {}",
                rate.min_rate, rate.max_rate
            ),
        ));
    }
    Ok(())
}

fn validate_media(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let Some(path) = &blueprint.media.path else {
        return Ok(());
    };
    if !is_supported_media(path) {
        return Err(ContractError::config_validation(
            "media.path",
            format!(
                "unsupported media type '{}', expected one of: {}",
                path.display(),
                SUPPORTED_MEDIA_EXTENSIONS.join(", ")
            ),
        ));
    }
    Ok(())
}

fn validate_transport(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let transport = &blueprint.transport;
    if transport.backend == TransportBackend::Mpv && transport.mpv_socket.is_none() {
        return Err(ContractError::config_validation(
            "transport.mpv_socket",
            "mpv backend requires mpv_socket",
        ));
    }
    Ok(())
}

fn validate_telemetry(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let telemetry = &blueprint.telemetry;
    if telemetry.source == TelemetrySourceKind::Replay && telemetry.replay_path.is_none() {
        return Err(ContractError::config_validation(
            "telemetry.replay_path",
            "replay source requires replay_path",
        ));
    }
    Ok(())
}

/// Whether the file extension is a supported container
pub fn is_supported_media(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            SUPPORTED_MEDIA_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

fn to_contract_error(prefix: &str, errors: &ValidationErrors) -> ContractError {
    let field = first_field(prefix, errors);
    ContractError::config_validation(field, errors.to_string())
}

/// Dotted path of the first failing field
fn first_field(prefix: &str, errors: &ValidationErrors) -> String {
    let Some((name, kind)) = errors.errors().iter().next() else {
        return prefix.to_string();
    };
    let path = join(prefix, name);
    match kind {
        ValidationErrorsKind::Field(_) => path,
        ValidationErrorsKind::Struct(inner) => first_field(&path, inner),
        ValidationErrorsKind::List(items) => match items.iter().next() {
            Some((idx, inner)) => first_field(&format!("{path}[{idx}]"), inner),
            None => path,
        },
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}
