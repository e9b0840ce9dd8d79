//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON session configuration
//! - Validate configuration legality
//! - Generate `SessionBlueprint`
//! - Locate and parse sync files (`FileSyncProvider`)
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("session.toml")).unwrap();
//! println!("Backend: {:?}", blueprint.transport.backend);
//! ```

mod parser;
mod sync_file;
mod validator;

pub use contracts::SessionBlueprint;
pub use parser::ConfigFormat;
pub use sync_file::{load_sync_file, FileSyncProvider};
pub use validator::{is_supported_media, SUPPORTED_MEDIA_EXTENSIONS};

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<SessionBlueprint, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<SessionBlueprint, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Re-run validation, e.g. after CLI overrides were applied
    pub fn validate(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    /// Serialize SessionBlueprint to TOML string
    pub fn to_toml(blueprint: &SessionBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize SessionBlueprint to JSON string
    pub fn to_json(blueprint: &SessionBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<SessionBlueprint, ContractError> {
        let blueprint: SessionBlueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{TelemetrySourceKind, TransportBackend};
    use std::io::Write;

    const SESSION_TOML: &str = r#"
[media]
path = "/videos/alpe.mp4"
sync_dir = "/videos/sync"

[transport]
backend = "simulated"
simulated_seek_latency_ms = 120

[engine]
seek_threshold_ms = 4000.0
distance_tracking = true

[engine.rate]
engage_tolerance_ms = 300.0
release_tolerance_ms = 80.0
catch_up_ms = 5000.0
min_rate = 0.75
max_rate = 1.5
rate_epsilon = 0.01

[telemetry]
source = "simulated"
poll_interval_ms = 250
ride_speed_kmh = 32.0
ride_noise_kmh = 2.0
ride_seed = 7

[session]
distance_km = 13.8
"#;

    #[test]
    fn test_load_from_str_toml() {
        let bp = ConfigLoader::load_from_str(SESSION_TOML, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.transport.backend, TransportBackend::Simulated);
        assert_eq!(bp.telemetry.source, TelemetrySourceKind::Simulated);
        assert_eq!(bp.telemetry.poll_interval_ms, 250);

        let config = bp.to_sync_engine_config();
        assert_eq!(config.seek_threshold_ms, 4000.0);
        assert_eq!(config.rate.max_rate, 1.5);
        assert_eq!(bp.actual_totals().distance_km, Some(13.8));
    }

    #[test]
    fn test_round_trip_toml() {
        let bp = ConfigLoader::load_from_str(SESSION_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.media.path, bp2.media.path);
        assert_eq!(bp.telemetry.ride_seed, bp2.telemetry.ride_seed);
    }

    #[test]
    fn test_round_trip_json() {
        let bp = ConfigLoader::load_from_str(SESSION_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(bp.media.sync_dir, bp2.media.sync_dir);
        assert_eq!(bp.engine.seek_threshold_ms, bp2.engine.seek_threshold_ms);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[transport]
backend = "mpv"
"#;
        let err = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("mpv_socket"), "got: {err}");
    }

    #[test]
    fn test_load_from_path_detects_format() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(SESSION_TOML.as_bytes()).unwrap();
        let bp = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(bp.session.distance_km, Some(13.8));

        let yaml = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::load_from_path(yaml.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }
}
