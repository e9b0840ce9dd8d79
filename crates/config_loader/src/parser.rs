//! Config and sync file parsing.
//!
//! TOML is the primary format, JSON is accepted.

use contracts::ContractError;
use serde::de::DeserializeOwned;

/// File format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (preferred)
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Infer format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Toml => "toml",
            Self::Json => "json",
        }
    }
}

/// Parse TOML content
pub fn parse_toml<T: DeserializeOwned>(content: &str) -> Result<T, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON content
pub fn parse_json<T: DeserializeOwned>(content: &str) -> Result<T, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse content in the given format
pub fn parse<T: DeserializeOwned>(content: &str, format: ConfigFormat) -> Result<T, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SessionBlueprint, SyncAxis, SyncFile, TransportBackend};

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[media]
path = "/videos/alpe.mp4"

[transport]
backend = "mpv"
mpv_socket = "/tmp/mpv.sock"
"#;
        let bp: SessionBlueprint = parse_toml(content).unwrap();
        assert_eq!(bp.transport.backend, TransportBackend::Mpv);
        assert_eq!(bp.telemetry.poll_interval_ms, 1000);
        assert!(bp.session.distance_km.is_none());
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "media": { "path": "/videos/alpe.mp4" },
            "engine": { "seek_threshold_ms": 5000.0 },
            "session": { "distance_km": 13.8 }
        }"#;
        let bp: SessionBlueprint = parse_json(content).unwrap();
        assert_eq!(bp.engine.seek_threshold_ms, Some(5000.0));
        assert_eq!(bp.session.distance_km, Some(13.8));
    }

    #[test]
    fn test_parse_sync_file_toml() {
        let content = r#"
axis = "time"

[declared]
duration_ms = 60000.0

[[points]]
source = 0.0
target_ms = 1500.0

[[points]]
source = 60000.0
target_ms = 61500.0
"#;
        let file: SyncFile = parse_toml(content).unwrap();
        assert_eq!(file.axis, SyncAxis::Time);
        assert_eq!(file.points.len(), 2);
        assert_eq!(file.declared.duration_ms, Some(60000.0));
        assert_eq!(file.declared.distance_km, None);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let result: Result<SessionBlueprint, _> = parse_toml("invalid toml [[[");
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
