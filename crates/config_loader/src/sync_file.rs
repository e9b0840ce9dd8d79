//! Sidecar sync file lookup.

use std::path::{Path, PathBuf};

use contracts::{ContractError, SessionBlueprint, SyncFile, SyncFileProvider};
use tracing::debug;

use crate::parser::{self, ConfigFormat};

/// Locates `<stem>.sync.toml` / `<stem>.sync.json` next to the media,
/// then in an optional sync directory.
#[derive(Debug, Clone, Default)]
pub struct FileSyncProvider {
    sync_dir: Option<PathBuf>,
}

impl FileSyncProvider {
    pub fn new(sync_dir: Option<PathBuf>) -> Self {
        Self { sync_dir }
    }

    pub fn from_blueprint(blueprint: &SessionBlueprint) -> Self {
        Self::new(blueprint.media.sync_dir.clone())
    }

    /// Candidate paths in lookup order
    pub fn candidates(&self, media: &Path) -> Vec<PathBuf> {
        let Some(stem) = media.file_stem().and_then(|s| s.to_str()) else {
            return Vec::new();
        };

        let names = [ConfigFormat::Toml, ConfigFormat::Json]
            .map(|format| format!("{stem}.sync.{}", format.extension()));

        let mut dirs = vec![media.parent().unwrap_or(Path::new("")).to_path_buf()];
        if let Some(dir) = &self.sync_dir {
            dirs.push(dir.clone());
        }

        dirs.iter()
            .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
            .collect()
    }

    /// First existing candidate
    pub fn locate(&self, media: &Path) -> Option<PathBuf> {
        self.candidates(media).into_iter().find(|p| p.is_file())
    }
}

impl SyncFileProvider for FileSyncProvider {
    fn load(&self, media: &Path) -> Result<Option<SyncFile>, ContractError> {
        match self.locate(media) {
            Some(path) => {
                debug!(sync_file = %path.display(), "sync file found");
                load_sync_file(&path).map(Some)
            }
            None => Ok(None),
        }
    }
}

/// Read and parse a sync file, format from its extension
pub fn load_sync_file(path: &Path) -> Result<SyncFile, ContractError> {
    let format = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(ConfigFormat::from_extension)
        .ok_or_else(|| {
            ContractError::invalid_sync_file(path.display().to_string(), "unsupported extension")
        })?;
    let content = std::fs::read_to_string(path)?;
    parser::parse(&content, format).map_err(|e| {
        ContractError::invalid_sync_file(path.display().to_string(), e.to_string())
    })
}
