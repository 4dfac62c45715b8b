//! Configuration for mediagrid
//!
//! Settings are stored as JSON in the user's config directory. Every field
//! has a default, so a missing file or a partial file both work.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::thumbnail::{DEFAULT_CACHE_CAPACITY, FULLSCREEN_MAX_DIMENSION, THUMBNAIL_SIZE};
use crate::error::{Error, Result};
use crate::state::library::SqliteMetadataStore;
use crate::state::sync::DEFAULT_BATCH_SIZE;

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Folder shown by the folder-backed catalog
    pub library_root: Option<PathBuf>,
    /// Metadata database location (platform data dir when unset)
    pub database_path: Option<PathBuf>,
    /// Maximum number of thumbnails kept in memory
    pub thumbnail_cache_capacity: u64,
    /// Side length of square grid thumbnails
    pub thumbnail_size: u32,
    /// Longest side of a fullscreen render
    pub fullscreen_max_dimension: u32,
    /// Inserts between commits during metadata sync
    pub sync_batch_size: usize,
    /// Default tracing filter (overridden by `RUST_LOG`)
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            library_root: None,
            database_path: None,
            thumbnail_cache_capacity: DEFAULT_CACHE_CAPACITY,
            thumbnail_size: THUMBNAIL_SIZE,
            fullscreen_max_dimension: FULLSCREEN_MAX_DIMENSION,
            sync_batch_size: DEFAULT_BATCH_SIZE,
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// Get the path to the default settings file
    ///
    /// Returns `None` if the system config directory cannot be determined.
    pub fn default_path() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join("mediagrid").join("settings.json"))
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load settings from `path`
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };

        let settings: Settings = serde_json::from_str(&text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Write settings to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Reject values no component can work with
    pub fn validate(&self) -> Result<()> {
        if self.sync_batch_size == 0 {
            return Err(Error::InvalidArgument("sync_batch_size must be at least 1".into()));
        }
        if self.thumbnail_size == 0 || self.fullscreen_max_dimension == 0 {
            return Err(Error::InvalidArgument("render sizes must be positive".into()));
        }
        Ok(())
    }

    /// Configured database path, or the platform default
    pub fn resolved_database_path(&self) -> Option<PathBuf> {
        self.database_path
            .clone()
            .or_else(SqliteMetadataStore::default_path)
    }
}
