use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the grid core can report.
///
/// Listing and storage failures abort the run that hit them. Per-item
/// failures (file size, resource, write) are tallied by the caller and only
/// show up here when a collaborator reports them.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("settings error: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("metadata database schema v{found} is newer than supported v{supported}")]
    UnsupportedSchema { found: i64, supported: i64 },

    #[error("no exportable resource for asset {0}")]
    ResourceUnavailable(String),

    #[error("destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
