//! External catalog boundary
//!
//! This module handles:
//! - The contract every catalog backend implements (listing, rendering, exporting)
//! - A folder-backed catalog for real libraries on disk
//! - A demo catalog with synthetic assets
//! - The bounded preview cache shared by grid thumbnails

pub mod demo;
pub mod folder;
pub mod thumbnail;

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;

use crate::error::{Error, Result};
use crate::state::data::{AuthorizationState, MediaAsset};

/// A rendered preview, shared between the cache and its readers
pub type Preview = Arc<DynamicImage>;

/// Requested render size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub const fn square(side: u32) -> Self {
        Self { width: side, height: side }
    }
}

/// How a render is fitted into its target size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMode {
    /// Scale to fit entirely inside the target, preserving aspect
    AspectFit,
    /// Scale to cover the target and crop the overflow
    AspectFill,
}

/// Where the bytes of an exportable resource come from
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceSource {
    /// The original file on disk
    File(PathBuf),
    /// Bytes produced by the catalog itself
    Bytes(Arc<Vec<u8>>),
}

/// An exportable original for one asset
#[derive(Debug, Clone, PartialEq)]
pub struct AssetResource {
    /// Filename the catalog reports for the original (used as export name)
    pub original_filename: String,
    pub source: ResourceSource,
}

/// The external media catalog
///
/// All methods may block (disk or network); callers run them on blocking
/// workers, never on the state owner.
pub trait CatalogService: Send + Sync {
    /// Current access level, without prompting
    fn authorization_status(&self) -> AuthorizationState;

    /// Ask for access; may prompt the user
    fn request_authorization(&self) -> AuthorizationState {
        self.authorization_status()
    }

    /// All assets, newest capture first
    fn list_assets(&self) -> Result<Vec<MediaAsset>>;

    /// Render a preview of `asset`, or `None` if it cannot be rendered
    fn request_image(&self, asset: &MediaAsset, target: TargetSize, mode: FillMode) -> Option<Preview>;

    /// Resolve the exportable original of `asset`
    fn resolve_resource(&self, asset: &MediaAsset) -> Option<AssetResource>;

    /// Size of the original resource in bytes
    fn file_size(&self, asset: &MediaAsset) -> Result<u64>;

    /// Write `resource` to `destination`, which must not exist yet
    fn write_resource(&self, resource: &AssetResource, destination: &Path) -> Result<()> {
        write_new_file(resource, destination)
    }
}

/// Copy a resource into a newly created file
///
/// The destination is opened with `create_new`, so an existing file is never
/// overwritten. A partially written file is removed again on failure.
pub fn write_new_file(resource: &AssetResource, destination: &Path) -> Result<()> {
    let mut out = match OpenOptions::new().write(true).create_new(true).open(destination) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(Error::DestinationExists(destination.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    let written = match &resource.source {
        ResourceSource::File(path) => {
            File::open(path).and_then(|mut src| io::copy(&mut src, &mut out).map(|_| ()))
        }
        ResourceSource::Bytes(bytes) => out.write_all(bytes),
    }
    .and_then(|_| out.sync_all());

    if let Err(e) = written {
        drop(out);
        let _ = fs::remove_file(destination);
        return Err(e.into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_new_file_from_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.png");
        let resource = AssetResource {
            original_filename: "a.png".into(),
            source: ResourceSource::Bytes(Arc::new(b"pixels".to_vec())),
        };

        write_new_file(&resource, &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"pixels");
    }

    #[test]
    fn test_write_new_file_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.png");
        fs::write(&dest, b"original").unwrap();
        let resource = AssetResource {
            original_filename: "a.png".into(),
            source: ResourceSource::Bytes(Arc::new(b"new".to_vec())),
        };

        let result = write_new_file(&resource, &dest);
        assert!(matches!(result, Err(Error::DestinationExists(_))));
        assert_eq!(fs::read(&dest).unwrap(), b"original");
    }

    #[test]
    fn test_write_new_file_cleans_up_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("copy.jpg");
        let resource = AssetResource {
            original_filename: "copy.jpg".into(),
            source: ResourceSource::File(dir.path().join("missing.jpg")),
        };

        assert!(write_new_file(&resource, &dest).is_err());
        assert!(!dest.exists());
    }
}
