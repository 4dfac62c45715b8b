//! Folder-backed catalog
//!
//! Presents a directory tree of photos and videos as a catalog. Asset ids
//! are paths relative to the root, capture time is the file modification
//! time, and previews are decoded and resized with the `image` crate.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use image::imageops::FilterType;
use image::DynamicImage;
use walkdir::WalkDir;

use super::{AssetResource, CatalogService, FillMode, Preview, ResourceSource, TargetSize};
use crate::error::{Error, Result};
use crate::state::data::{AuthorizationState, MediaAsset};

/// Supported still image extensions (common formats plus camera RAW)
const PHOTO_EXTENSIONS: [&str; 26] = [
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "tif", "tiff", "heic", "heif",
    "nef", "dng", "cr2", "cr3", "arw", "raf", "orf", "rw2",
    "pef", "srw", "erf", "kdc", "dcr", "mos", "raw", "rwl",
];

/// Supported video extensions
const VIDEO_EXTENSIONS: [&str; 6] = ["mov", "mp4", "m4v", "avi", "mkv", "webm"];

/// A catalog over every supported media file below `root`
///
/// Only image headers are read, so videos report a duration of 0 and an
/// unknown pixel size. A duration sort over a folder library therefore
/// leaves clips in catalog order, and every clip shows as `0:00`.
#[derive(Debug, Clone)]
pub struct FolderCatalog {
    root: PathBuf,
}

impl FolderCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of an asset id
    fn path_of(&self, asset: &MediaAsset) -> PathBuf {
        self.root.join(&asset.id)
    }

    /// Decode a still image and fit it into `target`
    fn render(&self, asset: &MediaAsset, target: TargetSize, mode: FillMode) -> Result<DynamicImage> {
        let img = image::open(self.path_of(asset))?;

        Ok(match mode {
            FillMode::AspectFill => img.resize_to_fill(target.width, target.height, FilterType::Lanczos3),
            FillMode::AspectFit if img.width() > target.width || img.height() > target.height => {
                img.resize(target.width, target.height, FilterType::Lanczos3)
            }
            FillMode::AspectFit => img,
        })
    }

    /// Build an asset for one file, or `None` if it is not a media file
    fn asset_for(&self, path: &Path) -> Option<MediaAsset> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        let is_video = if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            true
        } else if PHOTO_EXTENSIONS.contains(&ext.as_str()) {
            false
        } else {
            return None;
        };

        let id = path
            .strip_prefix(&self.root)
            .ok()?
            .to_string_lossy()
            .replace('\\', "/");

        let capture_time = fs::metadata(path)
            .and_then(|md| md.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        // Header-only read; RAW and video files fall back to unknown size
        let (pixel_width, pixel_height) = if is_video {
            (0, 0)
        } else {
            image::image_dimensions(path).unwrap_or((0, 0))
        };

        Some(MediaAsset {
            id,
            capture_time,
            is_video,
            duration: 0.0,
            pixel_width,
            pixel_height,
            location: None,
        })
    }
}

impl CatalogService for FolderCatalog {
    fn authorization_status(&self) -> AuthorizationState {
        match fs::read_dir(&self.root) {
            Ok(_) => AuthorizationState::Authorized,
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => AuthorizationState::Denied,
            Err(_) => AuthorizationState::Restricted,
        }
    }

    fn list_assets(&self) -> Result<Vec<MediaAsset>> {
        if !self.root.is_dir() {
            return Err(Error::InvalidArgument(format!(
                "library root is not a directory: {}",
                self.root.display()
            )));
        }

        tracing::info!("Scanning library folder {}", self.root.display());

        let mut assets: Vec<MediaAsset> = WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| self.asset_for(e.path()))
            .collect();

        // Catalog contract: newest capture first, unknown dates last
        assets.sort_by(|a, b| b.capture_time.cmp(&a.capture_time).then_with(|| a.id.cmp(&b.id)));

        tracing::info!("Found {} media files", assets.len());
        Ok(assets)
    }

    fn request_image(&self, asset: &MediaAsset, target: TargetSize, mode: FillMode) -> Option<Preview> {
        if asset.is_video {
            return None;
        }

        match self.render(asset, target, mode) {
            Ok(rendered) => Some(Arc::new(rendered)),
            Err(e) => {
                tracing::debug!("Cannot render {}: {}", asset.id, e);
                None
            }
        }
    }

    fn resolve_resource(&self, asset: &MediaAsset) -> Option<AssetResource> {
        let path = self.path_of(asset);
        if !path.is_file() {
            return None;
        }

        let original_filename = path.file_name()?.to_string_lossy().to_string();
        Some(AssetResource {
            original_filename,
            source: ResourceSource::File(path),
        })
    }

    fn file_size(&self, asset: &MediaAsset) -> Result<u64> {
        Ok(fs::metadata(self.path_of(asset))?.len())
    }
}
