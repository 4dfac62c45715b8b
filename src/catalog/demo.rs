//! Demo catalog with synthetic assets
//!
//! Used for screenshots and offline runs. Every asset renders as a colour
//! gradient and exports as a PNG of that gradient, so the whole pipeline can
//! be exercised without a real library.

use std::io::Cursor;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use super::{AssetResource, CatalogService, FillMode, Preview, ResourceSource, TargetSize};
use crate::error::{Error, Result};
use crate::state::data::{AuthorizationState, GeoPoint, MediaAsset};

/// Number of synthetic assets
pub const DEMO_ASSET_COUNT: usize = 24;

const WIDTHS: [u32; 6] = [4032, 3024, 4000, 3840, 2048, 5472];
const HEIGHTS: [u32; 6] = [3024, 4032, 3000, 2160, 1536, 3648];

/// Start/end colours of the preview gradients
const PALETTES: [([u8; 3], [u8; 3]); 8] = [
    ([250, 153, 115], [217, 89, 140]),
    ([102, 186, 224], [56, 107, 184]),
    ([191, 158, 230], [128, 97, 191]),
    ([140, 224, 191], [77, 173, 166]),
    ([250, 209, 115], [235, 140, 89]),
    ([140, 199, 242], [97, 140, 209]),
    ([158, 204, 148], [97, 153, 107]),
    ([242, 148, 166], [204, 89, 122]),
];

/// A few places to scatter the demo assets over
const PLACES: [GeoPoint; 3] = [
    GeoPoint { latitude: 48.1374, longitude: 11.5755 },
    GeoPoint { latitude: 37.7749, longitude: -122.4194 },
    GeoPoint { latitude: 35.6762, longitude: 139.6503 },
];

/// Side length of exported demo originals
const EXPORT_SIDE: u32 = 512;

/// Catalog serving a fixed set of synthetic photos and videos
#[derive(Debug, Clone)]
pub struct DemoCatalog {
    assets: Vec<MediaAsset>,
}

impl DemoCatalog {
    pub fn new() -> Self {
        Self {
            assets: generate_assets(),
        }
    }

    fn index_of(&self, asset: &MediaAsset) -> Option<usize> {
        self.assets.iter().position(|a| a.id == asset.id)
    }

    /// Encode the gradient for `asset` as a PNG original
    fn encode_original(&self, asset: &MediaAsset) -> Result<AssetResource> {
        let index = self
            .index_of(asset)
            .ok_or_else(|| Error::ResourceUnavailable(asset.id.clone()))?;

        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(gradient_image(EXPORT_SIDE, EXPORT_SIDE, index))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;

        Ok(AssetResource {
            original_filename: format!("{}.png", asset.id),
            source: ResourceSource::Bytes(Arc::new(bytes)),
        })
    }
}

impl Default for DemoCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the synthetic asset list, newest first
///
/// Assets are six hours apart starting at 2025-12-15 00:00 UTC; every fifth
/// asset is a video lasting `(i + 1) * 7` seconds.
pub fn generate_assets() -> Vec<MediaAsset> {
    let base: DateTime<Utc> = Utc
        .with_ymd_and_hms(2025, 12, 15, 0, 0, 0)
        .single()
        .unwrap_or_default();

    (0..DEMO_ASSET_COUNT)
        .map(|i| {
            let is_video = i % 5 == 0;
            MediaAsset {
                id: format!("demo-asset-{i}"),
                capture_time: Some(base - Duration::hours(i as i64 * 6)),
                is_video,
                duration: if is_video { ((i + 1) * 7) as f64 } else { 0.0 },
                pixel_width: WIDTHS[i % WIDTHS.len()],
                pixel_height: HEIGHTS[i % HEIGHTS.len()],
                location: (i % 4 == 0).then(|| PLACES[i % PLACES.len()]),
            }
        })
        .collect()
}

/// Render the gradient for asset number `index`
pub fn gradient_image(width: u32, height: u32, index: usize) -> RgbaImage {
    let (start, end) = PALETTES[index % PALETTES.len()];
    let angle = ((index % 6) as f64 * 60.0).to_radians();
    let (dx, dy) = (angle.cos(), angle.sin());
    let span = (dx.abs() * width as f64 + dy.abs() * height as f64).max(1.0);

    RgbaImage::from_fn(width.max(1), height.max(1), |x, y| {
        let cx = x as f64 - width as f64 / 2.0;
        let cy = y as f64 - height as f64 / 2.0;
        let t = ((cx * dx + cy * dy) / span + 0.5).clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgba([mix(start[0], end[0]), mix(start[1], end[1]), mix(start[2], end[2]), 255])
    })
}

impl CatalogService for DemoCatalog {
    fn authorization_status(&self) -> AuthorizationState {
        AuthorizationState::Authorized
    }

    fn list_assets(&self) -> Result<Vec<MediaAsset>> {
        Ok(self.assets.clone())
    }

    fn request_image(&self, asset: &MediaAsset, target: TargetSize, _mode: FillMode) -> Option<Preview> {
        let index = self.index_of(asset)?;
        let image = gradient_image(target.width, target.height, index);
        Some(Arc::new(DynamicImage::ImageRgba8(image)))
    }

    fn resolve_resource(&self, asset: &MediaAsset) -> Option<AssetResource> {
        match self.encode_original(asset) {
            Ok(resource) => Some(resource),
            Err(e) => {
                tracing::debug!("No demo original for {}: {}", asset.id, e);
                None
            }
        }
    }

    fn file_size(&self, asset: &MediaAsset) -> Result<u64> {
        let index = self
            .index_of(asset)
            .ok_or_else(|| Error::Catalog(format!("unknown demo asset {}", asset.id)))?;
        // Roughly what a camera JPEG or a short clip would weigh
        let pixels = asset.pixel_width as u64 * asset.pixel_height as u64;
        let base = if asset.is_video {
            (asset.duration * 4_000_000.0) as u64
        } else {
            pixels / 4
        };
        Ok(base + index as u64 * 1_000)
    }
}
