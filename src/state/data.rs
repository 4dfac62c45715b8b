//! Shared data structures for the application state
//!
//! These structs represent the data model that flows between
//! the catalog service, the metadata database and the grid state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A geographic coordinate reported by the catalog
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Represents a single item as reported by the external catalog
///
/// Assets are not owned by us: the whole list is re-fetched on every
/// catalog refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaAsset {
    /// Stable identifier assigned by the catalog
    pub id: String,
    /// Capture time, if the catalog knows it
    pub capture_time: Option<DateTime<Utc>>,
    pub is_video: bool,
    /// Playback length in seconds (0.0 for photos)
    pub duration: f64,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub location: Option<GeoPoint>,
}

impl MediaAsset {
    /// Create a photo asset with no location and unknown dimensions
    pub fn photo(id: impl Into<String>, capture_time: Option<DateTime<Utc>>) -> Self {
        Self {
            id: id.into(),
            capture_time,
            is_video: false,
            duration: 0.0,
            pixel_width: 0,
            pixel_height: 0,
            location: None,
        }
    }

    /// Create a video asset with the given duration in seconds
    pub fn video(id: impl Into<String>, capture_time: Option<DateTime<Utc>>, duration: f64) -> Self {
        Self {
            is_video: true,
            duration,
            ..Self::photo(id, capture_time)
        }
    }
}

/// Cached expensive-to-compute facts about one asset
///
/// Records are created once when an asset is first seen and deleted when
/// the asset disappears from the catalog. They are never updated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRecord {
    /// Asset identifier (unique key)
    pub id: String,
    /// Size of the original resource in bytes (0 when it could not be resolved)
    pub file_size: u64,
    pub capture_time: Option<DateTime<Utc>>,
    pub duration: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl MetadataRecord {
    /// Build the record for a newly seen asset
    pub fn from_asset(asset: &MediaAsset, file_size: u64) -> Self {
        Self {
            id: asset.id.clone(),
            file_size,
            capture_time: asset.capture_time,
            duration: asset.duration,
            latitude: asset.location.map(|p| p.latitude),
            longitude: asset.location.map(|p| p.longitude),
        }
    }
}

// ========== View parameters ==========

/// Which media types are shown in the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MediaFilter {
    #[default]
    All,
    PhotosOnly,
    VideosOnly,
}

impl MediaFilter {
    /// Whether an asset passes this filter
    pub fn matches(self, asset: &MediaAsset) -> bool {
        match self {
            MediaFilter::All => true,
            MediaFilter::PhotosOnly => !asset.is_video,
            MediaFilter::VideosOnly => asset.is_video,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MediaFilter::All => "All",
            MediaFilter::PhotosOnly => "Photos",
            MediaFilter::VideosOnly => "Videos",
        }
    }
}

/// The attribute the grid is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortKey {
    #[default]
    CaptureTime,
    Duration,
    FileSize,
}

impl SortKey {
    pub fn label(self) -> &'static str {
        match self {
            SortKey::CaptureTime => "Date",
            SortKey::Duration => "Duration",
            SortKey::FileSize => "File Size",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Filter and sort settings that together determine the visible order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewParams {
    pub filter: MediaFilter,
    pub sort_key: SortKey,
    pub direction: SortDirection,
}

impl ViewParams {
    /// True when the delivered catalog order already satisfies the request
    pub fn is_catalog_order(&self) -> bool {
        self.sort_key == SortKey::CaptureTime && self.direction == SortDirection::Descending
    }
}

// ========== Outcomes ==========

/// Result of one export run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportOutcome {
    pub success: usize,
    pub failure: usize,
    pub skipped: usize,
}

impl ExportOutcome {
    /// Number of items processed so far
    pub fn processed(&self) -> usize {
        self.success + self.failure + self.skipped
    }
}

/// Access level granted to the external catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthorizationState {
    #[default]
    NotDetermined,
    Authorized,
    Limited,
    Denied,
    Restricted,
}

impl AuthorizationState {
    /// Whether the catalog may be listed
    pub fn allows_access(self) -> bool {
        matches!(self, AuthorizationState::Authorized | AuthorizationState::Limited)
    }
}

// ========== Display helpers ==========

/// Format a video duration as `m:ss`
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// Format a byte count the way a file browser does (1000-based units)
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1000 {
        return format!("{} bytes", bytes);
    }

    let mut value = bytes as f64 / 1000.0;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }

    if value >= 100.0 || unit == 0 {
        format!("{:.0} {}", value, UNITS[unit])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Format a capture date as `MM/DD/YYYY`
pub fn format_capture_date(time: &DateTime<Utc>) -> String {
    time.format("%m/%d/%Y").to_string()
}
