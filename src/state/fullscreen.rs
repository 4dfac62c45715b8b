//! Fullscreen viewing of one asset at a time

use crate::catalog::thumbnail::fit_within;
use crate::catalog::{FillMode, Preview, TargetSize};

use super::data::MediaAsset;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// A render to perform for the fullscreen item
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub id: String,
    pub asset: MediaAsset,
    pub target: TargetSize,
    pub mode: FillMode,
}

/// Tracks the fullscreen item and its rendered image
#[derive(Debug, Clone, Default)]
pub struct FullscreenNavigator {
    current: Option<String>,
    image: Option<Preview>,
    loading: bool,
}

impl FullscreenNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn image(&self) -> Option<&Preview> {
        self.image.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// Show `id`; the image itself is fetched by a separate load
    pub fn open(&mut self, id: impl Into<String>) {
        self.current = Some(id.into());
        self.image = None;
        self.loading = true;
    }

    pub fn close(&mut self) {
        self.current = None;
        self.image = None;
        self.loading = false;
    }

    /// Build the render request for the current item
    ///
    /// Returns `None` (and stops loading) when nothing is open or the item
    /// is no longer in the visible order.
    pub fn begin_load(&mut self, visible: &[MediaAsset], max_dimension: u32) -> Option<ImageRequest> {
        let id = self.current.as_deref()?;
        let Some(asset) = visible.iter().find(|a| a.id == id) else {
            self.loading = false;
            return None;
        };

        Some(ImageRequest {
            id: asset.id.clone(),
            asset: asset.clone(),
            target: fit_within(asset.pixel_width, asset.pixel_height, max_dimension),
            mode: FillMode::AspectFit,
        })
    }

    /// Apply a finished render for `id`
    ///
    /// The image is only kept if `id` is still the current item; loading
    /// stops either way. Returns whether the image was applied.
    pub fn finish_load(&mut self, id: &str, image: Option<Preview>) -> bool {
        self.loading = false;
        if self.current.as_deref() != Some(id) {
            tracing::debug!("Dropping fullscreen render for {} after navigation", id);
            return false;
        }
        self.image = image;
        true
    }

    /// Open the neighbour of the current item in `order`
    ///
    /// Returns the newly opened id, or `None` when nothing is open or the
    /// current item is not in `order`.
    pub fn navigate<S: AsRef<str>>(&mut self, direction: Direction, order: &[S]) -> Option<String> {
        let current = self.current.as_deref()?;
        let next = neighbor(order, current, direction)?.to_string();
        self.open(next.clone());
        Some(next)
    }
}

/// The id after (or before) `current` in `order`, wrapping around the ends
pub fn neighbor<'a, S: AsRef<str>>(order: &'a [S], current: &str, direction: Direction) -> Option<&'a str> {
    let index = order.iter().position(|id| id.as_ref() == current)?;
    let len = order.len();
    let target = match direction {
        Direction::Next => (index + 1) % len,
        Direction::Previous => (index + len - 1) % len,
    };
    Some(order[target].as_ref())
}
