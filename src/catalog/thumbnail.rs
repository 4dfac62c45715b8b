use moka::sync::Cache;

use super::{Preview, TargetSize};

/// Size of grid thumbnails (square, aspect-fill)
pub const THUMBNAIL_SIZE: u32 = 300;

/// Longest side of a fullscreen render
pub const FULLSCREEN_MAX_DIMENSION: u32 = 4096;

/// Default number of previews kept in memory
pub const DEFAULT_CACHE_CAPACITY: u64 = 1000;

/// Capacity-limited cache of rendered previews keyed by asset id
///
/// Eviction order is left to the cache; only the capacity bound is
/// guaranteed. Cloning shares the same underlying storage.
#[derive(Clone)]
pub struct BoundedImageCache {
    cache: Cache<String, Preview>,
    capacity: u64,
}

impl BoundedImageCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(capacity).build(),
            capacity,
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Return the cached preview for `id`, if any
    pub fn get(&self, id: &str) -> Option<Preview> {
        self.cache.get(id)
    }

    /// Return the cached preview, rendering and caching it on a miss
    ///
    /// A render that yields nothing is not cached, so the next call tries again.
    pub fn get_or_fetch<F>(&self, id: &str, render: F) -> Option<Preview>
    where
        F: FnOnce() -> Option<Preview>,
    {
        if let Some(hit) = self.cache.get(id) {
            return Some(hit);
        }

        let rendered = render()?;
        self.cache.insert(id.to_string(), rendered.clone());
        Some(rendered)
    }

    /// Drop every cached preview (full catalog refresh)
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
        tracing::debug!("Preview cache invalidated");
    }

    /// Approximate number of cached previews
    pub fn len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for BoundedImageCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for BoundedImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedImageCache")
            .field("capacity", &self.capacity)
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

/// Scale a pixel size down so its longer side is at most `max_dimension`
///
/// Aspect ratio is preserved and sizes already inside the bound are kept.
/// An unknown size (either side 0) asks for a square `max_dimension` box.
pub fn fit_within(width: u32, height: u32, max_dimension: u32) -> TargetSize {
    if width == 0 || height == 0 {
        return TargetSize::square(max_dimension);
    }

    let longest = width.max(height);
    if longest <= max_dimension {
        return TargetSize { width, height };
    }

    let scale = max_dimension as f64 / longest as f64;
    TargetSize {
        width: ((width as f64 * scale).round() as u32).max(1),
        height: ((height as f64 * scale).round() as u32).max(1),
    }
}
