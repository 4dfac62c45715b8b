//! Filter/sort pipeline with generation-gated background sorting
//!
//! `recompute` publishes the filtered sequence at once and, unless the
//! catalog order already satisfies the request, hands back a [`SortJob`]
//! for a worker. The worker's result is only applied if no newer recompute
//! happened in the meantime.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::data::{MediaAsset, MediaFilter, MetadataRecord, SortDirection, SortKey, ViewParams};

/// Read-only id -> record lookup published by the sync engine
pub type MetadataLookup = Arc<HashMap<String, MetadataRecord>>;

/// A background sort captured at a specific generation
#[derive(Debug, Clone)]
pub struct SortJob {
    pub generation: u64,
    pub sort_key: SortKey,
    pub direction: SortDirection,
    assets: Vec<MediaAsset>,
    metadata: MetadataLookup,
}

impl SortJob {
    /// Sort the captured assets; meant to run on a worker
    pub fn run(self) -> (u64, Vec<MediaAsset>) {
        let mut assets = self.assets;
        sort_assets(&mut assets, self.sort_key, self.direction, &self.metadata);
        (self.generation, assets)
    }
}

/// Derives the visible order from the catalog, filter and sort settings
#[derive(Debug, Default)]
pub struct FilterSortPipeline {
    params: ViewParams,
    generation: u64,
    visible: Arc<Vec<MediaAsset>>,
}

impl FilterSortPipeline {
    pub fn new(params: ViewParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn params(&self) -> ViewParams {
        self.params
    }

    pub fn set_filter(&mut self, filter: MediaFilter) {
        self.params.filter = filter;
    }

    pub fn set_sort_key(&mut self, key: SortKey) {
        self.params.sort_key = key;
    }

    pub fn set_direction(&mut self, direction: SortDirection) {
        self.params.direction = direction;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The currently published visible order
    pub fn visible(&self) -> &Arc<Vec<MediaAsset>> {
        &self.visible
    }

    /// Ids of the visible order
    pub fn visible_ids(&self) -> Vec<&str> {
        self.visible.iter().map(|a| a.id.as_str()).collect()
    }

    /// Publish the filtered catalog and return the sort still to be done
    ///
    /// The generation advances on every call, including when no sort is
    /// needed, so a sort started earlier can never land afterwards.
    pub fn recompute(&mut self, catalog: &[MediaAsset], metadata: &MetadataLookup) -> Option<SortJob> {
        let filter = self.params.filter;
        let filtered: Vec<MediaAsset> = catalog.iter().filter(|a| filter.matches(a)).cloned().collect();

        self.generation += 1;

        if self.params.is_catalog_order() {
            self.visible = Arc::new(filtered);
            return None;
        }

        self.visible = Arc::new(filtered.clone());
        Some(SortJob {
            generation: self.generation,
            sort_key: self.params.sort_key,
            direction: self.params.direction,
            assets: filtered,
            metadata: Arc::clone(metadata),
        })
    }

    /// Publish a finished sort if it is still current
    ///
    /// Returns `false` (and drops the result) when a newer recompute has
    /// superseded `generation`.
    pub fn apply(&mut self, generation: u64, sorted: Vec<MediaAsset>) -> bool {
        if generation != self.generation {
            tracing::debug!(
                "Discarding stale sort result (generation {} != {})",
                generation,
                self.generation
            );
            return false;
        }

        self.visible = Arc::new(sorted);
        true
    }
}

/// Missing capture times sort as the earliest possible instant
const UNKNOWN_CAPTURE_TIME: DateTime<Utc> = DateTime::<Utc>::MIN_UTC;

/// Natural (ascending) order of two assets under `key`
///
/// - capture time: missing values are the earliest instant
/// - duration: numeric, total order over floats
/// - file size: from the metadata lookup, missing records count as 0 bytes
pub fn compare_assets(
    a: &MediaAsset,
    b: &MediaAsset,
    key: SortKey,
    metadata: &HashMap<String, MetadataRecord>,
) -> Ordering {
    match key {
        SortKey::CaptureTime => a
            .capture_time
            .unwrap_or(UNKNOWN_CAPTURE_TIME)
            .cmp(&b.capture_time.unwrap_or(UNKNOWN_CAPTURE_TIME)),
        SortKey::Duration => a.duration.total_cmp(&b.duration),
        SortKey::FileSize => file_size(metadata, &a.id).cmp(&file_size(metadata, &b.id)),
    }
}

fn file_size(metadata: &HashMap<String, MetadataRecord>, id: &str) -> u64 {
    metadata.get(id).map_or(0, |r| r.file_size)
}

/// Stable sort: ties keep their catalog order in both directions
pub fn sort_assets(
    assets: &mut [MediaAsset],
    key: SortKey,
    direction: SortDirection,
    metadata: &HashMap<String, MetadataRecord>,
) {
    match direction {
        SortDirection::Ascending => assets.sort_by(|a, b| compare_assets(a, b, key, metadata)),
        SortDirection::Descending => assets.sort_by(|a, b| compare_assets(b, a, key, metadata)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2025, 1, 1, hour, 0, 0).unwrap())
    }

    /// Newest first, as the catalog delivers it
    fn catalog() -> Vec<MediaAsset> {
        vec![
            MediaAsset::video("v1", at(20), 30.0),
            MediaAsset::photo("p1", at(18)),
            MediaAsset::video("v2", at(12), 5.0),
            MediaAsset::photo("p2", at(9)),
            MediaAsset::photo("p3", None),
        ]
    }

    fn sizes(pairs: &[(&str, u64)]) -> MetadataLookup {
        Arc::new(
            pairs
                .iter()
                .map(|(id, size)| {
                    let asset = MediaAsset::photo(*id, None);
                    (id.to_string(), MetadataRecord::from_asset(&asset, *size))
                })
                .collect(),
        )
    }

    fn ids(assets: &[MediaAsset]) -> Vec<&str> {
        assets.iter().map(|a| a.id.as_str()).collect()
    }

    fn run_to_completion(pipeline: &mut FilterSortPipeline, metadata: &MetadataLookup) {
        if let Some(job) = pipeline.recompute(&catalog(), metadata) {
            let (generation, sorted) = job.run();
            assert!(pipeline.apply(generation, sorted));
        }
    }

    #[test]
    fn test_date_descending_needs_no_sort() {
        let mut pipeline = FilterSortPipeline::default();
        let job = pipeline.recompute(&catalog(), &sizes(&[]));

        assert!(job.is_none());
        assert_eq!(ids(pipeline.visible()), vec!["v1", "p1", "v2", "p2", "p3"]);
    }

    #[test]
    fn test_filter_preserves_catalog_order() {
        let mut pipeline = FilterSortPipeline::default();
        pipeline.set_filter(MediaFilter::PhotosOnly);
        pipeline.recompute(&catalog(), &sizes(&[]));
        assert_eq!(ids(pipeline.visible()), vec!["p1", "p2", "p3"]);

        pipeline.set_filter(MediaFilter::VideosOnly);
        pipeline.recompute(&catalog(), &sizes(&[]));
        assert_eq!(ids(pipeline.visible()), vec!["v1", "v2"]);
    }

    #[test]
    fn test_unsorted_sequence_is_published_before_sort() {
        let mut pipeline = FilterSortPipeline::default();
        pipeline.set_direction(SortDirection::Ascending);

        let job = pipeline.recompute(&catalog(), &sizes(&[])).unwrap();
        assert_eq!(ids(pipeline.visible()), vec!["v1", "p1", "v2", "p2", "p3"]);

        let (generation, sorted) = job.run();
        assert!(pipeline.apply(generation, sorted));
        assert_eq!(ids(pipeline.visible()), vec!["p3", "p2", "v2", "p1", "v1"]);
    }

    #[test]
    fn test_missing_capture_time_is_earliest() {
        let mut pipeline = FilterSortPipeline::default();
        pipeline.set_direction(SortDirection::Ascending);
        run_to_completion(&mut pipeline, &sizes(&[]));

        assert_eq!(pipeline.visible()[0].id, "p3");
    }

    #[test]
    fn test_duration_sort() {
        let mut pipeline = FilterSortPipeline::default();
        pipeline.set_sort_key(SortKey::Duration);
        run_to_completion(&mut pipeline, &sizes(&[]));

        // Photos all last 0s and keep their catalog order
        assert_eq!(ids(pipeline.visible()), vec!["v1", "v2", "p1", "p2", "p3"]);

        pipeline.set_direction(SortDirection::Ascending);
        run_to_completion(&mut pipeline, &sizes(&[]));
        assert_eq!(ids(pipeline.visible()), vec!["p1", "p2", "p3", "v2", "v1"]);
    }

    #[test]
    fn test_file_size_sort_uses_lookup() {
        let metadata = sizes(&[("p1", 500), ("v1", 9_000), ("p2", 10)]);
        let mut pipeline = FilterSortPipeline::default();
        pipeline.set_sort_key(SortKey::FileSize);
        run_to_completion(&mut pipeline, &metadata);

        // v2 and p3 have no record and count as 0 bytes
        assert_eq!(ids(pipeline.visible()), vec!["v1", "p1", "p2", "v2", "p3"]);
    }

    #[test]
    fn test_stale_sort_is_discarded() {
        let metadata = sizes(&[("p1", 500), ("v1", 9_000), ("p2", 10)]);
        let mut pipeline = FilterSortPipeline::default();

        pipeline.set_sort_key(SortKey::FileSize);
        let first = pipeline.recompute(&catalog(), &metadata).unwrap();

        pipeline.set_sort_key(SortKey::Duration);
        pipeline.set_direction(SortDirection::Ascending);
        let second = pipeline.recompute(&catalog(), &metadata).unwrap();
        assert!(second.generation > first.generation);

        // The newer sort finishes first, the older one straggles in afterwards
        let (g2, sorted2) = second.run();
        assert!(pipeline.apply(g2, sorted2));
        let (g1, sorted1) = first.run();
        assert!(!pipeline.apply(g1, sorted1));

        assert_eq!(ids(pipeline.visible()), vec!["p1", "p2", "p3", "v2", "v1"]);
    }

    #[test]
    fn test_fast_path_supersedes_pending_sort() {
        let mut pipeline = FilterSortPipeline::default();
        pipeline.set_direction(SortDirection::Ascending);
        let pending = pipeline.recompute(&catalog(), &sizes(&[])).unwrap();

        pipeline.set_direction(SortDirection::Descending);
        assert!(pipeline.recompute(&catalog(), &sizes(&[])).is_none());

        let (generation, sorted) = pending.run();
        assert!(!pipeline.apply(generation, sorted));
        assert_eq!(ids(pipeline.visible()), vec!["v1", "p1", "v2", "p2", "p3"]);
    }

    #[test]
    fn test_generation_is_monotonic() {
        let mut pipeline = FilterSortPipeline::default();
        let mut last = pipeline.generation();
        for key in [SortKey::Duration, SortKey::CaptureTime, SortKey::FileSize] {
            pipeline.set_sort_key(key);
            pipeline.recompute(&catalog(), &sizes(&[]));
            assert!(pipeline.generation() > last);
            last = pipeline.generation();
        }
    }
}
