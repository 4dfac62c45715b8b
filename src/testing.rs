//! Testing utilities for mediagrid
//!
//! Fake collaborators for unit tests: a scripted catalog with per-asset
//! failure injection and an in-memory metadata store that counts writes.
//!
//! Only available when compiled with `cfg(test)`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{Duration, TimeZone, Utc};
use image::{DynamicImage, RgbaImage};

use crate::catalog::{write_new_file, AssetResource, CatalogService, FillMode, Preview, ResourceSource, TargetSize};
use crate::error::{Error, Result};
use crate::state::data::{AuthorizationState, MediaAsset, MetadataRecord};
use crate::state::library::MetadataStore;

/// Catalog whose contents and failures are scripted by the test
pub struct FakeCatalog {
    assets: Mutex<Vec<MediaAsset>>,
    sizes: HashMap<String, u64>,
    size_failures: HashSet<String>,
    size_panics: Mutex<HashSet<String>>,
    missing_resources: HashSet<String>,
    write_failures: HashSet<String>,
    fail_listing: bool,
    status: Mutex<AuthorizationState>,
    granted: AuthorizationState,
    image_requests: AtomicUsize,
    last_target: Mutex<Option<(TargetSize, FillMode)>>,
}

impl FakeCatalog {
    pub fn new(assets: Vec<MediaAsset>) -> Self {
        Self {
            assets: Mutex::new(assets),
            sizes: HashMap::new(),
            size_failures: HashSet::new(),
            size_panics: Mutex::new(HashSet::new()),
            missing_resources: HashSet::new(),
            write_failures: HashSet::new(),
            fail_listing: false,
            status: Mutex::new(AuthorizationState::Authorized),
            granted: AuthorizationState::Authorized,
            image_requests: AtomicUsize::new(0),
            last_target: Mutex::new(None),
        }
    }

    /// Photos with the given ids, newest first, one hour apart
    pub fn with_photos(ids: &[&str]) -> Self {
        Self::new(photos(ids))
    }

    pub fn with_size(mut self, id: &str, size: u64) -> Self {
        self.sizes.insert(id.to_string(), size);
        self
    }

    pub fn with_size_failure(mut self, id: &str) -> Self {
        self.size_failures.insert(id.to_string());
        self
    }

    /// The next size lookup for `id` panics (once)
    pub fn with_size_panic(self, id: &str) -> Self {
        self.size_panics.lock().unwrap().insert(id.to_string());
        self
    }

    pub fn without_resource(mut self, id: &str) -> Self {
        self.missing_resources.insert(id.to_string());
        self
    }

    pub fn with_write_failure(mut self, id: &str) -> Self {
        self.write_failures.insert(export_name(id));
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    /// Current status and the status a request would grant
    pub fn with_authorization(mut self, status: AuthorizationState, granted: AuthorizationState) -> Self {
        self.status = Mutex::new(status);
        self.granted = granted;
        self
    }

    pub fn assets(&self) -> Vec<MediaAsset> {
        self.assets.lock().unwrap().clone()
    }

    /// Replace the catalog contents (the next listing sees them)
    pub fn set_assets(&self, assets: Vec<MediaAsset>) {
        *self.assets.lock().unwrap() = assets;
    }

    pub fn image_requests(&self) -> usize {
        self.image_requests.load(Ordering::SeqCst)
    }

    pub fn last_target(&self) -> Option<(TargetSize, FillMode)> {
        *self.last_target.lock().unwrap()
    }
}

/// Photos with the given ids, newest first, one hour apart
pub fn photos(ids: &[&str]) -> Vec<MediaAsset> {
    let newest = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    ids.iter()
        .enumerate()
        .map(|(i, id)| MediaAsset::photo(*id, Some(newest - Duration::hours(i as i64))))
        .collect()
}

/// Filename the fake catalog reports for an asset's original
pub fn export_name(id: &str) -> String {
    format!("{id}.jpg")
}

impl CatalogService for FakeCatalog {
    fn authorization_status(&self) -> AuthorizationState {
        *self.status.lock().unwrap()
    }

    fn request_authorization(&self) -> AuthorizationState {
        *self.status.lock().unwrap() = self.granted;
        self.granted
    }

    fn list_assets(&self) -> Result<Vec<MediaAsset>> {
        if self.fail_listing {
            return Err(Error::Catalog("library unavailable".into()));
        }
        Ok(self.assets())
    }

    fn request_image(&self, _asset: &MediaAsset, target: TargetSize, mode: FillMode) -> Option<Preview> {
        self.image_requests.fetch_add(1, Ordering::SeqCst);
        *self.last_target.lock().unwrap() = Some((target, mode));
        Some(Arc::new(DynamicImage::ImageRgba8(RgbaImage::new(4, 3))))
    }

    fn resolve_resource(&self, asset: &MediaAsset) -> Option<AssetResource> {
        if self.missing_resources.contains(&asset.id) {
            return None;
        }
        Some(AssetResource {
            original_filename: export_name(&asset.id),
            source: ResourceSource::Bytes(Arc::new(asset.id.as_bytes().to_vec())),
        })
    }

    fn file_size(&self, asset: &MediaAsset) -> Result<u64> {
        if self.size_panics.lock().unwrap().remove(&asset.id) {
            panic!("size lookup for {} blew up", asset.id);
        }
        if self.size_failures.contains(&asset.id) {
            return Err(Error::Catalog(format!("no size for {}", asset.id)));
        }
        Ok(self.sizes.get(&asset.id).copied().unwrap_or(1))
    }

    fn write_resource(&self, resource: &AssetResource, destination: &Path) -> Result<()> {
        if self.write_failures.contains(&resource.original_filename) {
            return Err(Error::Io(std::io::Error::other("disk full")));
        }
        write_new_file(resource, destination)
    }
}

/// In-memory metadata store that records every write
///
/// Writes are pending until `commit`; `rollback` restores the last
/// committed state.
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    records: BTreeMap<String, MetadataRecord>,
    committed: BTreeMap<String, MetadataRecord>,
    fail_listing: bool,
    fail_insert_after: Option<usize>,
    fail_commit: bool,
    inserted: Vec<String>,
    deleted: Vec<String>,
    commits: usize,
    rollbacks: usize,
}

impl MemoryMetadataStore {
    /// Store pre-populated with one committed record per id
    pub fn with_ids(ids: &[&str]) -> Self {
        let mut store = Self::default();
        for id in ids {
            let record = MetadataRecord::from_asset(&MediaAsset::photo(*id, None), 1);
            store.records.insert(id.to_string(), record);
        }
        store.committed = store.records.clone();
        store
    }

    pub fn fail_listing(&mut self, fail: bool) {
        self.fail_listing = fail;
    }

    /// Inserts fail once `n` inserts have succeeded
    pub fn fail_insert_after(&mut self, n: usize) {
        self.fail_insert_after = Some(n);
    }

    pub fn fail_commit(&mut self, fail: bool) {
        self.fail_commit = fail;
    }

    /// Ids of the committed records, sorted
    pub fn committed_ids(&self) -> Vec<String> {
        self.committed.keys().cloned().collect()
    }

    pub fn rollback_count(&self) -> usize {
        self.rollbacks
    }

    pub fn record(&self, id: &str) -> Option<MetadataRecord> {
        self.records.get(id).cloned()
    }

    pub fn inserted_ids(&self) -> Vec<String> {
        self.inserted.clone()
    }

    /// Inserts plus deletes since creation
    pub fn write_count(&self) -> usize {
        self.inserted.len() + self.deleted.len()
    }

    pub fn commit_count(&self) -> usize {
        self.commits
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn list_records(&mut self) -> Result<Vec<MetadataRecord>> {
        if self.fail_listing {
            return Err(Error::Catalog("metadata store unreadable".into()));
        }
        Ok(self.records.values().cloned().collect())
    }

    fn insert(&mut self, record: &MetadataRecord) -> Result<()> {
        if self.fail_insert_after.is_some_and(|n| self.inserted.len() >= n) {
            return Err(Error::Io(std::io::Error::other("disk full")));
        }
        if self.records.contains_key(&record.id) {
            return Err(Error::InvalidArgument(format!("duplicate record {}", record.id)));
        }
        self.records.insert(record.id.clone(), record.clone());
        self.inserted.push(record.id.clone());
        Ok(())
    }

    fn delete(&mut self, record: &MetadataRecord) -> Result<()> {
        self.records.remove(&record.id);
        self.deleted.push(record.id.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if self.fail_commit {
            return Err(Error::Io(std::io::Error::other("commit refused")));
        }
        self.committed = self.records.clone();
        self.commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.records = self.committed.clone();
        self.rollbacks += 1;
        Ok(())
    }
}
