//! Metadata reconciliation
//!
//! Brings the persisted metadata records in line with the current catalog:
//! records for vanished assets are deleted, records for new assets are
//! created with their resolved file size, and existing records are left
//! alone. The caller enforces single-flight; one engine run never overlaps
//! another.

use std::collections::{HashMap, HashSet};

use super::data::{MediaAsset, MetadataRecord};
use super::library::MetadataStore;
use crate::catalog::CatalogService;
use crate::error::{Error, Result};

/// Number of inserts between commits
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Progress reported during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncProgress {
    /// Insertion is about to start; `total` assets need a record
    Started { total: usize },
    /// `done` of `total` records have been inserted and committed
    Advanced { done: usize, total: usize },
}

/// What a completed run changed, plus the reloaded record cache
#[derive(Debug, Clone, Default)]
pub struct SyncOutcome {
    pub deleted: usize,
    pub inserted: usize,
    pub records: HashMap<String, MetadataRecord>,
}

/// Reconciles a [`MetadataStore`] against a catalog snapshot
#[derive(Debug, Clone)]
pub struct MetadataSyncEngine {
    batch_size: usize,
}

impl Default for MetadataSyncEngine {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl MetadataSyncEngine {
    pub fn new(batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::InvalidArgument("sync batch size must be at least 1".into()));
        }
        Ok(Self { batch_size })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Run one reconciliation pass
    ///
    /// A failing listing aborts before anything is written. A storage error
    /// later on aborts the run and rolls back the uncommitted batch. A file
    /// size that cannot be resolved is recorded as 0 and never aborts.
    pub fn run<F>(
        &self,
        store: &mut dyn MetadataStore,
        catalog: &dyn CatalogService,
        assets: &[MediaAsset],
        on_progress: F,
    ) -> Result<SyncOutcome>
    where
        F: FnMut(SyncProgress),
    {
        let result = self.reconcile(store, catalog, assets, on_progress);
        if result.is_err() {
            if let Err(e) = store.rollback() {
                tracing::warn!("Rollback after failed sync also failed: {}", e);
            }
        }
        result
    }

    fn reconcile<F>(
        &self,
        store: &mut dyn MetadataStore,
        catalog: &dyn CatalogService,
        assets: &[MediaAsset],
        mut on_progress: F,
    ) -> Result<SyncOutcome>
    where
        F: FnMut(SyncProgress),
    {
        let existing = store.list_records()?;

        // Deletion pass
        let catalog_ids: HashSet<&str> = assets.iter().map(|a| a.id.as_str()).collect();
        let (retained, stale): (Vec<MetadataRecord>, Vec<MetadataRecord>) = existing
            .into_iter()
            .partition(|r| catalog_ids.contains(r.id.as_str()));

        for record in &stale {
            store.delete(record)?;
        }
        if !stale.is_empty() {
            store.commit()?;
            tracing::info!("Deleted {} stale metadata records", stale.len());
        }

        // Insertion pass; duplicate catalog ids only get one record
        let mut cached: HashSet<&str> = retained.iter().map(|r| r.id.as_str()).collect();
        let to_sync: Vec<&MediaAsset> = assets
            .iter()
            .filter(|a| cached.insert(a.id.as_str()))
            .collect();

        let total = to_sync.len();
        on_progress(SyncProgress::Started { total });

        for (index, asset) in to_sync.iter().enumerate() {
            let file_size = catalog.file_size(asset).unwrap_or_else(|e| {
                tracing::debug!("File size unavailable for {}: {}", asset.id, e);
                0
            });
            store.insert(&MetadataRecord::from_asset(asset, file_size))?;

            let done = index + 1;
            if done % self.batch_size == 0 {
                store.commit()?;
                on_progress(SyncProgress::Advanced { done, total });
            }
        }

        store.commit()?;
        on_progress(SyncProgress::Advanced { done: total, total });

        let records = store
            .list_records()?
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();

        tracing::info!(
            "Metadata sync complete: {} deleted, {} inserted",
            stale.len(),
            total
        );

        Ok(SyncOutcome {
            deleted: stale.len(),
            inserted: total,
            records,
        })
    }
}
