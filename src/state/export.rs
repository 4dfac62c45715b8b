//! Export of selected originals into a destination directory

use std::path::{Path, PathBuf};

use super::data::{ExportOutcome, MediaAsset};
use crate::catalog::CatalogService;

/// Exports a list of assets into one directory
///
/// Every item gets exactly one attempt. An existing file at the destination
/// is never overwritten; the item is counted as skipped instead, so running
/// the same export twice is harmless.
#[derive(Debug, Clone)]
pub struct ExportJob {
    destination: PathBuf,
}

impl ExportJob {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Export `items` in order, reporting the running tally after each one
    pub fn run<F>(&self, items: &[MediaAsset], catalog: &dyn CatalogService, mut on_progress: F) -> ExportOutcome
    where
        F: FnMut(&ExportOutcome),
    {
        let mut outcome = ExportOutcome::default();

        tracing::info!(
            "Exporting {} items to {}",
            items.len(),
            self.destination.display()
        );

        for asset in items {
            match self.export_one(asset, catalog) {
                ItemResult::Exported => outcome.success += 1,
                ItemResult::Skipped => outcome.skipped += 1,
                ItemResult::Failed => outcome.failure += 1,
            }
            on_progress(&outcome);
        }

        tracing::info!(
            "Export finished: {} exported, {} failed, {} skipped",
            outcome.success,
            outcome.failure,
            outcome.skipped
        );
        outcome
    }

    fn export_one(&self, asset: &MediaAsset, catalog: &dyn CatalogService) -> ItemResult {
        let Some(resource) = catalog.resolve_resource(asset) else {
            tracing::warn!("No exportable resource for {}", asset.id);
            return ItemResult::Failed;
        };

        let target = self.destination.join(&resource.original_filename);
        if target.exists() {
            tracing::debug!("Skipping {}: {} already exists", asset.id, target.display());
            return ItemResult::Skipped;
        }

        match catalog.write_resource(&resource, &target) {
            Ok(()) => ItemResult::Exported,
            Err(e) => {
                tracing::warn!("Export of {} failed: {}", asset.id, e);
                ItemResult::Failed
            }
        }
    }
}

enum ItemResult {
    Exported,
    Skipped,
    Failed,
}
