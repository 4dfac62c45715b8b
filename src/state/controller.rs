//! Catalog controller
//!
//! Owns every piece of published state (catalog, visible order, selection,
//! progress counters) and is only ever touched through `&mut self`.
//! Blocking work (catalog listing, sorting, metadata sync, export,
//! fullscreen renders) runs on `spawn_blocking` workers which report back
//! with a [`Message`]. Messages are applied in [`CatalogController::update`],
//! and every change is broadcast as an immutable [`Snapshot`].

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{mpsc, watch};

use super::data::{
    AuthorizationState, ExportOutcome, MediaAsset, MediaFilter, SortDirection, SortKey, ViewParams,
};
use super::export::ExportJob;
use super::fullscreen::{Direction, FullscreenNavigator};
use super::library::MetadataStore;
use super::pipeline::{FilterSortPipeline, MetadataLookup};
use super::selection::{ClickModifiers, SelectionModel};
use super::sync::{MetadataSyncEngine, SyncOutcome, SyncProgress};
use crate::catalog::thumbnail::BoundedImageCache;
use crate::catalog::{CatalogService, FillMode, Preview, TargetSize};
use crate::config::Settings;
use crate::error::{Error, Result};

type SharedStore = Arc<Mutex<Box<dyn MetadataStore>>>;

/// Kind of background job, used to recover when a worker dies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Authorization,
    Listing,
    Sort,
    Sync,
    Export,
    Fullscreen,
}

/// Results posted back to the controller by background workers
#[derive(Debug)]
pub enum Message {
    /// The access level was read or requested
    AuthorizationChanged(AuthorizationState),
    /// The catalog may not be listed at the reported access level
    CatalogUnavailable(AuthorizationState),
    /// Catalog listing finished at the given access level
    CatalogLoaded {
        authorization: AuthorizationState,
        result: Result<Vec<MediaAsset>>,
    },
    /// A background sort finished for `generation`
    SortFinished { generation: u64, sorted: Vec<MediaAsset> },
    SyncProgress(SyncProgress),
    SyncFinished(Result<SyncOutcome>),
    /// Running tally after one more exported item
    ExportProgress(ExportOutcome),
    ExportFinished(ExportOutcome),
    /// A fullscreen render for `id` finished
    FullscreenLoaded { id: String, image: Option<Preview> },
    /// A worker panicked or was cancelled before posting its result
    WorkerFailed { job: Job, error: String },
}

impl Message {
    /// Whether this message ends a job (as opposed to reporting progress)
    fn is_final(&self) -> bool {
        !matches!(self, Message::SyncProgress(_) | Message::ExportProgress(_))
    }
}

/// Immutable view of the controller state
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub authorization: AuthorizationState,
    pub is_loading: bool,
    pub error_message: Option<String>,
    pub params: ViewParams,
    pub visible: Arc<Vec<MediaAsset>>,
    pub selected: HashSet<String>,
    pub visible_selected_count: usize,
    pub is_syncing: bool,
    pub sync_progress: usize,
    pub sync_total: usize,
    pub is_exporting: bool,
    pub export_progress: usize,
    pub export_total: usize,
    pub last_export: Option<ExportOutcome>,
    pub fullscreen_id: Option<String>,
    pub fullscreen_image: Option<Preview>,
    pub fullscreen_loading: bool,
}

impl Snapshot {
    /// Ids of the visible order
    pub fn visible_ids(&self) -> Vec<&str> {
        self.visible.iter().map(|a| a.id.as_str()).collect()
    }
}

/// Progress of a single-flight run
#[derive(Debug, Clone, Copy, Default)]
struct RunState {
    running: bool,
    done: usize,
    total: usize,
}

impl RunState {
    fn start(&mut self, total: usize) {
        *self = RunState { running: true, done: 0, total };
    }

    /// Counters only ever move forward within one run
    fn advance(&mut self, done: usize) {
        self.done = self.done.max(done);
    }

    fn finish(&mut self) {
        self.running = false;
        self.done = self.done.max(self.total);
    }
}

pub struct CatalogController {
    catalog: Arc<dyn CatalogService>,
    store: SharedStore,
    sync_engine: MetadataSyncEngine,
    thumbnails: BoundedImageCache,
    thumbnail_size: u32,
    fullscreen_max_dimension: u32,

    authorization: AuthorizationState,
    assets: Arc<Vec<MediaAsset>>,
    metadata: MetadataLookup,
    pipeline: FilterSortPipeline,
    selection: SelectionModel,
    fullscreen: FullscreenNavigator,

    is_loading: bool,
    error_message: Option<String>,
    sync: RunState,
    export: RunState,
    last_export: Option<ExportOutcome>,

    tx: mpsc::UnboundedSender<Message>,
    rx: mpsc::UnboundedReceiver<Message>,
    in_flight: usize,
    snapshots: watch::Sender<Snapshot>,
}

impl CatalogController {
    /// Create a controller over `catalog`, persisting metadata in `store`
    ///
    /// Nothing is fetched until [`refresh`](Self::refresh) is called.
    /// Background jobs need a running tokio runtime.
    pub fn new(
        catalog: Arc<dyn CatalogService>,
        store: Box<dyn MetadataStore>,
        settings: &Settings,
    ) -> Result<Self> {
        settings.validate()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let (snapshots, _) = watch::channel(Snapshot::default());

        Ok(Self {
            catalog,
            store: Arc::new(Mutex::new(store)),
            sync_engine: MetadataSyncEngine::new(settings.sync_batch_size)?,
            thumbnails: BoundedImageCache::new(settings.thumbnail_cache_capacity),
            thumbnail_size: settings.thumbnail_size,
            fullscreen_max_dimension: settings.fullscreen_max_dimension,
            authorization: AuthorizationState::NotDetermined,
            assets: Arc::new(Vec::new()),
            metadata: MetadataLookup::default(),
            pipeline: FilterSortPipeline::default(),
            selection: SelectionModel::new(),
            fullscreen: FullscreenNavigator::new(),
            is_loading: false,
            error_message: None,
            sync: RunState::default(),
            export: RunState::default(),
            last_export: None,
            tx,
            rx,
            in_flight: 0,
            snapshots,
        })
    }

    // ========== Accessors ==========

    pub fn authorization(&self) -> AuthorizationState {
        self.authorization
    }

    pub fn params(&self) -> ViewParams {
        self.pipeline.params()
    }

    /// The raw catalog as last delivered
    pub fn assets(&self) -> &Arc<Vec<MediaAsset>> {
        &self.assets
    }

    pub fn visible(&self) -> &Arc<Vec<MediaAsset>> {
        self.pipeline.visible()
    }

    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    /// The id -> record cache published by the last successful sync
    pub fn metadata(&self) -> &MetadataLookup {
        &self.metadata
    }

    pub fn is_syncing(&self) -> bool {
        self.sync.running
    }

    pub fn is_exporting(&self) -> bool {
        self.export.running
    }

    pub fn visible_selected_count(&self) -> usize {
        self.selection.visible_selected_count(self.pipeline.visible())
    }

    /// Number of jobs whose final message has not been applied yet
    pub fn pending_jobs(&self) -> usize {
        self.in_flight
    }

    /// Receive every future snapshot
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.subscribe()
    }

    /// Build a snapshot of the current state
    pub fn snapshot(&self) -> Snapshot {
        let visible = Arc::clone(self.pipeline.visible());
        Snapshot {
            authorization: self.authorization,
            is_loading: self.is_loading,
            error_message: self.error_message.clone(),
            params: self.pipeline.params(),
            visible_selected_count: self.selection.visible_selected_count(&visible),
            visible,
            selected: self.selection.selected().clone(),
            is_syncing: self.sync.running,
            sync_progress: self.sync.done,
            sync_total: self.sync.total,
            is_exporting: self.export.running,
            export_progress: self.export.done,
            export_total: self.export.total,
            last_export: self.last_export,
            fullscreen_id: self.fullscreen.current().map(str::to_string),
            fullscreen_image: self.fullscreen.image().cloned(),
            fullscreen_loading: self.fullscreen.is_loading(),
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }

    // ========== Catalog ==========

    /// Read the current access level; a usable one triggers a refresh
    pub fn check_authorization(&mut self) {
        let catalog = Arc::clone(&self.catalog);
        self.spawn_worker(Job::Authorization, move || {
            Message::AuthorizationChanged(catalog.authorization_status())
        });
    }

    /// Ask the catalog for access; a grant triggers a refresh
    pub fn request_authorization(&mut self) {
        let catalog = Arc::clone(&self.catalog);
        self.spawn_worker(Job::Authorization, move || {
            Message::AuthorizationChanged(catalog.request_authorization())
        });
    }

    /// Re-fetch the catalog, then re-derive the visible order and sync
    ///
    /// The catalog is only listed if the current access level allows it.
    pub fn refresh(&mut self) {
        tracing::info!("Refreshing catalog");
        self.is_loading = true;
        self.error_message = None;

        let catalog = Arc::clone(&self.catalog);
        self.spawn_worker(Job::Listing, move || {
            let status = catalog.authorization_status();
            if !status.allows_access() {
                return Message::CatalogUnavailable(status);
            }
            Message::CatalogLoaded {
                authorization: status,
                result: catalog.list_assets(),
            }
        });
        self.publish();
    }

    fn apply_catalog(&mut self, result: Result<Vec<MediaAsset>>) {
        self.is_loading = false;
        match result {
            Ok(assets) => {
                tracing::info!("Catalog loaded with {} assets", assets.len());
                self.assets = Arc::new(assets);
                self.thumbnails.invalidate_all();
                self.recompute();
                self.sync_metadata();
            }
            Err(e) => {
                tracing::warn!("Catalog listing failed: {}", e);
                self.error_message = Some(format!("Failed to load library: {e}"));
            }
        }
    }

    // ========== Filter & sort ==========

    pub fn set_filter(&mut self, filter: MediaFilter) {
        self.pipeline.set_filter(filter);
        self.recompute();
        self.publish();
    }

    pub fn set_sort_key(&mut self, key: SortKey) {
        self.pipeline.set_sort_key(key);
        self.recompute();
        self.publish();
    }

    pub fn set_direction(&mut self, direction: SortDirection) {
        self.pipeline.set_direction(direction);
        self.recompute();
        self.publish();
    }

    pub fn toggle_direction(&mut self) {
        self.set_direction(self.pipeline.params().direction.toggled());
    }

    fn recompute(&mut self) {
        if let Some(job) = self.pipeline.recompute(&self.assets, &self.metadata) {
            tracing::debug!("Sorting by {} in background (generation {})", job.sort_key.label(), job.generation);
            self.spawn_worker(Job::Sort, move || {
                let (generation, sorted) = job.run();
                Message::SortFinished { generation, sorted }
            });
        }
    }

    // ========== Metadata sync ==========

    /// Start a metadata sync against the current catalog
    ///
    /// Returns `false` without doing anything if a sync is already running.
    pub fn sync_metadata(&mut self) -> bool {
        if self.sync.running {
            tracing::debug!("Metadata sync already running");
            return false;
        }
        self.sync.start(0);

        let store = Arc::clone(&self.store);
        let catalog = Arc::clone(&self.catalog);
        let assets = Arc::clone(&self.assets);
        let engine = self.sync_engine.clone();
        let tx = self.tx.clone();

        self.spawn_worker(Job::Sync, move || {
            let mut store = lock_store(&store);
            let result = engine.run(&mut **store, &*catalog, &assets, |progress| {
                let _ = tx.send(Message::SyncProgress(progress));
            });
            Message::SyncFinished(result)
        });
        self.publish();
        true
    }

    fn apply_sync(&mut self, result: Result<SyncOutcome>) {
        self.sync.finish();
        match result {
            Ok(outcome) => {
                self.metadata = Arc::new(outcome.records);
                if self.pipeline.params().sort_key == SortKey::FileSize {
                    self.recompute();
                }
            }
            Err(e) => {
                tracing::warn!("Metadata sync failed: {}", e);
                self.error_message = Some(format!("Metadata sync failed: {e}"));
            }
        }
    }

    // ========== Selection ==========

    pub fn click(&mut self, id: &str, modifiers: ClickModifiers) {
        let order = self.pipeline.visible_ids();
        self.selection.click(id, modifiers, &order);
        self.publish();
    }

    pub fn select_all(&mut self) {
        let order = self.pipeline.visible_ids();
        self.selection.select_all(&order);
        self.publish();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.publish();
    }

    // ========== Export ==========

    /// Export the visible selection into `destination`
    ///
    /// Returns whether a background run was started. An empty visible
    /// selection completes at once with an all-zero outcome; a call while
    /// an export is running does nothing.
    pub fn export(&mut self, destination: impl Into<PathBuf>) -> bool {
        if self.export.running {
            tracing::debug!("Export already running");
            return false;
        }

        let items = self.selection.visible_selected_items(self.pipeline.visible());
        if items.is_empty() {
            self.last_export = Some(ExportOutcome::default());
            self.publish();
            return false;
        }

        self.export.start(items.len());
        self.last_export = None;

        let job = ExportJob::new(destination);
        let catalog = Arc::clone(&self.catalog);
        let tx = self.tx.clone();
        self.spawn_worker(Job::Export, move || {
            let outcome = job.run(&items, &*catalog, |tally| {
                let _ = tx.send(Message::ExportProgress(*tally));
            });
            Message::ExportFinished(outcome)
        });
        self.publish();
        true
    }

    // ========== Fullscreen ==========

    pub fn open_fullscreen(&mut self, id: &str) {
        self.fullscreen.open(id);
        self.load_fullscreen_image();
        self.publish();
    }

    pub fn close_fullscreen(&mut self) {
        self.fullscreen.close();
        self.publish();
    }

    /// Move the fullscreen view to the neighbouring visible item
    pub fn navigate(&mut self, direction: Direction) -> Option<String> {
        let next = self.fullscreen.navigate(direction, &self.pipeline.visible_ids())?;
        self.load_fullscreen_image();
        self.publish();
        Some(next)
    }

    fn load_fullscreen_image(&mut self) {
        let Some(request) = self.fullscreen.begin_load(self.pipeline.visible(), self.fullscreen_max_dimension) else {
            return;
        };

        let catalog = Arc::clone(&self.catalog);
        self.spawn_worker(Job::Fullscreen, move || {
            let image = catalog.request_image(&request.asset, request.target, request.mode);
            Message::FullscreenLoaded { id: request.id, image }
        });
    }

    // ========== Thumbnails ==========

    /// Grid thumbnail for `asset`, rendered once and then served from cache
    pub async fn load_thumbnail(&self, asset: &MediaAsset) -> Option<Preview> {
        if let Some(cached) = self.thumbnails.get(&asset.id) {
            return Some(cached);
        }

        let cache = self.thumbnails.clone();
        let catalog = Arc::clone(&self.catalog);
        let asset = asset.clone();
        let target = TargetSize::square(self.thumbnail_size);

        let result = tokio::task::spawn_blocking(move || {
            cache.get_or_fetch(&asset.id, || catalog.request_image(&asset, target, FillMode::AspectFill))
        })
        .await;

        match result {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!("Thumbnail render task failed: {}", e);
                None
            }
        }
    }

    pub fn cached_thumbnail(&self, id: &str) -> Option<Preview> {
        self.thumbnails.get(id)
    }

    // ========== Message loop ==========

    /// Apply one worker message
    pub fn update(&mut self, message: Message) {
        if message.is_final() {
            self.in_flight = self.in_flight.saturating_sub(1);
        }

        match message {
            Message::AuthorizationChanged(state) => {
                tracing::info!("Catalog authorization is now {:?}", state);
                self.authorization = state;
                if state.allows_access() {
                    self.refresh();
                }
            }
            Message::CatalogUnavailable(state) => {
                tracing::info!("Catalog not listed: access is {:?}", state);
                self.authorization = state;
                self.is_loading = false;
            }
            Message::CatalogLoaded { authorization, result } => {
                self.authorization = authorization;
                self.apply_catalog(result);
            }
            Message::SortFinished { generation, sorted } => {
                self.pipeline.apply(generation, sorted);
            }
            Message::SyncProgress(SyncProgress::Started { total }) => {
                self.sync.total = total;
            }
            Message::SyncProgress(SyncProgress::Advanced { done, total }) => {
                self.sync.total = total;
                self.sync.advance(done);
            }
            Message::SyncFinished(result) => self.apply_sync(result),
            Message::ExportProgress(tally) => self.export.advance(tally.processed()),
            Message::ExportFinished(outcome) => {
                self.export.advance(outcome.processed());
                self.export.finish();
                self.last_export = Some(outcome);
            }
            Message::FullscreenLoaded { id, image } => {
                self.fullscreen.finish_load(&id, image);
            }
            Message::WorkerFailed { job, error } => self.recover(job, error),
        }

        self.publish();
    }

    fn recover(&mut self, job: Job, error: String) {
        tracing::error!("{:?} worker failed: {}", job, error);
        match job {
            Job::Authorization | Job::Sort => {}
            Job::Listing => {
                self.is_loading = false;
                self.error_message = Some(format!("Failed to load library: {error}"));
            }
            Job::Sync => {
                self.sync.finish();
                self.error_message = Some(format!("Metadata sync failed: {error}"));
            }
            Job::Export => self.export.finish(),
            Job::Fullscreen => {
                if let Some(id) = self.fullscreen.current().map(str::to_string) {
                    self.fullscreen.finish_load(&id, None);
                }
            }
        }
    }

    /// Wait for the next worker message and apply it
    ///
    /// Returns `false` when no job is in flight.
    pub async fn process_next(&mut self) -> bool {
        if self.in_flight == 0 {
            return false;
        }
        match self.rx.recv().await {
            Some(message) => {
                self.update(message);
                true
            }
            None => false,
        }
    }

    /// Apply messages until every job (including follow-ups) has finished
    pub async fn settle(&mut self) {
        while self.process_next().await {}
    }

    /// Run `work` on a blocking worker and post its message back
    fn spawn_worker<F>(&mut self, job: Job, work: F)
    where
        F: FnOnce() -> Message + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let message = match tokio::task::spawn_blocking(work).await {
                Ok(message) => message,
                Err(e) => Message::WorkerFailed {
                    job,
                    error: Error::from(e).to_string(),
                },
            };
            let _ = tx.send(message);
        });
    }
}

/// Lock the metadata store, recovering it if a previous sync panicked
///
/// A poisoned lock means a run died between commits, so its pending writes
/// are rolled back before the store is used again.
fn lock_store(store: &SharedStore) -> MutexGuard<'_, Box<dyn MetadataStore>> {
    match store.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("Metadata store left mid-run by a failed sync, rolling back");
            let mut guard = poisoned.into_inner();
            if let Err(e) = guard.rollback() {
                tracing::warn!("Rollback of abandoned sync failed: {}", e);
            }
            store.clear_poison();
            guard
        }
    }
}

impl std::fmt::Debug for CatalogController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogController")
            .field("assets", &self.assets.len())
            .field("visible", &self.pipeline.visible().len())
            .field("params", &self.pipeline.params())
            .field("in_flight", &self.in_flight)
            .finish()
    }
}
