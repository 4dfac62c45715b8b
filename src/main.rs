//! mediagrid headless runner
//!
//! Loads a catalog (a folder on disk or the built-in demo catalog), syncs
//! its metadata into the local database and prints the visible order for
//! the requested filter and sort. With `--export` the whole visible order
//! is selected and exported.
//!
//! ```bash
//! mediagrid --library ~/Pictures --filter videos --sort duration
//! mediagrid --demo --sort size --ascending --export /tmp/out
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};

use mediagrid::catalog::demo::DemoCatalog;
use mediagrid::catalog::folder::FolderCatalog;
use mediagrid::logging;
use mediagrid::state::data::{format_capture_date, format_duration, format_file_size};
use mediagrid::state::library::{MetadataStore, SqliteMetadataStore};
use mediagrid::{CatalogController, CatalogService, Error, MediaFilter, Result, Settings, SortDirection, SortKey};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum FilterArg {
    All,
    Photos,
    Videos,
}

impl From<FilterArg> for MediaFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::All => MediaFilter::All,
            FilterArg::Photos => MediaFilter::PhotosOnly,
            FilterArg::Videos => MediaFilter::VideosOnly,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum SortArg {
    /// Capture time
    Date,
    Duration,
    /// File size from the metadata cache
    Size,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Date => SortKey::CaptureTime,
            SortArg::Duration => SortKey::Duration,
            SortArg::Size => SortKey::FileSize,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "mediagrid")]
#[command(about = "Browse, sort and export a media library", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Library folder (overrides the configured one)
    #[arg(long, value_name = "DIR", conflicts_with = "demo")]
    library: Option<PathBuf>,

    /// Use the built-in demo catalog
    #[arg(long)]
    demo: bool,

    #[arg(long, value_enum, default_value = "all")]
    filter: FilterArg,

    #[arg(long, value_enum, default_value = "date")]
    sort: SortArg,

    /// Sort ascending instead of descending
    #[arg(long)]
    ascending: bool,

    /// Export every visible item into DIR
    #[arg(long, value_name = "DIR")]
    export: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::load_default()?,
    };
    logging::init(&settings.log_filter);

    let catalog = open_catalog(&cli, &settings)?;
    let store = open_store(&settings, cli.demo)?;
    let mut controller = CatalogController::new(catalog, store, &settings)?;

    controller.set_filter(cli.filter.into());
    controller.set_sort_key(cli.sort.into());
    if cli.ascending {
        controller.set_direction(SortDirection::Ascending);
    }

    controller.check_authorization();
    controller.settle().await;
    if !controller.authorization().allows_access() {
        controller.request_authorization();
        controller.settle().await;
    }

    let snapshot = controller.snapshot();
    if let Some(message) = &snapshot.error_message {
        return Err(Error::Catalog(message.clone()));
    }
    if !snapshot.authorization.allows_access() {
        return Err(Error::Catalog(format!(
            "no access to the library ({:?})",
            snapshot.authorization
        )));
    }

    println!(
        "{} of {} items ({}, by {})",
        snapshot.visible.len(),
        controller.assets().len(),
        snapshot.params.filter.label(),
        snapshot.params.sort_key.label()
    );
    for asset in snapshot.visible.iter() {
        let date = asset
            .capture_time
            .as_ref()
            .map(format_capture_date)
            .unwrap_or_else(|| "--/--/----".to_string());
        let size = controller
            .metadata()
            .get(&asset.id)
            .map(|r| format_file_size(r.file_size))
            .unwrap_or_default();
        let duration = if asset.is_video {
            format_duration(asset.duration)
        } else {
            String::new()
        };
        println!("{:<40} {:>10} {:>10} {:>6}", asset.id, date, size, duration);
    }

    if let Some(destination) = cli.export {
        controller.select_all();
        controller.export(&destination);
        controller.settle().await;

        let outcome = controller.snapshot().last_export.unwrap_or_default();
        println!(
            "Exported {} to {}: {} failed, {} skipped",
            outcome.success,
            destination.display(),
            outcome.failure,
            outcome.skipped
        );
    }

    Ok(())
}

fn open_catalog(cli: &Cli, settings: &Settings) -> Result<Arc<dyn CatalogService>> {
    if cli.demo {
        return Ok(Arc::new(DemoCatalog::new()));
    }

    let root = cli
        .library
        .clone()
        .or_else(|| settings.library_root.clone())
        .ok_or_else(|| Error::InvalidArgument("no library folder given (use --library or --demo)".into()))?;
    Ok(Arc::new(FolderCatalog::new(root)))
}

/// Open the metadata store for this run
///
/// Demo runs get a throwaway in-memory database so syncing the demo catalog
/// never touches the cache of the real library.
fn open_store(settings: &Settings, demo: bool) -> Result<Box<dyn MetadataStore>> {
    if demo {
        return Ok(Box::new(SqliteMetadataStore::open_in_memory()?));
    }

    match settings.resolved_database_path() {
        Some(path) => Ok(Box::new(SqliteMetadataStore::open(&path)?)),
        None => {
            tracing::warn!("No data directory available, keeping metadata in memory");
            Ok(Box::new(SqliteMetadataStore::open_in_memory()?))
        }
    }
}
