//! mediagrid: a filterable, sortable and selectable grid over an external
//! media catalog, with a local SQLite cache of per-item metadata.

pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod state;

#[cfg(test)]
pub mod testing;

pub use catalog::CatalogService;
pub use config::Settings;
pub use error::{Error, Result};
pub use state::controller::{CatalogController, Message, Snapshot};
pub use state::data::{MediaAsset, MediaFilter, SortDirection, SortKey};
