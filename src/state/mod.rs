//! State management module
//!
//! This module handles all application state, including:
//! - Database connections and queries (library.rs)
//! - Shared data structures (data.rs)
//! - Metadata reconciliation (sync.rs)
//! - The filtered and sorted visible order (pipeline.rs)
//! - Selection, export and fullscreen viewing
//! - The controller that owns all of it (controller.rs)

pub mod controller;
pub mod data;
pub mod export;
pub mod fullscreen;
pub mod library;
pub mod pipeline;
pub mod selection;
pub mod sync;
