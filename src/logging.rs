//! Logging setup for the headless runner.
//!
//! Installs a global tracing subscriber writing to stderr. The configured
//! default filter applies unless `RUST_LOG` is set.

use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

/// Install the global subscriber.
///
/// Subsequent calls are no-ops, so tests and embedders that already
/// installed a subscriber are left alone.
pub fn init(default_filter: &str) {
    let filter = build_env_filter(default_filter);
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    if Registry::default().with(filter).with(layer).try_init().is_ok() {
        tracing::debug!("Logging initialized");
    }
}

fn build_env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
