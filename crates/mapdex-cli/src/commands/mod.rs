pub mod config;
pub mod import;
pub mod scan;
pub mod search;
pub mod status;

pub use import::run_import;
pub use scan::run_scan;
pub use search::{run_lookup, run_search};
pub use status::show_status;

use mapdex_etl::Config;
use mapdex_search::Catalog;
use std::sync::Arc;

/// Open the catalog persisted in the configured data directory.
fn open_catalog(config: &Config) -> Arc<Catalog> {
    log::debug!("Opening catalog in {}", config.data_dir.display());
    Arc::new(Catalog::open(&config.data_dir))
}

/// Close a catalog after a command that changed it, saving the snapshot
/// when autosave is on.
fn close_catalog(catalog: &Catalog, config: &Config) {
    if !config.autosave {
        log::info!("Autosave is off, catalog changes were not saved");
        return;
    }
    if catalog.shutdown().is_none() {
        eprintln!("✗ Failed to save the catalog snapshot (see log for details)");
    }
}
