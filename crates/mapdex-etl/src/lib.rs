//! Catalog import for mapdex.
//!
//! Feeds records into a [`mapdex_search::Catalog`] from a local directory of
//! levels and from remote query-result documents, and loads the layered
//! configuration shared by the binary.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod remote;
pub mod scan;

pub use config::Config;
pub use error::{ImportError, ImportResult};
pub use remote::{ingest_query_result, normalize_remote, records_from_result};
pub use scan::{spawn_scan, LevelScanner, ScanSummary};
