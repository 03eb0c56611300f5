//! Catalog search for mapdex.
//!
//! Holds the catalog store and the inverted prefix index built over record
//! metadata, resolves free-text and exact-id queries, and persists the
//! catalog as a single JSON document.
//!
//! All state lives behind one [`Catalog`] handle. Store and index are
//! sharded concurrent maps, so imports and searches run side by side without
//! a global lock.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod catalog;
pub mod engine;
pub mod error;
pub mod index;
pub mod indexer;
pub mod persist;
pub mod store;

pub use catalog::{Catalog, CatalogStats, ImportGuard};
pub use error::{CatalogError, CatalogResult};
pub use index::{PrefixIndex, MIN_PREFIX_LEN};
pub use indexer::Indexer;
pub use store::CatalogStore;
