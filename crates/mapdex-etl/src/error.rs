//! Import error types.

use std::path::PathBuf;

use mapdex_search::CatalogError;
use thiserror::Error;

/// Errors that can occur while importing levels into the catalog.
#[derive(Debug, Error)]
pub enum ImportError {
    /// A level file could not be read.
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A level document is not valid JSON.
    #[error("parse error in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A level document parsed but lacks the data a record needs.
    #[error("malformed level at {}: {message}", path.display())]
    Malformed { path: PathBuf, message: String },

    /// Another import holds the catalog.
    #[error("an import is already running")]
    Busy,

    /// An error propagated from the catalog.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl ImportError {
    /// Returns `true` when the level's content is bad, as opposed to the
    /// filesystem failing to deliver it.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::Malformed { .. })
    }

    /// Returns `true` when the whole import must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Catalog(CatalogError::Closed))
    }
}

/// Convenience alias for import results.
pub type ImportResult<T> = std::result::Result<T, ImportError>;
