//! Error types for catalog operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the catalog, index and persistence layers.
///
/// Only [`CatalogError::Closed`] signals a caller mistake. The other kinds
/// describe data-quality or I/O problems that the catalog logs and skips.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The record's catalog id is not hexadecimal, so it cannot be indexed.
    #[error("record {id:?} has an unparseable catalog id")]
    UnparseableId { id: String },

    /// Reading or writing the catalog snapshot failed.
    #[error("persistence error at {}: {message}", path.display())]
    Persistence { path: PathBuf, message: String },

    /// The catalog was used after `shutdown`.
    #[error("catalog is closed")]
    Closed,

    /// An error propagated from the core domain layer.
    #[error(transparent)]
    Core(#[from] mapdex_core::Error),
}

impl CatalogError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Persistence {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Convenience alias for catalog results.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
