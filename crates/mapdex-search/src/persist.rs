//! Catalog snapshot on disk.
//!
//! The snapshot is a single JSON object: keys are catalog ids, values are
//! the records' attribute documents. Only the catalog is persisted; the
//! prefix index is rebuilt by replaying every record through the indexer.

use std::fs;
use std::path::{Path, PathBuf};

use mapdex_core::Attributes;
use serde_json::Value;

use crate::error::{CatalogError, CatalogResult};
use crate::store::CatalogStore;

/// File name of the snapshot inside the data directory.
pub const SNAPSHOT_FILE: &str = "SongDatabase.dat";

/// Location of the snapshot for a data directory.
pub fn snapshot_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SNAPSHOT_FILE)
}

/// Write every distinct record's attributes to `path`.
///
/// The document is written to a sibling temporary file and renamed over the
/// target, so a failed save never truncates the previous snapshot.
pub fn save(store: &CatalogStore, path: &Path) -> CatalogResult<usize> {
    let mut document = Attributes::new();
    for record in store.records() {
        document.insert(
            record.catalog_id().to_string(),
            Value::Object(record.attributes().clone()),
        );
    }
    let count = document.len();

    let text = serde_json::to_string(&Value::Object(document))
        .map_err(|e| CatalogError::persistence(path, e))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| CatalogError::persistence(parent, e))?;
    }

    let tmp_path = path.with_extension("dat.tmp");
    fs::write(&tmp_path, text).map_err(|e| CatalogError::persistence(&tmp_path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| CatalogError::persistence(path, e))?;

    Ok(count)
}

/// Read the attribute documents stored at `path`.
///
/// A missing file is an empty catalog. An unreadable or malformed file is a
/// [`CatalogError::Persistence`]; entries that are not objects are skipped.
pub fn load(path: &Path) -> CatalogResult<Vec<Attributes>> {
    if !path.exists() {
        log::debug!("No catalog snapshot at {}", path.display());
        return Ok(Vec::new());
    }

    let text = fs::read_to_string(path).map_err(|e| CatalogError::persistence(path, e))?;
    let document: Value =
        serde_json::from_str(&text).map_err(|e| CatalogError::persistence(path, e))?;

    match document {
        Value::Null => Ok(Vec::new()),
        Value::Object(entries) => Ok(entries
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::Object(attributes) => Some(attributes),
                _ => {
                    log::warn!("Skipping snapshot entry {:?}: not an object", key);
                    None
                }
            })
            .collect()),
        _ => Err(CatalogError::persistence(
            path,
            "top-level value is not an object",
        )),
    }
}
