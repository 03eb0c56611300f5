//! The long-lived catalog service.
//!
//! A [`Catalog`] owns the store, the prefix index and the snapshot
//! location. It is constructed once, shared behind an `Arc`, and closed with
//! [`Catalog::shutdown`]. Data-quality problems are logged and skipped here;
//! only use after shutdown surfaces as an error.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use mapdex_core::Record;
use tokio::sync::watch;

use crate::engine;
use crate::error::{CatalogError, CatalogResult};
use crate::index::PrefixIndex;
use crate::indexer::Indexer;
use crate::persist;
use crate::store::CatalogStore;

/// Point-in-time counters for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogStats {
    /// Distinct records.
    pub records: usize,
    /// Store keys, version aliases included.
    pub store_keys: usize,
    /// Distinct prefix-index keys.
    pub index_keys: usize,
    /// Live (key, id) pairs in the prefix index.
    pub index_entries: usize,
    pub importing: bool,
}

/// Catalog store, prefix index and persistence behind one handle.
#[derive(Debug)]
pub struct Catalog {
    store: CatalogStore,
    index: PrefixIndex,
    snapshot: Option<PathBuf>,
    /// catalog id -> known score, applied when records are indexed.
    scores: DashMap<String, f64>,
    closed: AtomicBool,
    importing: AtomicBool,
    /// `true` while no import is running.
    import_idle: watch::Sender<bool>,
}

impl Catalog {
    fn with_snapshot(snapshot: Option<PathBuf>) -> Self {
        let (import_idle, _) = watch::channel(true);
        Self {
            store: CatalogStore::new(),
            index: PrefixIndex::new(),
            snapshot,
            scores: DashMap::new(),
            closed: AtomicBool::new(false),
            importing: AtomicBool::new(false),
            import_idle,
        }
    }

    /// Open the catalog persisted in `data_dir`, loading its snapshot.
    pub fn open(data_dir: impl AsRef<Path>) -> Self {
        let catalog = Self::with_snapshot(Some(persist::snapshot_path(data_dir.as_ref())));
        catalog.load();
        catalog
    }

    /// A catalog with no snapshot file. `save` and `load` do nothing.
    pub fn in_memory() -> Self {
        Self::with_snapshot(None)
    }

    /// Location of the snapshot file, if this catalog is persisted.
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    fn indexer(&self) -> Indexer<'_> {
        Indexer::new(&self.store, &self.index)
    }

    fn ensure_open(&self) -> CatalogResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CatalogError::Closed);
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    // Lifecycle

    /// Replace the in-memory catalog with the snapshot on disk.
    ///
    /// The prefix index is rebuilt from scratch. A missing snapshot leaves
    /// an empty catalog. An unreadable or corrupt one is logged and the
    /// in-memory catalog is kept as it was. Returns the number of records
    /// loaded.
    pub fn load(&self) -> usize {
        let Some(path) = self.snapshot.as_deref() else {
            return 0;
        };

        let documents = match persist::load(path) {
            Ok(documents) => documents,
            Err(e) => {
                log::error!("Failed to load catalog snapshot: {}", e);
                return 0;
            }
        };

        self.index.clear();
        self.store.clear();

        let mut loaded = 0usize;
        for attributes in documents {
            match Record::from_attributes(attributes) {
                Ok(record) => {
                    self.index_or_log(record);
                    loaded += 1;
                }
                Err(e) => log::warn!("Skipping snapshot entry: {}", e),
            }
        }

        log::info!("Loaded {} records from {}", loaded, path.display());
        loaded
    }

    /// Write the catalog snapshot. Failures are logged and `None` is
    /// returned; the in-memory catalog is unaffected either way.
    pub fn save(&self) -> Option<usize> {
        let path = self.snapshot.as_deref()?;
        match persist::save(&self.store, path) {
            Ok(count) => {
                log::info!("Saved {} records to {}", count, path.display());
                Some(count)
            }
            Err(e) => {
                log::error!("Failed to save catalog snapshot: {}", e);
                None
            }
        }
    }

    /// Save a final snapshot and close the handle. Later searches and
    /// writes return [`CatalogError::Closed`].
    pub fn shutdown(&self) -> Option<usize> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return None;
        }
        self.save()
    }

    // Reads

    /// Look up a record by catalog id or version.
    pub fn lookup(&self, key: &str) -> Option<Arc<Record>> {
        self.store.lookup(key)
    }

    /// Look up a record by the content hash of its level files.
    pub fn lookup_hash(&self, hash: &str) -> Option<Arc<Record>> {
        self.store.lookup_hash(hash)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.store.contains(key)
    }

    /// Resolve a free-text or identifier query.
    pub fn search(&self, query: &str) -> CatalogResult<Vec<Arc<Record>>> {
        self.ensure_open()?;
        Ok(engine::search(&self.store, &self.index, query))
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            records: self.store.len(),
            store_keys: self.store.key_count(),
            index_keys: self.index.key_count(),
            index_entries: self.index.entry_count(),
            importing: self.is_importing(),
        }
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    pub fn index(&self) -> &PrefixIndex {
        &self.index
    }

    // Writes

    /// Remember a known score for a catalog id. It is applied the next
    /// time a record with that id is indexed.
    pub fn record_score(&self, catalog_id: &str, score: f64) {
        self.scores.insert(catalog_id.to_lowercase(), score);
    }

    pub fn known_score(&self, catalog_id: &str) -> Option<f64> {
        self.scores.get(catalog_id).map(|score| *score)
    }

    fn index_or_log(&self, record: Record) -> Arc<Record> {
        let record = match self.known_score(record.catalog_id()) {
            Some(score) if !record.has_score() => record.with_score(score),
            _ => record,
        };
        let catalog_id = record.catalog_id().to_string();
        let version = record.version().to_string();

        match self.indexer().index_record(record) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Not indexing {}: {}", catalog_id, e);
                self.store
                    .lookup(&catalog_id)
                    .or_else(|| self.store.lookup(&version))
                    .unwrap_or_else(|| Arc::new(Record::new(catalog_id, version)))
            }
        }
    }

    /// Store and index a new record.
    ///
    /// The caller must not index a record whose id is already indexed; use
    /// [`Catalog::ingest`] for updates. Records with a non-hex id are stored
    /// but unsearchable by text, which is logged, not returned as an error.
    pub fn index_record(&self, record: Record) -> CatalogResult<Arc<Record>> {
        self.ensure_open()?;
        Ok(self.index_or_log(record))
    }

    /// Store and index a record, un-indexing any previous record with the
    /// same catalog id first.
    pub fn ingest(&self, record: Record) -> CatalogResult<Arc<Record>> {
        self.ensure_open()?;
        if let Some(previous) = self.store.lookup(record.catalog_id()) {
            self.indexer().unindex_record(&previous);
        }
        Ok(self.index_or_log(record))
    }

    /// Remove a record's index entries and catalog keys.
    pub fn unindex(&self, record: &Record) -> usize {
        self.indexer().unindex_record(record)
    }

    /// Delete a record from the catalog and the index.
    pub fn remove(&self, catalog_id: &str) -> CatalogResult<Option<Arc<Record>>> {
        self.ensure_open()?;
        let Some(record) = self.store.lookup(catalog_id) else {
            return Ok(None);
        };
        self.indexer().unindex_record(&record);
        Ok(Some(record))
    }

    /// Point an existing record at its materialized level on disk.
    /// Returns `false` when no record has that key.
    pub fn set_local_path(&self, key: &str, path: impl Into<PathBuf>) -> bool {
        let Some(record) = self.store.lookup(key) else {
            return false;
        };
        let updated = Record::clone(&record).with_local_path(path);
        self.store.upsert(updated);
        true
    }

    // Imports

    /// Start a bulk import.
    ///
    /// Returns `None` when an import is already running; the second request
    /// is a no-op. Dropping the guard compacts the catalog and signals
    /// completion to [`Catalog::wait_for_import`].
    pub fn begin_import(self: &Arc<Self>) -> Option<ImportGuard> {
        if self
            .importing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("Import already running, ignoring request");
            return None;
        }
        self.import_idle.send_replace(false);
        Some(ImportGuard {
            catalog: Arc::clone(self),
        })
    }

    pub fn is_importing(&self) -> bool {
        self.importing.load(Ordering::Acquire)
    }

    /// Wait until no import is running.
    pub async fn wait_for_import(&self) {
        let mut idle = self.import_idle.subscribe();
        if idle.wait_for(|idle| *idle).await.is_err() {
            log::debug!("Import signal closed");
        }
    }

    /// Release spare capacity after large transient allocations.
    pub fn compact(&self) {
        self.store.shrink_to_fit();
        self.index.shrink_to_fit();
    }
}

/// Held for the duration of a bulk import.
#[derive(Debug)]
pub struct ImportGuard {
    catalog: Arc<Catalog>,
}

impl ImportGuard {
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }
}

impl Drop for ImportGuard {
    fn drop(&mut self) {
        self.catalog.compact();
        // Idle must be published before the flag clears, or a new import
        // could start and then be reported idle.
        self.catalog.import_idle.send_replace(true);
        self.catalog.importing.store(false, Ordering::Release);
        log::debug!("Import finished");
    }
}
