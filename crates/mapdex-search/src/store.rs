//! Concurrent catalog store.
//!
//! Every record is reachable under its catalog id and its version string.
//! Records that came from disk are also reachable through their content hash.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use mapdex_core::Record;

/// Map from identity keys to records.
///
/// Backed by [`DashMap`], so operations on independent keys lock
/// independent shards. Writers never hold more than one shard at a time.
#[derive(Debug, Default)]
pub struct CatalogStore {
    /// catalog id and version -> record
    records: DashMap<String, Arc<Record>>,
    /// content hash -> catalog id
    hashes: DashMap<String, String>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a record under its catalog id and version.
    ///
    /// Last write wins. When the record replaces one with a different
    /// version, the old version alias is dropped.
    pub fn upsert(&self, record: impl Into<Arc<Record>>) -> Arc<Record> {
        let record = record.into();
        let id = record.catalog_id().to_string();

        if let Some(previous) = self.records.insert(id.clone(), Arc::clone(&record)) {
            if previous.version() != record.version() {
                self.remove_alias(previous.version(), &id);
            }
            if let Some(old_hash) = previous.hash() {
                if record.hash().as_deref() != Some(old_hash.as_str()) {
                    self.hashes.remove_if(&old_hash, |_, owner| *owner == id);
                }
            }
        }

        if record.version() != id {
            self.records
                .insert(record.version().to_string(), Arc::clone(&record));
        }
        if let Some(hash) = record.hash() {
            self.hashes.insert(hash, id.clone());
        }

        // A concurrent upsert of the same id may have replaced this record
        // after its aliases were cleaned up and before ours were written.
        let winner = self.lookup(&id);
        if !winner.as_ref().is_some_and(|w| Arc::ptr_eq(w, &record)) {
            self.retract_aliases(&id, &record, winner);
        }

        record
    }

    /// Undo the aliases written by an upsert that lost the race for `id`.
    /// Aliases the winner shares are pointed at the winner.
    fn retract_aliases(&self, id: &str, loser: &Arc<Record>, winner: Option<Arc<Record>>) {
        if loser.version() != id {
            if let Entry::Occupied(mut entry) = self.records.entry(loser.version().to_string()) {
                if Arc::ptr_eq(entry.get(), loser) {
                    match winner.as_ref().filter(|w| w.version() == loser.version()) {
                        Some(w) => {
                            entry.insert(Arc::clone(w));
                        }
                        None => {
                            entry.remove();
                        }
                    }
                }
            }
        }

        if let Some(hash) = loser.hash() {
            let winner_hash = winner.as_ref().and_then(|w| w.hash());
            if winner_hash.as_deref() != Some(hash.as_str()) {
                self.hashes.remove_if(&hash, |_, owner| owner == id);
            }
        }
    }

    /// Look up a record by catalog id or version.
    pub fn lookup(&self, key: &str) -> Option<Arc<Record>> {
        self.records.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Look up a record by the content hash of its level files.
    pub fn lookup_hash(&self, hash: &str) -> Option<Arc<Record>> {
        let id = self.hashes.get(hash).map(|entry| entry.value().clone())?;
        self.lookup(&id)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    /// Remove a record and all of its aliases.
    pub fn remove(&self, catalog_id: &str) -> Option<Arc<Record>> {
        let (_, record) = self.records.remove(catalog_id)?;
        if record.version() != catalog_id {
            self.remove_alias(record.version(), catalog_id);
        }
        if let Some(hash) = record.hash() {
            self.hashes.remove_if(&hash, |_, owner| owner == catalog_id);
        }
        Some(record)
    }

    fn remove_alias(&self, version: &str, catalog_id: &str) {
        self.records
            .remove_if(version, |_, aliased| aliased.catalog_id() == catalog_id);
    }

    /// Snapshot of every distinct record.
    pub fn records(&self) -> Vec<Arc<Record>> {
        self.records
            .iter()
            .filter(|entry| entry.key() == entry.value().catalog_id())
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Number of distinct records.
    pub fn len(&self) -> usize {
        self.records
            .iter()
            .filter(|entry| entry.key() == entry.value().catalog_id())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of keys, aliases included.
    pub fn key_count(&self) -> usize {
        self.records.len()
    }

    pub fn clear(&self) {
        self.records.clear();
        self.hashes.clear();
    }

    /// Release spare capacity left behind by a bulk import.
    pub fn shrink_to_fit(&self) {
        self.records.shrink_to_fit();
        self.hashes.shrink_to_fit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapdex_core::Attributes;
    use serde_json::json;

    fn record_with_hash(id: &str, version: &str, hash: &str) -> Record {
        let mut attrs = Attributes::new();
        attrs.insert("id".into(), json!(id));
        attrs.insert("version".into(), json!(version));
        attrs.insert("hash".into(), json!(hash));
        Record::from_attributes(attrs).unwrap()
    }

    #[test]
    fn test_upsert_aliases_both_keys() {
        let store = CatalogStore::new();
        store.upsert(Record::new("4d2", "77-1234"));

        let by_id = store.lookup("4d2").unwrap();
        let by_version = store.lookup("77-1234").unwrap();
        assert!(Arc::ptr_eq(&by_id, &by_version));
        assert_eq!(store.len(), 1);
        assert_eq!(store.key_count(), 2);
    }

    #[test]
    fn test_upsert_same_id_and_version_is_one_key() {
        let store = CatalogStore::new();
        store.upsert(Record::new("ff", "ff"));
        assert_eq!(store.key_count(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_upsert_is_last_write_wins() {
        let store = CatalogStore::new();
        store.upsert(Record::new("a1", "v1"));
        store.upsert(Record::new("a1", "v2"));

        assert_eq!(store.lookup("a1").unwrap().version(), "v2");
        assert!(store.lookup("v1").is_none());
        assert!(store.lookup("v2").is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_drops_all_aliases() {
        let store = CatalogStore::new();
        store.upsert(record_with_hash("4d2", "77-1234", "abc123"));
        assert!(store.lookup_hash("abc123").is_some());

        let removed = store.remove("4d2").unwrap();
        assert_eq!(removed.catalog_id(), "4d2");
        assert!(store.lookup("4d2").is_none());
        assert!(store.lookup("77-1234").is_none());
        assert!(store.lookup_hash("abc123").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_missing_is_none() {
        let store = CatalogStore::new();
        assert!(store.remove("nope").is_none());
    }

    #[test]
    fn test_records_are_distinct() {
        let store = CatalogStore::new();
        store.upsert(Record::new("1", "1-0"));
        store.upsert(Record::new("2", "2-0"));
        store.upsert(Record::new("3", "3"));

        let mut ids: Vec<String> = store
            .records()
            .iter()
            .map(|r| r.catalog_id().to_string())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_losing_upsert_retracts_its_version_alias() {
        let store = CatalogStore::new();
        let winner = store.upsert(Record::new("abc", "v2"));
        // The interleaving a racing upsert leaves behind: its alias was
        // written after the winner replaced the id entry.
        let loser = Arc::new(Record::new("abc", "v1"));
        store.records.insert("v1".to_string(), Arc::clone(&loser));

        store.retract_aliases("abc", &loser, Some(Arc::clone(&winner)));

        assert!(store.lookup("v1").is_none());
        assert!(Arc::ptr_eq(&store.lookup("v2").unwrap(), &winner));
        assert_eq!(store.key_count(), 2);
    }

    #[test]
    fn test_losing_upsert_repoints_shared_version_alias() {
        let store = CatalogStore::new();
        let winner = store.upsert(Record::new("abc", "v1"));
        let loser = Arc::new(Record::new("abc", "v1"));
        store.records.insert("v1".to_string(), Arc::clone(&loser));

        store.retract_aliases("abc", &loser, Some(Arc::clone(&winner)));

        assert!(Arc::ptr_eq(&store.lookup("v1").unwrap(), &winner));
        assert_eq!(store.key_count(), 2);
    }

    #[test]
    fn test_losing_upsert_retracts_its_hash_alias() {
        let store = CatalogStore::new();
        let winner = store.upsert(record_with_hash("abc", "v2", "new"));
        let loser = Arc::new(record_with_hash("abc", "v1", "old"));
        store.hashes.insert("old".to_string(), "abc".to_string());

        store.retract_aliases("abc", &loser, Some(winner));

        assert!(store.lookup_hash("old").is_none());
        assert!(store.lookup_hash("new").is_some());
    }

    #[test]
    fn test_hash_alias_follows_updates() {
        let store = CatalogStore::new();
        store.upsert(record_with_hash("1", "1", "old"));
        store.upsert(record_with_hash("1", "1", "new"));

        assert!(store.lookup_hash("old").is_none());
        assert_eq!(store.lookup_hash("new").unwrap().catalog_id(), "1");
    }
}
