//! Inverted prefix index.
//!
//! Maps a token, or a prefix of a token, to the set of numeric catalog ids
//! whose metadata produced it. Sets hold ids rather than records so removal
//! and re-resolution stay independent of catalog mutation. Sets are ordered,
//! so candidates always come back in ascending numeric id order.
//!
//! # Thread Safety
//!
//! Uses DashMap for concurrent access. Each insert or remove touches one
//! key; indexing a whole record is a sequence of such operations and is not
//! atomic as a unit.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use mapdex_core::model::NumericId;

/// Shortest prefix ever generated from a token. Tokens shorter than this
/// are indexed verbatim. Lowering it grows the key space quadratically.
pub const MIN_PREFIX_LEN: usize = 3;

/// Token prefix -> set of numeric catalog ids.
#[derive(Debug, Default)]
pub struct PrefixIndex {
    postings: DashMap<String, BTreeSet<NumericId>>,
    /// Live (key, id) pairs across all sets.
    entries: AtomicUsize,
}

impl PrefixIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id` to the set for `key`. Returns `true` if it was not there.
    pub fn insert(&self, key: &str, id: NumericId) -> bool {
        let added = self.postings.entry(key.to_string()).or_default().insert(id);
        if added {
            self.entries.fetch_add(1, Ordering::Relaxed);
        }
        added
    }

    /// Remove `id` from the set for `key`, dropping the set once empty.
    /// Returns `true` if the id was present.
    pub fn remove(&self, key: &str, id: NumericId) -> bool {
        let removed = match self.postings.get_mut(key) {
            Some(mut set) => set.remove(&id),
            None => false,
        };
        if removed {
            self.entries.fetch_sub(1, Ordering::Relaxed);
            self.postings.remove_if(key, |_, set| set.is_empty());
        }
        removed
    }

    /// Snapshot of the candidate set for an exact key.
    ///
    /// Copies the set so no shard lock outlives the call.
    pub fn candidates(&self, key: &str) -> Option<BTreeSet<NumericId>> {
        self.postings.get(key).map(|set| set.value().clone())
    }

    /// Size of the candidate set for `key` (0 when absent).
    pub fn cardinality(&self, key: &str) -> usize {
        self.postings.get(key).map(|set| set.len()).unwrap_or(0)
    }

    pub fn contains(&self, key: &str, id: NumericId) -> bool {
        self.postings
            .get(key)
            .map(|set| set.contains(&id))
            .unwrap_or(false)
    }

    /// Number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.postings.len()
    }

    /// Number of live (key, id) entries.
    pub fn entry_count(&self) -> usize {
        self.entries.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn clear(&self) {
        self.postings.clear();
        self.entries.store(0, Ordering::Relaxed);
    }

    /// Release spare capacity in the key table.
    pub fn shrink_to_fit(&self) {
        self.postings.shrink_to_fit();
    }
}
