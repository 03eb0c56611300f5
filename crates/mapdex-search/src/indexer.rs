//! Derives prefix-index entries from record metadata.
//!
//! Every token of every indexed attribute is expanded into all of its
//! prefixes from [`MIN_PREFIX_LEN`] characters up to the full token, so a
//! partially typed word matches with a single key lookup. Tokens shorter
//! than the minimum are indexed verbatim.

use std::sync::Arc;

use mapdex_core::model::parse_numeric_id;
use mapdex_core::tokenize::tokenize;
use mapdex_core::{Field, Record};

use crate::error::{CatalogError, CatalogResult};
use crate::index::{PrefixIndex, MIN_PREFIX_LEN};
use crate::store::CatalogStore;

/// Synthetic token indexed for records with a known score.
pub const SCORED_TOKEN: &str = "pp";

/// Writes records into the store and the prefix index.
///
/// Re-indexing a record that is already indexed leaves its old keys in
/// place; call [`Indexer::unindex_record`] on the old record first.
#[derive(Debug, Clone, Copy)]
pub struct Indexer<'a> {
    store: &'a CatalogStore,
    index: &'a PrefixIndex,
}

impl<'a> Indexer<'a> {
    pub fn new(store: &'a CatalogStore, index: &'a PrefixIndex) -> Self {
        Self { store, index }
    }

    /// Every index key the record produces, in generation order.
    /// Keys repeat when several attributes share a token.
    pub fn index_keys(record: &Record) -> Vec<String> {
        let mut keys = Vec::new();

        let mut texts: Vec<String> = Vec::with_capacity(Field::INDEXED.len() + 1);
        for field in Field::INDEXED {
            if let Some(text) = record.text(field) {
                texts.push(text);
            }
        }
        if record.has_score() {
            texts.push(SCORED_TOKEN.to_string());
        }

        for text in &texts {
            for token in tokenize(text) {
                push_prefixes(&token, &mut keys);
            }
        }
        keys
    }

    /// Store the record and index its metadata.
    ///
    /// The record is stored even when its catalog id does not parse; it is
    /// then reachable by key but never by free text, and
    /// [`CatalogError::UnparseableId`] is returned for the caller to log.
    pub fn index_record(&self, record: impl Into<Arc<Record>>) -> CatalogResult<Arc<Record>> {
        let record = self.store.upsert(record);

        let id = parse_numeric_id(record.catalog_id()).map_err(|_| CatalogError::UnparseableId {
            id: record.catalog_id().to_string(),
        })?;

        let mut added = 0usize;
        for key in Self::index_keys(&record) {
            if self.index.insert(&key, id) {
                added += 1;
            }
        }
        log::trace!("Indexed {} under {} keys", record.catalog_id(), added);

        Ok(record)
    }

    /// Remove the record's index entries and its catalog keys.
    ///
    /// Returns the number of index entries removed.
    pub fn unindex_record(&self, record: &Record) -> usize {
        let mut removed = 0usize;
        if let Ok(id) = parse_numeric_id(record.catalog_id()) {
            for key in Self::index_keys(record) {
                if self.index.remove(&key, id) {
                    removed += 1;
                }
            }
        }
        self.store.remove(record.catalog_id());
        removed
    }
}

/// Push the keys for one token: the token itself when short, otherwise
/// every prefix of at least [`MIN_PREFIX_LEN`] characters.
fn push_prefixes(token: &str, keys: &mut Vec<String>) {
    let ends: Vec<usize> = token
        .char_indices()
        .map(|(start, c)| start + c.len_utf8())
        .collect();

    if ends.len() < MIN_PREFIX_LEN {
        keys.push(token.to_string());
        return;
    }

    for &end in &ends[MIN_PREFIX_LEN - 1..] {
        keys.push(token[..end].to_string());
    }
}
