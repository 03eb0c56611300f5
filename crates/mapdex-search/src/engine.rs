//! Query resolution.
//!
//! A query is first tried as a catalog identifier. Otherwise it is
//! tokenized and every token must match an index key exactly: the result is
//! the intersection of the per-token candidate sets, scanned from the
//! smallest set.

use std::sync::Arc;

use mapdex_core::model::{format_numeric_id, site_id};
use mapdex_core::tokenize::{strip_symbols_keep_dash, tokenize};
use mapdex_core::Record;

use crate::index::PrefixIndex;
use crate::store::CatalogStore;

/// Resolve `query` against the current catalog state.
///
/// Term results come back in ascending numeric id order. No ranking is
/// applied.
pub fn search(store: &CatalogStore, index: &PrefixIndex, query: &str) -> Vec<Arc<Record>> {
    if let Some(record) = exact_match(store, query) {
        return vec![record];
    }
    term_search(store, index, query)
}

/// Treat `query` as an identifier: a hex catalog id or a `<digits>-<digits>`
/// site id. Tries the computed catalog id, then the stripped text itself,
/// which is how version aliases are stored.
pub fn exact_match(store: &CatalogStore, query: &str) -> Option<Arc<Record>> {
    let computed = site_id(query)?;
    store.lookup(&computed).or_else(|| {
        let stripped = strip_symbols_keep_dash(query);
        store.lookup(&stripped)
    })
}

/// Conjunctive search over query tokens. Tokens are not prefix-expanded.
pub fn term_search(store: &CatalogStore, index: &PrefixIndex, query: &str) -> Vec<Arc<Record>> {
    let tokens = tokenize(query);
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut ranked: Vec<(usize, &String)> = Vec::with_capacity(tokens.len());
    for token in &tokens {
        let cardinality = index.cardinality(token);
        if cardinality == 0 {
            log::debug!("No index entry for {:?}, query {:?} has no matches", token, query);
            return Vec::new();
        }
        ranked.push((cardinality, token));
    }
    ranked.sort_by_key(|(cardinality, _)| *cardinality);

    let Some(((_, smallest), rest)) = ranked.split_first() else {
        return Vec::new();
    };
    // Only the most selective set is copied. The others answer membership
    // checks in place.
    let Some(candidates) = index.candidates(smallest) else {
        return Vec::new();
    };

    candidates
        .into_iter()
        .filter(|id| rest.iter().all(|(_, token)| index.contains(token, *id)))
        .filter_map(|id| {
            let key = format_numeric_id(id);
            let record = store.lookup(&key);
            if record.is_none() {
                log::debug!("Dropping stale index entry {}", key);
            }
            record
        })
        .collect()
}
