//! Ingestion of remote query results.
//!
//! The level site answers queries with either a `{"docs": [...]}` page or a
//! single map document. Remote documents carry their metadata nested under
//! `metadata` and `stats`; they are flattened into the catalog's attribute
//! layout before being ingested.

use std::path::Path;
use std::sync::Arc;

use mapdex_core::{Attributes, Field, Record};
use mapdex_search::Catalog;
use serde_json::Value;

use crate::error::ImportResult;
use crate::scan::ROTATING_CHARACTERISTICS;

fn put(attrs: &mut Attributes, field: Field, value: Value) {
    attrs.insert(field.as_str().to_string(), value);
}

fn metadata_text(metadata: Option<&Value>, key: &str) -> Value {
    let text = metadata
        .and_then(|m| m.get(key))
        .and_then(Value::as_str)
        .unwrap_or_default();
    Value::from(text)
}

/// `m:ss` rendering of a length in seconds.
fn song_length(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Flatten a remote map document into catalog attributes.
///
/// Documents that already carry a string `version` are in catalog layout
/// and are returned unchanged. Otherwise `key` becomes both `id` and
/// `version`, and the nested metadata is lifted to top-level attributes.
pub fn normalize_remote(mut doc: Attributes) -> Attributes {
    if doc.get(Field::Version.as_str()).is_some_and(Value::is_string) {
        return doc;
    }

    let key = doc.get("key").cloned().unwrap_or(Value::Null);
    put(&mut doc, Field::Id, key.clone());
    put(&mut doc, Field::Version, key);

    let metadata = doc.get("metadata").cloned();
    let metadata = metadata.as_ref();
    put(&mut doc, Field::SongName, metadata_text(metadata, "songName"));
    put(&mut doc, Field::SongSubName, metadata_text(metadata, "songSubName"));
    put(&mut doc, Field::AuthorName, metadata_text(metadata, "songAuthorName"));
    put(&mut doc, Field::LevelAuthor, metadata_text(metadata, "levelAuthorName"));

    let rating = doc
        .get("stats")
        .and_then(|s| s.get("rating"))
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    put(&mut doc, Field::Rating, Value::from(rating * 100.0));

    let characteristics = metadata
        .and_then(|m| m.get("characteristics"))
        .and_then(Value::as_array);
    let Some(characteristics) = characteristics else {
        return doc;
    };

    let rotating = characteristics.iter().any(|c| {
        c.get("name")
            .and_then(Value::as_str)
            .is_some_and(|name| ROTATING_CHARACTERISTICS.contains(&name))
    });

    // Lengths and note jump speeds come from the first characteristic only.
    let difficulties: Vec<&Value> = match characteristics.first().and_then(|c| c.get("difficulties")) {
        Some(Value::Object(map)) => map.values().collect(),
        Some(Value::Array(list)) => list.iter().collect(),
        _ => Vec::new(),
    };

    let mut max_njs = 0.0_f64;
    for difficulty in difficulties.into_iter().filter(|d| !d.is_null()) {
        if let Some(njs) = difficulty.get("njs").and_then(Value::as_f64) {
            max_njs = max_njs.max(njs);
        }
        let length = difficulty.get("length").and_then(Value::as_u64).unwrap_or(0);
        if length > 0 {
            put(&mut doc, Field::SongLength, Value::from(song_length(length)));
            put(&mut doc, Field::SongDuration, Value::from(length));
        }
    }

    if max_njs > 0.0 {
        put(&mut doc, Field::Njs, Value::from(max_njs));
    }
    if rotating {
        put(&mut doc, Field::MapType, Value::from("360"));
    }
    doc
}

/// Map documents contained in a query result.
fn documents(result: &Value) -> Vec<Attributes> {
    match result.get("docs") {
        Some(Value::Array(docs)) => docs
            .iter()
            .filter_map(|doc| match doc {
                Value::Object(map) => Some(map.clone()),
                other => {
                    log::warn!("Skipping remote result entry: not an object ({})", other);
                    None
                }
            })
            .collect(),
        _ => match result {
            Value::Object(map) => vec![map.clone()],
            Value::Null => Vec::new(),
            other => {
                log::warn!("Ignoring remote result: not an object ({})", other);
                Vec::new()
            }
        },
    }
}

/// Records built from a query result. Documents without an id are logged
/// and skipped.
pub fn records_from_result(result: &Value) -> Vec<Record> {
    documents(result)
        .into_iter()
        .map(normalize_remote)
        .filter_map(|attrs| match Record::from_attributes(attrs) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Skipping remote document: {}", e);
                None
            }
        })
        .collect()
}

/// Add every map in `result` to the catalog, then answer `query` from it.
///
/// Remote documents replace any existing record with the same id, keeping
/// the local path of the level already on disk.
pub fn ingest_query_result(
    catalog: &Catalog,
    result: &Value,
    query: &str,
) -> ImportResult<Vec<Arc<Record>>> {
    let records = records_from_result(result);
    log::debug!("Ingesting {} remote documents for {:?}", records.len(), query);

    for record in records {
        let local_path = catalog
            .lookup(record.catalog_id())
            .and_then(|existing| existing.local_path().map(Path::to_path_buf));
        let record = match local_path {
            Some(path) => record.with_local_path(path),
            None => record,
        };
        catalog.ingest(record)?;
    }

    Ok(catalog.search(query)?)
}
