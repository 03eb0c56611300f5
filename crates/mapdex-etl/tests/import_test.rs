//! Integration tests for importing levels into the catalog.
//!
//! Level directories are built in a temp dir; remote results are inline
//! JSON documents, so no network access is needed.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use mapdex_core::Field;
use mapdex_etl::{ingest_query_result, spawn_scan, LevelScanner};
use mapdex_search::Catalog;
use serde_json::json;
use tempfile::TempDir;

fn write_level(root: &Path, folder: &str, song: &str, author: &str) {
    let level_dir = root.join(folder);
    fs::create_dir_all(&level_dir).unwrap();
    let info = json!({
        "_songName": song,
        "_songSubName": "",
        "_songAuthorName": author,
        "_levelAuthorName": "Mapper",
        "_beatsPerMinute": 120,
        "_difficultyBeatmapSets": [{
            "_beatmapCharacteristicName": "Standard",
            "_difficultyBeatmaps": [{ "_beatmapFilename": "Expert.dat", "_noteJumpMovementSpeed": 16 }]
        }]
    });
    fs::write(level_dir.join("info.dat"), info.to_string()).unwrap();
    // Distinct content per folder, so no two levels share a hash.
    fs::write(level_dir.join("Expert.dat"), json!({ "level": folder }).to_string()).unwrap();
}

/// Test scanning a nested directory tree of levels
#[test]
fn test_scan_directory_tree() {
    let temp_dir = TempDir::new().unwrap();
    write_level(temp_dir.path(), "2a (Rasputin - Mapper)", "Rasputin", "Boney M");
    write_level(temp_dir.path(), "packs/3b", "Animals", "Martin Garrix");
    write_level(temp_dir.path(), "Untitled Level", "Levels", "Avicii");

    let catalog = Catalog::in_memory();
    let summary = LevelScanner::new(temp_dir.path().to_path_buf())
        .scan(&catalog)
        .unwrap();

    assert_eq!(summary.found, 3);
    assert_eq!(summary.added, 3);
    assert!(catalog.lookup("2a").is_some());
    assert!(catalog.lookup("3b").is_some());

    // No site id in the folder name: a temporary id was allocated.
    let levels = catalog.lookup("100000").unwrap();
    assert_eq!(levels.version(), "100000-0");
    assert_eq!(catalog.search("avicii").unwrap().len(), 1);
    assert_eq!(catalog.search("boney rasp").unwrap().len(), 1);
}

/// Test that a moved level is found by its content hash
#[test]
fn test_rescan_relocates_moved_level() {
    let temp_dir = TempDir::new().unwrap();
    write_level(temp_dir.path(), "Untitled Level", "Levels", "Avicii");

    let catalog = Catalog::in_memory();
    assert_eq!(
        LevelScanner::new(temp_dir.path().to_path_buf())
            .scan(&catalog)
            .unwrap()
            .added,
        1
    );

    fs::rename(
        temp_dir.path().join("Untitled Level"),
        temp_dir.path().join("Renamed Level"),
    )
    .unwrap();

    let summary = LevelScanner::new(temp_dir.path().to_path_buf())
        .scan(&catalog)
        .unwrap();
    assert_eq!(summary.added, 0);
    assert_eq!(summary.relocated, 1);
    assert_eq!(catalog.stats().records, 1);
    assert_eq!(
        catalog.lookup("100000").unwrap().local_path(),
        Some(temp_dir.path().join("Renamed Level").as_path())
    );
}

/// Test that a new untitled level does not overwrite an earlier one
#[test]
fn test_rescan_with_replaced_level_keeps_both() {
    let temp_dir = TempDir::new().unwrap();
    write_level(temp_dir.path(), "Alpha Level", "Alphasong", "Someone");

    let catalog = Catalog::in_memory();
    LevelScanner::new(temp_dir.path().to_path_buf())
        .scan(&catalog)
        .unwrap();
    let alpha_path = temp_dir.path().join("Alpha Level");
    assert_eq!(catalog.lookup("100000").unwrap().local_path(), Some(alpha_path.as_path()));

    fs::remove_dir_all(&alpha_path).unwrap();
    write_level(temp_dir.path(), "Beta Level", "Betasong", "Someone Else");

    // A fresh scanner starts its counter over; the id in use is skipped.
    let summary = LevelScanner::new(temp_dir.path().to_path_buf())
        .scan(&catalog)
        .unwrap();
    assert_eq!(summary.added, 1);
    assert_eq!(summary.relocated, 0);
    assert_eq!(catalog.stats().records, 2);

    let alpha = catalog.lookup("100000").unwrap();
    assert_eq!(alpha.text(Field::SongName).as_deref(), Some("Alphasong"));
    assert_eq!(alpha.local_path(), Some(alpha_path.as_path()));

    let beta = catalog.search("betasong").unwrap();
    assert_eq!(beta.len(), 1);
    assert_eq!(beta[0].catalog_id(), "100001");
    assert_eq!(beta[0].version(), "100001-0");
    assert_eq!(catalog.search("alphasong").unwrap().len(), 1);
}

/// Test that temporary ids in a reopened catalog are not reused
#[test]
fn test_temporary_ids_survive_reopen() {
    let levels = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    write_level(levels.path(), "First Untitled", "Firstsong", "Someone");

    let catalog = Catalog::open(data.path());
    LevelScanner::new(levels.path().to_path_buf())
        .scan(&catalog)
        .unwrap();
    assert_eq!(catalog.shutdown(), Some(1));

    write_level(levels.path(), "Second Untitled", "Secondsong", "Someone");
    let reopened = Catalog::open(data.path());
    let summary = LevelScanner::new(levels.path().to_path_buf())
        .scan(&reopened)
        .unwrap();

    assert_eq!(summary.added, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(reopened.stats().records, 2);
    assert_eq!(reopened.search("firstsong").unwrap()[0].catalog_id(), "100000");
    assert_eq!(reopened.search("secondsong").unwrap()[0].catalog_id(), "100001");
}

/// Test the background scan, its re-entrancy and completion signal
#[tokio::test]
async fn test_background_scan_signals_completion() {
    let temp_dir = TempDir::new().unwrap();
    for n in 0..20 {
        write_level(temp_dir.path(), &format!("{:x}", 0x100 + n), &format!("Track {n}"), "Various");
    }

    let catalog = Arc::new(Catalog::in_memory());
    let handle = spawn_scan(&catalog, temp_dir.path().to_path_buf()).unwrap();

    // A second request while the first runs is a no-op. The first may
    // already have finished on a fast machine, in which case a new scan is
    // allowed and simply finds the same levels.
    if let Some(second) = spawn_scan(&catalog, temp_dir.path().to_path_buf()) {
        second.await.unwrap().unwrap();
    }

    catalog.wait_for_import().await;
    let summary = handle.await.unwrap().unwrap();

    assert_eq!(summary.found, 20);
    assert!(!catalog.is_importing());
    assert_eq!(catalog.stats().records, 20);
    assert_eq!(catalog.search("various track").unwrap().len(), 20);
}

/// Test that search keeps working while a scan is importing
#[tokio::test]
async fn test_search_during_background_scan() {
    let temp_dir = TempDir::new().unwrap();
    for n in 0..50 {
        write_level(temp_dir.path(), &format!("{:x}", 0x1000 + n), "Bulk", "Importer");
    }

    let catalog = Arc::new(Catalog::in_memory());
    catalog
        .index_record(mapdex_core::Record::new("ffff", "ffff"))
        .unwrap();
    let handle = spawn_scan(&catalog, temp_dir.path().to_path_buf()).unwrap();

    while catalog.is_importing() {
        let hits = catalog.search("bulk importer").unwrap();
        assert!(hits.len() <= 50);
        assert!(catalog.lookup("ffff").is_some());
        tokio::task::yield_now().await;
    }

    handle.await.unwrap().unwrap();
    assert_eq!(catalog.search("bulk importer").unwrap().len(), 50);
}

/// Test that a remote result merges with a scanned level
#[test]
fn test_remote_result_merges_with_scanned_level() {
    let temp_dir = TempDir::new().unwrap();
    write_level(temp_dir.path(), "2a", "Rasputin", "Boney M");

    let catalog = Catalog::in_memory();
    LevelScanner::new(temp_dir.path().to_path_buf())
        .scan(&catalog)
        .unwrap();

    let result = json!({
        "docs": [{
            "key": "2a",
            "metadata": {
                "songName": "Rasputin",
                "songSubName": "Funk Overload",
                "songAuthorName": "Boney M",
                "levelAuthorName": "Kival",
                "characteristics": []
            },
            "stats": { "rating": 0.9 }
        }]
    });

    let hits = ingest_query_result(&catalog, &result, "funk").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].local_path(), Some(temp_dir.path().join("2a").as_path()));
    assert_eq!(catalog.stats().records, 1);
    // The scanned mapper name is replaced, not merged.
    assert!(catalog.search("mapper").unwrap().is_empty());
}

/// Test that a persisted catalog survives a scan and reopen
#[test]
fn test_scan_then_reopen() {
    let levels = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    write_level(levels.path(), "4d2", "Nothing Alike", "Someone");

    let catalog = Catalog::open(data.path());
    LevelScanner::new(levels.path().to_path_buf())
        .scan(&catalog)
        .unwrap();
    assert_eq!(catalog.shutdown(), Some(1));

    let reopened = Catalog::open(data.path());
    assert_eq!(reopened.search("77-1234").unwrap().len(), 1);
    assert_eq!(reopened.search("nothing alike").unwrap().len(), 1);
}
