use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use mapdex_core::model::site_id;
use mapdex_core::{Attributes, Field, Record};
use mapdex_search::Catalog;
use tokio::task::JoinHandle;
use walkdir::WalkDir;
use xxhash_rust::xxh3::Xxh3;

use crate::error::{ImportError, ImportResult};

/// Names of level info documents.
pub const INFO_FILES: [&str; 2] = ["info.dat", "info.json"];

/// Levels with no recognizable site id get sequential ids from here,
/// skipping any already present in the catalog.
const FIRST_TEMP_ID: u32 = 100_000;

/// Characteristics that mark a level as a rotating (360) map.
pub(crate) const ROTATING_CHARACTERISTICS: [&str; 2] = ["360Degree", "90Degree"];

/// Separator between the parts hashed into a level hash.
const HASH_SEPARATOR: &str = "\u{220e}";

/// Counters for one directory scan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    /// Info documents found.
    pub found: usize,
    /// New records indexed.
    pub added: usize,
    /// Known records whose local path was updated.
    pub relocated: usize,
    /// Known records left as they were.
    pub skipped: usize,
    /// Levels that could not be read.
    pub failed: usize,
    /// Levels whose documents were unusable.
    pub malformed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LevelOutcome {
    Added,
    Relocated,
    Known,
}

/// Metadata read from a level info document.
#[derive(Debug, Default)]
struct LevelInfo {
    song_name: String,
    song_sub_name: String,
    author_name: String,
    level_author: String,
    bpm: Option<f64>,
    difficulty_files: Vec<String>,
    rotating: bool,
    max_njs: f64,
}

/// Walks a directory of downloaded levels and indexes each one.
#[derive(Debug)]
pub struct LevelScanner {
    songs_dir: PathBuf,
    next_temp_id: AtomicU32,
}

impl LevelScanner {
    #[must_use]
    pub fn new(songs_dir: PathBuf) -> Self {
        Self {
            songs_dir,
            next_temp_id: AtomicU32::new(FIRST_TEMP_ID),
        }
    }

    #[must_use]
    pub fn songs_dir(&self) -> &Path {
        &self.songs_dir
    }

    fn is_info_file(path: &Path) -> bool {
        path.file_name()
            .map(|name| {
                let name = name.to_string_lossy().to_lowercase();
                INFO_FILES.contains(&name.as_str())
            })
            .unwrap_or(false)
    }

    /// Derive `(catalog id, version)` for a level directory from its site
    /// id.
    ///
    /// The deepest path component below the scan root that reads as a site
    /// id wins: either the whole name, or the part before ` (` in download
    /// folders named `<key> (<song> - <mapper>)`.
    fn site_key(&self, level_dir: &Path) -> Option<(String, String)> {
        let relative = level_dir.strip_prefix(&self.songs_dir).unwrap_or(level_dir);

        for component in relative.components().rev() {
            let name = component.as_os_str().to_string_lossy();
            let key = name.split(" (").next().unwrap_or(&name).trim();
            for candidate in [name.trim(), key] {
                if let Some(id) = site_id(candidate) {
                    return Some((id, candidate.to_string()));
                }
            }
        }
        None
    }

    /// Next temporary `(catalog id, version)` not yet used in `catalog`.
    ///
    /// A fresh scanner restarts the counter, so ids held by levels from
    /// earlier scans or a loaded snapshot are stepped over.
    fn allocate_temp_id(&self, catalog: &Catalog) -> (String, String) {
        loop {
            let id = self.next_temp_id.fetch_add(1, Ordering::Relaxed).to_string();
            if !catalog.contains(&id) {
                let version = format!("{id}-0");
                return (id, version);
            }
            log::trace!("Temporary id {} is taken", id);
        }
    }

    /// Scan the songs directory into `catalog`.
    ///
    /// Unreadable and malformed levels are logged and counted; only a
    /// closed catalog stops the scan.
    pub fn scan(&self, catalog: &Catalog) -> ImportResult<ScanSummary> {
        log::info!("Starting scan of {}", self.songs_dir.display());
        let mut summary = ScanSummary::default();

        for entry in WalkDir::new(&self.songs_dir).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Could not access {}: {}", self.songs_dir.display(), e);
                    summary.failed += 1;
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file() || !Self::is_info_file(path) {
                continue;
            }
            summary.found += 1;
            log::debug!("Scanning: {}", path.display());

            match self.import_level(catalog, path) {
                Ok(LevelOutcome::Added) => summary.added += 1,
                Ok(LevelOutcome::Relocated) => summary.relocated += 1,
                Ok(LevelOutcome::Known) => summary.skipped += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) if e.is_malformed() => {
                    log::warn!("Skipping malformed level: {}", e);
                    summary.malformed += 1;
                }
                Err(e) => {
                    log::warn!("Skipping unreadable level: {}", e);
                    summary.failed += 1;
                }
            }
        }

        log::info!(
            "Scan complete: {} found, {} added, {} relocated, {} failed, {} malformed",
            summary.found,
            summary.added,
            summary.relocated,
            summary.failed,
            summary.malformed
        );
        Ok(summary)
    }

    fn import_level(&self, catalog: &Catalog, info_path: &Path) -> ImportResult<LevelOutcome> {
        let level_dir = info_path.parent().unwrap_or(Path::new("."));
        let site_key = self.site_key(level_dir);

        if let Some((id, _)) = &site_key {
            if let Some(existing) = catalog.lookup(id) {
                return Ok(relocate(catalog, id, existing.local_path(), level_dir));
            }
        }

        let text = fs::read_to_string(info_path).map_err(|source| ImportError::Io {
            path: info_path.to_path_buf(),
            source,
        })?;
        let info = parse_info(info_path, &text)?;
        let hash = level_hash(level_dir, &info);

        if let Some(existing) = catalog.lookup_hash(&hash) {
            let key = existing.catalog_id().to_string();
            return Ok(relocate(catalog, &key, existing.local_path(), level_dir));
        }

        // Levels without a site id are only known by their hash, so the
        // temporary id is allocated once the hash has missed.
        let (id, version) = match site_key {
            Some(key) => key,
            None => self.allocate_temp_id(catalog),
        };
        let record = Record::from_attributes(info.into_attributes(&id, &version, hash))
            .map_err(|e| ImportError::Malformed {
                path: info_path.to_path_buf(),
                message: e.to_string(),
            })?
            .with_local_path(level_dir);

        catalog.index_record(record)?;
        Ok(LevelOutcome::Added)
    }
}

fn relocate(catalog: &Catalog, key: &str, current: Option<&Path>, level_dir: &Path) -> LevelOutcome {
    if current == Some(level_dir) {
        return LevelOutcome::Known;
    }
    if catalog.set_local_path(key, level_dir) {
        LevelOutcome::Relocated
    } else {
        LevelOutcome::Known
    }
}

/// First present value among `keys`.
fn lookup<'a>(doc: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| doc.get(*key))
}

fn lookup_str(doc: &Map<String, Value>, keys: &[&str]) -> String {
    lookup(doc, keys)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Parse an info document in either the legacy (`songName`) or the
/// underscore-prefixed (`_songName`) layout.
fn parse_info(path: &Path, text: &str) -> ImportResult<LevelInfo> {
    let document: Value = serde_json::from_str(text).map_err(|source| ImportError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let Value::Object(doc) = document else {
        return Err(ImportError::Malformed {
            path: path.to_path_buf(),
            message: "info document is not an object".to_string(),
        });
    };

    let mut info = LevelInfo {
        song_name: lookup_str(&doc, &["songName", "_songName"]),
        song_sub_name: lookup_str(&doc, &["songSubName", "_songSubName"]),
        author_name: lookup_str(&doc, &["authorName", "songAuthorName", "_songAuthorName"]),
        level_author: lookup_str(&doc, &["levelAuthorName", "_levelAuthorName"]),
        bpm: lookup(&doc, &["beatsPerMinute", "_beatsPerMinute"]).and_then(Value::as_f64),
        ..LevelInfo::default()
    };

    if info.song_name.trim().is_empty() {
        return Err(ImportError::Malformed {
            path: path.to_path_buf(),
            message: "missing song name".to_string(),
        });
    }

    if let Some(levels) = doc.get("difficultyLevels").and_then(Value::as_array) {
        for level in levels {
            if let Some(file) = level.get("jsonPath").and_then(Value::as_str) {
                info.difficulty_files.push(file.to_string());
            }
        }
    }

    if let Some(sets) = doc.get("_difficultyBeatmapSets").and_then(Value::as_array) {
        for set in sets {
            let characteristic = set
                .get("_beatmapCharacteristicName")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if ROTATING_CHARACTERISTICS.contains(&characteristic) {
                info.rotating = true;
            }

            let beatmaps = set.get("_difficultyBeatmaps").and_then(Value::as_array);
            for beatmap in beatmaps.into_iter().flatten() {
                if let Some(file) = beatmap.get("_beatmapFilename").and_then(Value::as_str) {
                    info.difficulty_files.push(file.to_string());
                }
                if let Some(njs) = beatmap.get("_noteJumpMovementSpeed").and_then(Value::as_f64) {
                    info.max_njs = info.max_njs.max(njs);
                }
            }
        }
    }

    Ok(info)
}

/// Hash of the level's difficulty files plus its identifying metadata.
///
/// Missing difficulty files are skipped.
fn level_hash(level_dir: &Path, info: &LevelInfo) -> String {
    let mut hasher = Xxh3::new();
    for file in &info.difficulty_files {
        match fs::read(level_dir.join(file)) {
            Ok(bytes) => hasher.update(&bytes),
            Err(e) => log::debug!("Cannot read difficulty {} in {}: {}", file, level_dir.display(), e),
        }
    }

    let bpm = info.bpm.map(|b| b.to_string()).unwrap_or_default();
    for part in [
        info.song_name.as_str(),
        info.song_sub_name.as_str(),
        info.author_name.as_str(),
        bpm.as_str(),
    ] {
        hasher.update(HASH_SEPARATOR.as_bytes());
        hasher.update(part.as_bytes());
    }

    format!("{:032x}", hasher.digest128())
}

impl LevelInfo {
    fn into_attributes(self, id: &str, version: &str, hash: String) -> Attributes {
        let mut attrs = Attributes::new();
        let mut put = |field: Field, value: Value| {
            attrs.insert(field.as_str().to_string(), value);
        };

        put(Field::Id, Value::from(id));
        put(Field::Version, Value::from(version));
        put(Field::SongName, Value::from(self.song_name));
        put(Field::SongSubName, Value::from(self.song_sub_name));
        put(Field::AuthorName, Value::from(self.author_name));
        put(Field::LevelAuthor, Value::from(self.level_author));
        put(Field::Hash, Value::from(hash));
        if let Some(bpm) = self.bpm {
            put(Field::Bpm, Value::from(bpm));
        }
        if self.max_njs > 0.0 {
            put(Field::Njs, Value::from(self.max_njs));
        }
        if self.rotating {
            put(Field::MapType, Value::from("360"));
        }
        attrs
    }
}

/// Scan `songs_dir` on the blocking pool.
///
/// Returns `None` when an import is already running. The import guard is
/// released, compacting the catalog and signalling waiters, before the task
/// completes.
pub fn spawn_scan(
    catalog: &Arc<Catalog>,
    songs_dir: PathBuf,
) -> Option<JoinHandle<ImportResult<ScanSummary>>> {
    let guard = catalog.begin_import()?;
    let scanner = LevelScanner::new(songs_dir);

    Some(tokio::task::spawn_blocking(move || {
        let result = scanner.scan(guard.catalog());
        drop(guard);
        result
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LEGACY_INFO: &str = r#"{
        "songName": "Rasputin",
        "songSubName": "(Funk Overload)",
        "authorName": "Boney M",
        "beatsPerMinute": 126,
        "difficultyLevels": [{ "difficulty": "Expert", "jsonPath": "Expert.json" }]
    }"#;

    const V2_INFO: &str = r#"{
        "_songName": "Levels",
        "_songSubName": "",
        "_songAuthorName": "Avicii",
        "_levelAuthorName": "Freeek",
        "_beatsPerMinute": 126,
        "_difficultyBeatmapSets": [
            {
                "_beatmapCharacteristicName": "Standard",
                "_difficultyBeatmaps": [
                    { "_beatmapFilename": "Hard.dat", "_noteJumpMovementSpeed": 14 },
                    { "_beatmapFilename": "Expert.dat", "_noteJumpMovementSpeed": 18 }
                ]
            },
            {
                "_beatmapCharacteristicName": "360Degree",
                "_difficultyBeatmaps": [
                    { "_beatmapFilename": "Expert360.dat", "_noteJumpMovementSpeed": 16 }
                ]
            }
        ]
    }"#;

    #[test]
    fn test_is_info_file() {
        assert!(LevelScanner::is_info_file(Path::new("/levels/1a/info.dat")));
        assert!(LevelScanner::is_info_file(Path::new("/levels/1a/Info.dat")));
        assert!(LevelScanner::is_info_file(Path::new("/levels/1a/info.json")));
        assert!(!LevelScanner::is_info_file(Path::new("/levels/1a/Expert.dat")));
    }

    #[test]
    fn test_site_key_hex_folder() {
        let scanner = LevelScanner::new(PathBuf::from("/levels"));
        assert_eq!(
            scanner.site_key(Path::new("/levels/4D2")),
            Some(("4d2".to_string(), "4D2".to_string()))
        );
    }

    #[test]
    fn test_site_key_compound_folder() {
        let scanner = LevelScanner::new(PathBuf::from("/levels"));
        assert_eq!(
            scanner.site_key(Path::new("/levels/77-1234")),
            Some(("4d2".to_string(), "77-1234".to_string()))
        );
    }

    #[test]
    fn test_site_key_download_folder() {
        let scanner = LevelScanner::new(PathBuf::from("/levels"));
        assert_eq!(
            scanner.site_key(Path::new("/levels/1a2b (Levels - Freeek)")),
            Some(("1a2b".to_string(), "1a2b".to_string()))
        );
        assert_eq!(scanner.site_key(Path::new("/levels/My Level")), None);
    }

    #[test]
    fn test_allocate_temporary_ids() {
        let catalog = Catalog::in_memory();
        let scanner = LevelScanner::new(PathBuf::from("/levels"));
        assert_eq!(
            scanner.allocate_temp_id(&catalog),
            ("100000".to_string(), "100000-0".to_string())
        );
        assert_eq!(scanner.allocate_temp_id(&catalog).0, "100001");
    }

    #[test]
    fn test_allocate_skips_ids_in_catalog() {
        let catalog = Catalog::in_memory();
        catalog.index_record(Record::new("100000", "100000-0")).unwrap();
        catalog.index_record(Record::new("100001", "100001-0")).unwrap();

        let scanner = LevelScanner::new(PathBuf::from("/levels"));
        assert_eq!(scanner.allocate_temp_id(&catalog).0, "100002");
    }

    #[test]
    fn test_parse_legacy_info() {
        let info = parse_info(Path::new("info.json"), LEGACY_INFO).unwrap();
        assert_eq!(info.song_name, "Rasputin");
        assert_eq!(info.author_name, "Boney M");
        assert_eq!(info.difficulty_files, vec!["Expert.json"]);
        assert!(!info.rotating);
    }

    #[test]
    fn test_parse_v2_info() {
        let info = parse_info(Path::new("info.dat"), V2_INFO).unwrap();
        assert_eq!(info.song_name, "Levels");
        assert_eq!(info.level_author, "Freeek");
        assert_eq!(info.difficulty_files.len(), 3);
        assert!(info.rotating);
        assert!((info.max_njs - 18.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_rejects_bad_documents() {
        let err = parse_info(Path::new("info.dat"), "{ nope").unwrap_err();
        assert!(matches!(err, ImportError::Parse { .. }));
        assert!(err.is_malformed());

        let err = parse_info(Path::new("info.dat"), r#"{"_songAuthorName": "x"}"#).unwrap_err();
        assert!(matches!(err, ImportError::Malformed { .. }));
    }

    #[test]
    fn test_level_hash_depends_on_difficulty_content() {
        let temp_dir = TempDir::new().unwrap();
        let info = parse_info(Path::new("info.json"), LEGACY_INFO).unwrap();

        fs::write(temp_dir.path().join("Expert.json"), "notes-a").unwrap();
        let first = level_hash(temp_dir.path(), &info);
        assert_eq!(first.len(), 32);
        assert_eq!(first, level_hash(temp_dir.path(), &info));

        fs::write(temp_dir.path().join("Expert.json"), "notes-b").unwrap();
        assert_ne!(first, level_hash(temp_dir.path(), &info));
    }

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = Catalog::in_memory();
        let scanner = LevelScanner::new(temp_dir.path().to_path_buf());

        let summary = scanner.scan(&catalog).unwrap();
        assert_eq!(summary, ScanSummary::default());
    }

    #[test]
    fn test_scan_indexes_levels() {
        let temp_dir = TempDir::new().unwrap();
        let level_dir = temp_dir.path().join("1a2b (Levels - Freeek)");
        fs::create_dir_all(&level_dir).unwrap();
        fs::write(level_dir.join("info.dat"), V2_INFO).unwrap();
        fs::write(level_dir.join("Expert.dat"), "{}").unwrap();
        fs::write(temp_dir.path().join("readme.txt"), "not a level").unwrap();

        let catalog = Catalog::in_memory();
        let scanner = LevelScanner::new(temp_dir.path().to_path_buf());
        let summary = scanner.scan(&catalog).unwrap();

        assert_eq!(summary.found, 1);
        assert_eq!(summary.added, 1);

        let record = catalog.lookup("1a2b").unwrap();
        assert_eq!(record.local_path(), Some(level_dir.as_path()));
        assert_eq!(record.text(Field::MapType).as_deref(), Some("360"));
        assert!(record.hash().is_some());
        assert_eq!(catalog.search("avicii levels").unwrap().len(), 1);
        assert_eq!(catalog.search("360").unwrap().len(), 1);
    }

    #[test]
    fn test_rescan_skips_known_levels() {
        let temp_dir = TempDir::new().unwrap();
        let level_dir = temp_dir.path().join("4d2");
        fs::create_dir_all(&level_dir).unwrap();
        fs::write(level_dir.join("info.json"), LEGACY_INFO).unwrap();

        let catalog = Catalog::in_memory();
        let scanner = LevelScanner::new(temp_dir.path().to_path_buf());
        assert_eq!(scanner.scan(&catalog).unwrap().added, 1);

        let summary = scanner.scan(&catalog).unwrap();
        assert_eq!(summary.added, 0);
        assert_eq!(summary.skipped, 1);
        assert_eq!(catalog.stats().records, 1);
    }

    #[test]
    fn test_scan_counts_malformed_levels() {
        let temp_dir = TempDir::new().unwrap();
        let level_dir = temp_dir.path().join("bad");
        fs::create_dir_all(&level_dir).unwrap();
        fs::write(level_dir.join("info.dat"), "not json").unwrap();

        let catalog = Catalog::in_memory();
        let summary = LevelScanner::new(temp_dir.path().to_path_buf())
            .scan(&catalog)
            .unwrap();

        assert_eq!(summary.found, 1);
        assert_eq!(summary.malformed, 1);
        assert_eq!(catalog.stats().records, 0);
    }

    #[test]
    fn test_scan_into_closed_catalog_stops() {
        let temp_dir = TempDir::new().unwrap();
        let level_dir = temp_dir.path().join("4d2");
        fs::create_dir_all(&level_dir).unwrap();
        fs::write(level_dir.join("info.json"), LEGACY_INFO).unwrap();

        let catalog = Catalog::in_memory();
        catalog.shutdown();
        let result = LevelScanner::new(temp_dir.path().to_path_buf()).scan(&catalog);
        assert!(result.is_err());
    }
}
