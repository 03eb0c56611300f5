use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Free-form metadata of a record, as carried in the persisted document.
pub type Attributes = serde_json::Map<String, Value>;

/// Well-known attribute names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Version,
    SongName,
    SongSubName,
    AuthorName,
    LevelAuthor,
    Rating,
    MapType,
    SongLength,
    SongDuration,
    Njs,
    Bpm,
    /// Known performance score, mirrored into [`Record::score`].
    Score,
    /// Content hash of the level's difficulty files.
    Hash,
}

impl Field {
    /// Text attributes that feed the prefix index.
    pub const INDEXED: [Self; 5] = [
        Self::SongName,
        Self::SongSubName,
        Self::AuthorName,
        Self::LevelAuthor,
        Self::MapType,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Version => "version",
            Self::SongName => "songName",
            Self::SongSubName => "songSubName",
            Self::AuthorName => "authorName",
            Self::LevelAuthor => "levelAuthor",
            Self::Rating => "rating",
            Self::MapType => "maptype",
            Self::SongLength => "songlength",
            Self::SongDuration => "songduration",
            Self::Njs => "njs",
            Self::Bpm => "bpm",
            Self::Score => "pp",
            Self::Hash => "hash",
        }
    }
}

/// One catalog entry: identity plus its metadata document.
///
/// `catalog_id` and `version` are both lookup keys for the same record.
/// They are always present in `attributes` too, so the attribute document
/// alone is enough to rebuild the record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    catalog_id: String,
    version: String,
    local_path: Option<PathBuf>,
    score: f64,
    attributes: Attributes,
}

impl Record {
    /// Create a record with no metadata beyond its identity.
    #[must_use]
    pub fn new(catalog_id: impl Into<String>, version: impl Into<String>) -> Self {
        let catalog_id = catalog_id.into().trim().to_lowercase();
        let version = version.into();
        let mut attributes = Attributes::new();
        attributes.insert(Field::Id.as_str().to_string(), Value::String(catalog_id.clone()));
        attributes.insert(Field::Version.as_str().to_string(), Value::String(version.clone()));
        Self {
            catalog_id,
            version,
            local_path: None,
            score: 0.0,
            attributes,
        }
    }

    /// Build a record from its attribute document.
    ///
    /// `id` is required. `version` defaults to the id and `pp` sets the
    /// score. The id is trimmed and lowercased and written back, as is the
    /// resolved version.
    pub fn from_attributes(mut attributes: Attributes) -> Result<Self> {
        let catalog_id = attributes
            .get(Field::Id.as_str())
            .and_then(scalar_text)
            .map(|id| id.trim().to_lowercase())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::InvalidRecord("missing \"id\" attribute".to_string()))?;

        let version = attributes
            .get(Field::Version.as_str())
            .and_then(scalar_text)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| catalog_id.clone());

        let score = attributes
            .get(Field::Score.as_str())
            .and_then(Value::as_f64)
            .unwrap_or(0.0);

        attributes.insert(Field::Id.as_str().to_string(), Value::String(catalog_id.clone()));
        attributes.insert(Field::Version.as_str().to_string(), Value::String(version.clone()));

        Ok(Self {
            catalog_id,
            version,
            local_path: None,
            score,
            attributes,
        })
    }

    /// Attach the filesystem location of the materialized level.
    #[must_use]
    pub fn with_local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    /// Record a known score. Non-positive scores are ignored.
    #[must_use]
    pub fn with_score(mut self, score: f64) -> Self {
        if score > 0.0 {
            self.score = score;
            self.attributes
                .insert(Field::Score.as_str().to_string(), Value::from(score));
        }
        self
    }

    #[must_use]
    pub fn catalog_id(&self) -> &str {
        &self.catalog_id
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn local_path(&self) -> Option<&Path> {
        self.local_path.as_deref()
    }

    #[must_use]
    pub const fn score(&self) -> f64 {
        self.score
    }

    /// Whether a positive score is known for this record.
    #[must_use]
    pub fn has_score(&self) -> bool {
        self.score > 0.0
    }

    #[must_use]
    pub const fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    #[must_use]
    pub fn into_attributes(self) -> Attributes {
        self.attributes
    }

    /// Textual form of an attribute. Numbers are rendered, other values
    /// are treated as absent.
    #[must_use]
    pub fn text(&self, field: Field) -> Option<String> {
        self.attributes.get(field.as_str()).and_then(scalar_text)
    }

    #[must_use]
    pub fn number(&self, field: Field) -> Option<f64> {
        self.attributes.get(field.as_str()).and_then(Value::as_f64)
    }

    /// The content hash, when the level was imported from disk.
    #[must_use]
    pub fn hash(&self) -> Option<String> {
        self.text(Field::Hash).filter(|h| !h.is_empty())
    }

    /// Human-readable title: song name, with the subtitle when present.
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = self.text(Field::SongName).unwrap_or_default();
        match self.text(Field::SongSubName).filter(|s| !s.is_empty()) {
            Some(sub) => format!("{name} {sub}"),
            None => name,
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
