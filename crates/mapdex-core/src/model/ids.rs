use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::tokenize::strip_symbols_keep_dash;

static HEX_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[0-9a-fA-F]+$").expect("hex id pattern is valid"));
static SITE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[0-9]+-[0-9]+$").expect("site id pattern is valid"));

/// The map-type token. It is all hex digits but never names a catalog id.
const MAP_TYPE_360: &str = "360";

/// Numeric form of a catalog id, as stored in the prefix index.
///
/// Displays as canonical lowercase hexadecimal, which is the catalog-id
/// string the record is stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NumericId(u32);

impl NumericId {
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Parse a hexadecimal catalog id.
    pub fn parse(catalog_id: &str) -> Result<Self> {
        let text = catalog_id.trim();
        if !HEX_ID.is_match(text) {
            return Err(Error::UnparseableId {
                id: catalog_id.to_string(),
            });
        }
        u32::from_str_radix(text, 16)
            .map(Self)
            .map_err(|_| Error::UnparseableId {
                id: catalog_id.to_string(),
            })
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NumericId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// Parse a hexadecimal catalog id into its numeric form.
pub fn parse_numeric_id(catalog_id: &str) -> Result<NumericId> {
    NumericId::parse(catalog_id)
}

/// Format a numeric id as the catalog-id string it resolves through.
#[must_use]
pub fn format_numeric_id(id: NumericId) -> String {
    id.to_string()
}

/// Interpret `text` as a site id.
///
/// Punctuation other than `-` and spaces are removed first. Pure hex text
/// (other than the `360` map-type token) is returned lowercased; the
/// `<digits>-<digits>` form returns its second group as lowercase hex.
/// Returns `None` when the text looks like neither.
#[must_use]
pub fn site_id(text: &str) -> Option<String> {
    let stripped = strip_symbols_keep_dash(text);

    if stripped != MAP_TYPE_360 && HEX_ID.is_match(&stripped) {
        return Some(stripped.to_lowercase());
    }

    if SITE_ID.is_match(&stripped) {
        let upload = stripped
            .split_once('-')
            .and_then(|(_, upload)| upload.parse::<u32>().ok())
            .unwrap_or(0);
        return Some(format!("{upload:x}"));
    }

    None
}
