//! Text normalization shared by indexing and search.
//!
//! Both sides must tokenize identically: a query token only matches when it
//! equals a key the indexer produced.

/// ASCII punctuation treated as a word separator.
pub const SEPARATORS: [char; 16] = [
    '@', '*', '+', ':', '-', '<', '~', '>', '(', ')', '[', ']', '/', '\\', '.', ',',
];

fn is_separator(c: char) -> bool {
    SEPARATORS.contains(&c)
}

fn is_separator_keep_dash(c: char) -> bool {
    c != '-' && is_separator(c)
}

fn split_with(text: &str, separator: fn(char) -> bool) -> Vec<String> {
    let replaced: String = text
        .chars()
        .map(|c| if separator(c) { ' ' } else { c })
        .collect();

    replaced
        .to_lowercase()
        .split_whitespace()
        .map(String::from)
        .collect()
}

/// Split text into lowercase tokens.
///
/// # Example
///
/// ```
/// use mapdex_core::tokenize::tokenize;
///
/// assert_eq!(tokenize("Skrillex - Bangarang (feat. Sirah)"),
///     vec!["skrillex", "bangarang", "feat", "sirah"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    split_with(text, is_separator)
}

/// Like [`tokenize`], but `-` is kept so compound site ids such as
/// `1234-5` survive as a single token.
pub fn tokenize_keep_dash(text: &str) -> Vec<String> {
    split_with(text, is_separator_keep_dash)
}

/// Remove separator punctuation (except `-`) and spaces, keeping case.
pub fn strip_symbols_keep_dash(text: &str) -> String {
    text.chars()
        .filter(|&c| c != ' ' && !is_separator_keep_dash(c))
        .collect()
}
