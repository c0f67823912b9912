//! Address variants tried in order when geocoding.
//!
//! Geocoders match some spellings better than others, so the original text
//! is tried first and then a variant with common street-type abbreviations
//! expanded:
//!
//! - `"Rd"` → `"Road"`
//! - `"St"` → `"Street"`
//! - `"Ave"` → `"Avenue"`
//! - `"Dr"` → `"Drive"`
//! - `"WAY"` / `"way"` → `"Way"`

use regex::Regex;
use std::sync::LazyLock;

/// Abbreviation patterns and their expansions. A trailing period is
/// consumed with the abbreviation.
static EXPANSIONS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)\bRd\b\.?", "Road"),
        (r"(?i)\bSt\b\.?", "Street"),
        (r"(?i)\bAve\b\.?", "Avenue"),
        (r"(?i)\bDr\b\.?", "Drive"),
        (r"(?i)\bWay\b", "Way"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).expect("valid regex"), replacement))
    .collect()
});

/// Collapses runs of whitespace into a single space.
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Returns the ordered, de-duplicated list of spellings to geocode.
///
/// The first entry is always the trimmed original. Blank input yields an
/// empty list.
#[must_use]
pub fn address_variants(address: &str) -> Vec<String> {
    let original = WHITESPACE_RE.replace_all(address.trim(), " ").to_string();
    if original.is_empty() {
        return Vec::new();
    }

    let expanded = expand_abbreviations(&original);

    let mut variants = vec![original];
    if !variants.contains(&expanded) {
        variants.push(expanded);
    }
    variants
}

/// Expands the street-type abbreviations listed in the module docs.
#[must_use]
pub fn expand_abbreviations(address: &str) -> String {
    EXPANSIONS
        .iter()
        .fold(address.to_string(), |acc, (re, replacement)| {
            re.replace_all(&acc, *replacement).into_owned()
        })
}
