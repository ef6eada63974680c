//! Containment matching of plate text against a registry snapshot.
//!
//! The recognizer frequently drops or adds a leading region name or
//! digit, so a plate matches when either side contains the other. Short
//! strings would match far too much that way and must be equal instead.

use super::normalize::MIN_PLATE_LEN;
use crate::registry::RegistryRecord;

/// Removes all whitespace.
pub fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// True if two already whitespace-stripped plates match.
pub fn plates_match(query: &str, plate: &str) -> bool {
    if query.is_empty() {
        return false;
    }
    if query.chars().count() >= MIN_PLATE_LEN && plate.chars().count() >= MIN_PLATE_LEN {
        query.contains(plate) || plate.contains(query)
    } else {
        query == plate
    }
}

/// Returns the first record whose plate matches `query`.
///
/// Snapshot order decides between several matching records. Empty
/// text never matches.
pub fn match_plate<'a>(query: &str, registry: &'a [RegistryRecord]) -> Option<&'a RegistryRecord> {
    let query = strip_whitespace(query);
    if query.is_empty() {
        return None;
    }
    registry
        .iter()
        .find(|record| plates_match(&query, &strip_whitespace(&record.plate_number)))
}
