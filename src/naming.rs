//! Name helpers shared by the grouper and the promoter.

use xxhash_rust::xxh64::xxh64;

/// Characters dropped from release names before indexing.
const REMOVED_CHARS: &[char] = &['#', '@', '$', '%', '^', '§', '¨', '©', 'Ö'];

/// Separators turned into spaces so search terms split on them.
const SPACE_CHARS: &[char] = &['_', '.', '-'];

/// Computes the stable binary key for a (name, group, poster, total-parts) tuple.
///
/// The fields are concatenated without a delimiter and hashed with XXH64
/// (seed 0); the result is lowercase hex. `total_parts` is the total as it
/// appeared in the subject, not the parsed integer.
#[must_use]
pub fn binary_hash(name: &str, group: &str, poster: &str, total_parts: &str) -> String {
    let mut key = String::with_capacity(name.len() + group.len() + poster.len() + total_parts.len());
    key.push_str(name);
    key.push_str(group);
    key.push_str(poster);
    key.push_str(total_parts);
    format!("{:x}", xxh64(key.as_bytes(), 0))
}

/// Produces the search name for a release.
///
/// # Example
///
/// ```
/// use indexer_core::naming::clean_release_name;
///
/// assert_eq!(clean_release_name("My.Movie_Name-2020#@"), "My Movie Name 2020");
/// ```
#[must_use]
pub fn clean_release_name(name: &str) -> String {
    name.chars()
        .filter(|c| !REMOVED_CHARS.contains(c))
        .map(|c| if SPACE_CHARS.contains(&c) { ' ' } else { c })
        .collect()
}
