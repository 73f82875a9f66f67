//! Cleaning of untrusted identifier lists and result sets.
//!
//! Everything here is pure. Malformed identifiers are dropped, never reported.

use std::collections::HashSet;

use crate::models::HasMalId;

/// Keeps the entries that, once trimmed, are non-empty runs of ASCII digits
/// fitting an `i64`, in their original order. Duplicates are kept.
pub fn sanitize_ids<S: AsRef<str>>(ids: &[S]) -> Vec<i64> {
    ids.iter().filter_map(|id| parse_id(id.as_ref())).collect()
}

/// Numeric form of an identifier, `None` if it is not one
pub fn parse_id(id: &str) -> Option<i64> {
    let id = id.trim();
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    id.parse().ok()
}

/// Removes every result whose id equals the numeric form of `current_id`.
///
/// With no `current_id`, or one that is not numeric, `results` is returned
/// untouched.
pub fn exclude_current<T: HasMalId>(results: Vec<T>, current_id: Option<&str>) -> Vec<T> {
    match current_id.and_then(parse_id) {
        Some(current) => exclude_ids(results, &[current]),
        None => results,
    }
}

/// Removes every result whose id is in `excluded`
pub fn exclude_ids<T: HasMalId>(results: Vec<T>, excluded: &[i64]) -> Vec<T> {
    if excluded.is_empty() {
        return results;
    }
    let excluded: HashSet<i64> = excluded.iter().copied().collect();
    results
        .into_iter()
        .filter(|r| !excluded.contains(&r.mal_id()))
        .collect()
}

/// Keeps the first occurrence of each id
pub fn dedupe_by_id<T: HasMalId>(results: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert(r.mal_id()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnimeRef;

    fn anime(mal_id: i64) -> AnimeRef {
        AnimeRef {
            mal_id,
            title: format!("anime {}", mal_id),
        }
    }

    fn ids(results: &[AnimeRef]) -> Vec<i64> {
        results.iter().map(|r| r.mal_id).collect()
    }

    #[test]
    fn test_sanitize_keeps_numeric_entries_in_order() {
        let raw = ["21", "", "abc", "5114", " 1 ", "-3", "4.5", "21", "9a"];
        assert_eq!(sanitize_ids(&raw), vec![21, 5114, 1, 21]);
    }

    #[test]
    fn test_sanitize_drops_overflow() {
        let raw = vec!["99999999999999999999".to_string(), "7".to_string()];
        assert_eq!(sanitize_ids(&raw), vec![7]);
    }

    #[test]
    fn test_sanitize_is_stable_on_its_own_output() {
        let raw = ["3", "x", "1", "", "2"];
        let once = sanitize_ids(&raw);
        let restringified: Vec<String> = once.iter().map(|id| id.to_string()).collect();

        assert_eq!(sanitize_ids(&restringified), once);
    }

    #[test]
    fn test_sanitize_empty_input() {
        let raw: Vec<String> = Vec::new();
        assert!(sanitize_ids(&raw).is_empty());
    }

    #[test]
    fn test_exclude_current_none_returns_input_unchanged() {
        let results = vec![anime(1), anime(2), anime(1)];
        assert_eq!(exclude_current(results.clone(), None), results);
    }

    #[test]
    fn test_exclude_current_removes_every_match() {
        let results = vec![anime(1), anime(2), anime(1), anime(3)];
        let filtered = exclude_current(results, Some("1"));
        assert_eq!(ids(&filtered), vec![2, 3]);
    }

    #[test]
    fn test_exclude_current_non_numeric_id_matches_nothing() {
        let results = vec![anime(1), anime(2)];
        assert_eq!(exclude_current(results.clone(), Some("one")), results);
    }

    #[test]
    fn test_exclude_current_is_idempotent() {
        let results = vec![anime(5), anime(6), anime(5), anime(7)];
        let once = exclude_current(results, Some("5"));
        let twice = exclude_current(once.clone(), Some("5"));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_exclude_ids_removes_all_listed() {
        let results = vec![anime(1), anime(2), anime(3), anime(4)];
        assert_eq!(ids(&exclude_ids(results, &[2, 4, 99])), vec![1, 3]);
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let mut first = anime(1);
        first.title = "first".to_string();
        let results = vec![first, anime(2), anime(1), anime(2), anime(3)];

        let deduped = dedupe_by_id(results);

        assert_eq!(ids(&deduped), vec![1, 2, 3]);
        assert_eq!(deduped[0].title, "first");
    }
}
