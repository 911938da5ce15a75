//! Suggestion matching.
//!
//! Both matchers are case-insensitive and keep the candidates' original
//! order and casing in their results.

/// Approximate match: true iff every character of `query` appears in
/// `text` in order, not necessarily contiguously. An exact substring match
/// short-circuits.
///
/// ```rust
/// use adw_core::util::fuzzy_cmp;
///
/// assert!(fuzzy_cmp("abc", "xaxbxc"));
/// assert!(!fuzzy_cmp("abc", "acb"));
/// ```
pub fn fuzzy_cmp(query: &str, text: &str) -> bool {
    let query = query.to_lowercase();
    let text = text.to_lowercase();

    if query.chars().count() > text.chars().count() {
        return false;
    }
    if text.contains(&query) {
        return true;
    }

    let mut haystack = text.chars();
    query.chars().all(|needle| haystack.any(|c| c == needle))
}

/// Candidates that start with `query`.
pub fn prefix_search(options: &[String], query: &str) -> Vec<String> {
    let query = query.to_lowercase();
    options
        .iter()
        .filter(|option| option.to_lowercase().starts_with(&query))
        .cloned()
        .collect()
}

/// Candidates that contain `query` as a subsequence.
pub fn fuzzy_search(options: &[String], query: &str) -> Vec<String> {
    options
        .iter()
        .filter(|option| fuzzy_cmp(query, option))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn subsequence_in_order() {
        assert!(fuzzy_cmp("abc", "xaxbxc"));
        assert!(!fuzzy_cmp("abc", "acb"));
        assert!(fuzzy_cmp("", "anything"));
    }

    #[test]
    fn case_is_ignored() {
        assert!(fuzzy_cmp("ABC", "xaxbxc"));
        assert!(fuzzy_cmp("apl", "APPLE"));
    }

    #[test]
    fn longer_query_never_matches() {
        assert!(!fuzzy_cmp("apples", "apple"));
    }

    #[test]
    fn prefix_search_keeps_order_and_casing() {
        let options = list(&["Apple", "apricot", "banana"]);
        assert_eq!(prefix_search(&options, "AP"), list(&["Apple", "apricot"]));
        assert_eq!(prefix_search(&options, ""), options);
    }

    #[test]
    fn fuzzy_is_superset_of_prefix() {
        let options = list(&["apple", "apricot", "banana", "grape", "pineapple"]);
        for query in ["a", "ap", "pl", "an", "x", "ape"] {
            let prefix = prefix_search(&options, query);
            let fuzzy = fuzzy_search(&options, query);
            for hit in &prefix {
                assert!(fuzzy.contains(hit), "{hit} missing from fuzzy results for {query}");
            }
        }
    }
}
