//! Natural ordering for drop-down values.
//!
//! Values compare by their letters first: everything except ASCII letters and
//! whitespace is stripped, the rest is lowercased and trimmed. Values with
//! nothing left after stripping go last. Ties fall back to the lowercased
//! original, then the original itself.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

static NON_ALPHA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z\s]+").expect("constant regex"));

/// Sort key of one value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NaturalKey {
    blank: bool,
    stripped: String,
    lower: String,
    original: String,
}

/// Compute the natural sort key of a value.
pub fn natural_key(value: &str) -> NaturalKey {
    let stripped = NON_ALPHA.replace_all(value, "").to_lowercase().trim().to_string();
    NaturalKey {
        blank: stripped.is_empty(),
        stripped,
        lower: value.to_lowercase(),
        original: value.to_string(),
    }
}

/// Compare two values naturally.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_key(a).cmp(&natural_key(b))
}

/// Sort values in natural order.
pub fn sort_natural(values: &mut [String]) {
    values.sort_by_cached_key(|v| natural_key(v));
}

/// Sort `(text, id)` pairs by natural order of the text, then by id.
pub fn sort_natural_by_text(pairs: &mut [(String, String)]) {
    pairs.sort_by_cached_key(|(text, id)| (natural_key(text), id.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn symbols_sort_last() {
        let mut values = strings(&[
            "~", "ab", " ", "a", "(", "!a", "a d", "", "-", " a c ", "A", "!", ")", "a  d",
        ]);
        sort_natural(&mut values);
        assert_eq!(
            values,
            strings(&["!a", "A", "a", "a  d", " a c ", "a d", "ab", "", " ", "!", "(", ")", "-", "~"])
        );
    }

    #[test]
    fn sort_is_stable_under_reversal() {
        let mut values = strings(&[
            "!a", "A", "a", "a  d", " a c ", "a d", "ab", " ", "!", "(", ")", "-", "~",
        ]);
        sort_natural(&mut values);
        let mut reversed: Vec<String> = values.iter().rev().cloned().collect();
        sort_natural(&mut reversed);
        assert_eq!(reversed, values);
    }

    #[test]
    fn case_only_breaks_ties() {
        assert_eq!(natural_cmp("Board", "apple"), Ordering::Greater);
        assert_eq!(natural_cmp("Board", "board"), Ordering::Less);
        assert_eq!(natural_cmp("board", "board"), Ordering::Equal);
    }

    #[test]
    fn ids_break_text_ties() {
        let mut pairs = vec![
            ("same".to_string(), "http://x/2".to_string()),
            ("Other".to_string(), "http://x/9".to_string()),
            ("same".to_string(), "http://x/1".to_string()),
        ];
        sort_natural_by_text(&mut pairs);
        let ids: Vec<&str> = pairs.iter().map(|(_, id)| id.as_str()).collect();
        assert_eq!(ids, vec!["http://x/9", "http://x/1", "http://x/2"]);
    }
}
