//! Case-insensitive keyword scanning over extracted page text.

use regex::RegexBuilder;

/// Characters of context captured on each side of a match.
const SNIPPET_CONTEXT: usize = 120;

#[derive(Debug, Clone)]
pub struct KeywordMatch {
    /// Byte offset of the first occurrence in the page text.
    pub offset: usize,
    /// Occurrences of the keyword on this page.
    pub occurrences: usize,
    /// Cleaned context window around the first occurrence.
    pub snippet: String,
}

/// Scans one page of text for a keyword. One `KeywordMatch` summarizes the
/// whole page; result rows are per (file, page, keyword), not per occurrence.
#[must_use]
pub fn find_match(text: &str, term: &str) -> Option<KeywordMatch> {
    if term.is_empty() {
        return None;
    }

    let pattern = RegexBuilder::new(&regex::escape(term))
        .case_insensitive(true)
        .build()
        .ok()?;

    let mut iter = pattern.find_iter(text);
    let first = iter.next()?;
    let occurrences = 1 + iter.count();

    Some(KeywordMatch {
        offset: first.start(),
        occurrences,
        snippet: snippet_around(text, first.start(), first.end()),
    })
}

/// Context window around the match, clamped to char boundaries, with
/// whitespace runs collapsed for storage.
pub(crate) fn snippet_around(text: &str, start: usize, end: usize) -> String {
    context_around(text, start, end, SNIPPET_CONTEXT)
}

/// Wider context window for entity extraction around a match offset.
#[must_use]
pub fn context_around(text: &str, start: usize, end: usize, radius: usize) -> String {
    let from = floor_char_boundary(text, start.saturating_sub(radius));
    let to = ceil_char_boundary(text, end.saturating_add(radius).min(text.len()));

    text[from..to].split_whitespace().collect::<Vec<_>>().join(" ")
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx < text.len() && !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_match() {
        let text = "The ZONING Variance was approved.";
        let result = find_match(text, "zoning variance").unwrap();
        assert_eq!(result.offset, 4);
        assert_eq!(result.occurrences, 1);
        assert!(result.snippet.contains("ZONING Variance"));
    }

    #[test]
    fn test_counts_occurrences() {
        let text = "Budget review. The budget passed. Final budget: $1M.";
        let result = find_match(text, "budget").unwrap();
        assert_eq!(result.occurrences, 3);
    }

    #[test]
    fn test_no_match() {
        assert!(find_match("Nothing relevant here", "rezoning").is_none());
        assert!(find_match("anything", "").is_none());
    }

    #[test]
    fn test_snippet_collapses_whitespace() {
        let text = "approved   the\n\n  rezoning    request";
        let result = find_match(text, "rezoning").unwrap();
        assert_eq!(result.snippet, "approved the rezoning request");
    }

    #[test]
    fn test_snippet_respects_char_boundaries() {
        let text = "é".repeat(200) + "permit" + &"ü".repeat(200);
        let result = find_match(&text, "permit").unwrap();
        assert!(result.snippet.contains("permit"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let text = "Item 4.2 (a) discussed";
        assert!(find_match(text, "4.2 (a)").is_some());
        assert!(find_match("Item 4x2 discussed", "4.2").is_none());
    }
}
