//! Optional presentation layer, supplemented from the original tool's
//! `Search_Engine.py:get_search_results` (dropped by "document-snippet
//! generation for display (pure presentation)" being out of scope). Off by
//! default — `rsearch-search` only prints URLs unless `--snippets` is
//! passed, matching the source's `DISPLAY_URLS_ONLY = True`.

/// Turns a document's plain text and a query's terms into display snippets.
pub trait SnippetFormatter {
    fn windows(&self, text: &str, terms: &[String]) -> Vec<String>;
}

const CONTEXT_RADIUS: usize = 200;

/// For each term, finds the first `\W`-bounded, case-insensitive occurrence
/// in the document's plain text and keeps a roughly 400-character context
/// window around it (200 chars each side, inclusive of the two boundary
/// characters). A term whose window text is already covered by a
/// previously-collected window is skipped — the source guards with `if term
/// in ' '.join(text_list).lower(): continue` before searching at all.
#[derive(Debug, Default)]
pub struct ContextWindowFormatter;

impl ContextWindowFormatter {
    pub fn new() -> Self {
        ContextWindowFormatter
    }
}

impl SnippetFormatter for ContextWindowFormatter {
    fn windows(&self, text: &str, terms: &[String]) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut collected: Vec<String> = Vec::new();
        let mut collected_lower = String::new();

        for term in terms {
            if term.is_empty() || collected_lower.contains(term.to_lowercase().as_str()) {
                continue;
            }
            if let Some(window) = first_window(&chars, term) {
                collected_lower.push(' ');
                collected_lower.push_str(&window.to_lowercase());
                collected.push(window);
            }
        }

        collected
    }
}

fn first_word_bounded_match(chars: &[char], start: usize, term_lower: &[char]) -> bool {
    let term_len = term_lower.len();
    chars[start..start + term_len]
        .iter()
        .zip(term_lower.iter())
        .all(|(a, b)| a.to_lowercase().eq(b.to_lowercase()))
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn first_window(chars: &[char], term: &str) -> Option<String> {
    let term_lower: Vec<char> = term.to_lowercase().chars().collect();
    let term_len = term_lower.len();
    if term_len == 0 || chars.len() < term_len + 2 {
        return None;
    }

    for i in 1..=chars.len() - term_len - 1 {
        if is_word_char(chars[i - 1]) || is_word_char(chars[i + term_len]) {
            continue;
        }
        if !first_word_bounded_match(chars, i, &term_lower) {
            continue;
        }
        let start = (i - 1).saturating_sub(CONTEXT_RADIUS);
        let end = (i + term_len + 1 + CONTEXT_RADIUS).min(chars.len());
        return Some(chars[start..end].iter().collect());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_word_bounded_occurrence() {
        let formatter = ContextWindowFormatter::new();
        let windows = formatter.windows(
            "the quick brown fox jumps over the lazy dog",
            &["fox".to_string()],
        );
        assert_eq!(windows.len(), 1);
        assert!(windows[0].contains("fox"));
    }

    #[test]
    fn skips_substring_match_without_word_boundary() {
        let formatter = ContextWindowFormatter::new();
        // "cats" contains "cat" but not as a \W-bounded occurrence.
        let windows = formatter.windows("the cats sat", &["cat".to_string()]);
        assert!(windows.is_empty());
    }

    #[test]
    fn skips_term_already_covered_by_prior_window() {
        let formatter = ContextWindowFormatter::new();
        let windows = formatter.windows(
            "the quick fox and the quick fox again",
            &["fox".to_string(), "quick".to_string()],
        );
        // Both terms occur inside the same first window, so "quick" is
        // skipped once it's already present in the collected text.
        assert_eq!(windows.len(), 1);
    }

    #[test]
    fn is_case_insensitive() {
        let formatter = ContextWindowFormatter::new();
        let windows = formatter.windows("The Fox ran.", &["fox".to_string()]);
        assert_eq!(windows.len(), 1);
    }
}
