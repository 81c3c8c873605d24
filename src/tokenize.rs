//! The tokenizer, plus the `HtmlExtractor` / `LinguisticProcessor`
//! collaborator traits the distilled spec treats as external interfaces.
//! Concrete defaults are supplied here since a complete crate needs something
//! that actually runs: [`ScraperHtmlExtractor`] over the `scraper` crate, and
//! [`SnowballProcessor`] over `rust-stemmers` + `stop-words`.

use std::collections::HashSet;

use rust_stemmers::{Algorithm, Stemmer};
use scraper::{Html, Selector};

use crate::posting::Fields;

/// Split `text` into maximal runs of ASCII alphanumeric characters, in the
/// order they occur, case preserved. Equivalent to the regex `[A-Za-z0-9]+`
/// applied with `finditer`: no unicode word-boundary awareness, by design —
/// the source tokenizer is ASCII-only and this crate preserves that rather
/// than "fixing" it to be unicode-aware.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            current.push(ch);
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// The structural token sets extracted from one document's markup: which
/// raw (un-stemmed) tokens appeared inside which tag-derived field.
#[derive(Debug, Clone, Default)]
pub struct StructuralTokens {
    pub title: HashSet<String>,
    pub heading: HashSet<String>,
    pub bold: HashSet<String>,
    pub strong: HashSet<String>,
    pub italics: HashSet<String>,
    pub emphasized: HashSet<String>,
}

impl StructuralTokens {
    /// Compute the `Fields` record for one raw token by checking membership
    /// in each field's token set.
    pub fn fields_for(&self, token: &str) -> Fields {
        Fields {
            title: self.title.contains(token),
            heading: self.heading.contains(token),
            bold: self.bold.contains(token),
            strong: self.strong.contains(token),
            italics: self.italics.contains(token),
            emphasized: self.emphasized.contains(token),
        }
    }
}

/// Plain text plus structural field membership, as extracted from one
/// document's raw HTML.
pub struct ExtractedDocument {
    pub text: String,
    pub structural_tokens: StructuralTokens,
}

/// Out-of-scope collaborator: turns raw HTML bytes into plain text and
/// structural field membership.
pub trait HtmlExtractor {
    fn extract(&self, html: &str) -> ExtractedDocument;
}

/// Out-of-scope collaborator: stemming and stop-word filtering.
pub trait LinguisticProcessor {
    fn stem(&self, token: &str) -> String;
    fn is_stopword(&self, token: &str) -> bool;
}

/// Default `HtmlExtractor`, built on `scraper`'s DOM parser. Tag -> field
/// mapping: `h1,h2,h3 -> heading`, `b -> bold`, `strong -> strong`,
/// `i -> italics`, `em -> emphasized`, `title -> title`.
pub struct ScraperHtmlExtractor {
    body_sel: Selector,
    title_sel: Selector,
    heading_sel: Selector,
    bold_sel: Selector,
    strong_sel: Selector,
    italics_sel: Selector,
    emphasized_sel: Selector,
}

impl Default for ScraperHtmlExtractor {
    fn default() -> Self {
        ScraperHtmlExtractor {
            body_sel: Selector::parse("body").expect("static selector"),
            title_sel: Selector::parse("title").expect("static selector"),
            heading_sel: Selector::parse("h1,h2,h3").expect("static selector"),
            bold_sel: Selector::parse("b").expect("static selector"),
            strong_sel: Selector::parse("strong").expect("static selector"),
            italics_sel: Selector::parse("i").expect("static selector"),
            emphasized_sel: Selector::parse("em").expect("static selector"),
        }
    }
}

impl ScraperHtmlExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    fn token_set(document: &Html, selector: &Selector) -> HashSet<String> {
        let mut set = HashSet::new();
        for element in document.select(selector) {
            for token in tokenize(&element.text().collect::<String>()) {
                set.insert(token);
            }
        }
        set
    }
}

impl HtmlExtractor for ScraperHtmlExtractor {
    fn extract(&self, html: &str) -> ExtractedDocument {
        let document = Html::parse_document(html);
        // Body text only — `<title>` is tracked separately as a structural
        // field below, and must not bleed into the plain-text token stream
        // (parse_document always synthesizes a body, but fall back to the
        // whole document just in case).
        let text = match document.select(&self.body_sel).next() {
            Some(body) => body.text().collect::<String>(),
            None => document.root_element().text().collect::<String>(),
        };

        let structural_tokens = StructuralTokens {
            title: Self::token_set(&document, &self.title_sel),
            heading: Self::token_set(&document, &self.heading_sel),
            bold: Self::token_set(&document, &self.bold_sel),
            strong: Self::token_set(&document, &self.strong_sel),
            italics: Self::token_set(&document, &self.italics_sel),
            emphasized: Self::token_set(&document, &self.emphasized_sel),
        };

        ExtractedDocument {
            text,
            structural_tokens,
        }
    }
}

/// Default `LinguisticProcessor`: the English Snowball stemmer plus the
/// English stop-word list. Stemming lowercases first — `rust_stemmers`
/// itself assumes already-lowercased ASCII input, unlike nltk's stemmer
/// which lowercases internally.
pub struct SnowballProcessor {
    stemmer: Stemmer,
    stopwords: HashSet<String>,
}

impl Default for SnowballProcessor {
    fn default() -> Self {
        let stopwords = stop_words::get(stop_words::LANGUAGE::English)
            .into_iter()
            .collect();
        SnowballProcessor {
            stemmer: Stemmer::create(Algorithm::English),
            stopwords,
        }
    }
}

impl SnowballProcessor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LinguisticProcessor for SnowballProcessor {
    fn stem(&self, token: &str) -> String {
        self.stemmer.stem(&token.to_lowercase()).into_owned()
    }

    fn is_stopword(&self, token: &str) -> bool {
        // Matches the source's case-sensitive membership check against a
        // lowercase stop-word list: only already-lowercase query tokens get
        // filtered. Not "fixed" to be case-insensitive here.
        self.stopwords.contains(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_splits_on_non_alnum_ascii() {
        assert_eq!(
            tokenize("Hello, world! 123-abc"),
            vec!["Hello", "world", "123", "abc"]
        );
    }

    #[test]
    fn tokenize_is_ascii_only() {
        // Non-ASCII letters are boundaries, not part of a token.
        assert_eq!(tokenize("café bar"), vec!["caf", "bar"]);
    }

    #[test]
    fn extractor_splits_title_and_body() {
        let extractor = ScraperHtmlExtractor::new();
        let doc = extractor.extract("<html><title>Hello</title><body>Hello world</body></html>");
        assert!(doc.text.contains("Hello"));
        assert!(doc.structural_tokens.title.contains("Hello"));
        assert!(!doc.structural_tokens.title.contains("world"));
    }

    #[test]
    fn extractor_collects_heading_tags() {
        let extractor = ScraperHtmlExtractor::new();
        let doc = extractor.extract("<html><body><h1>Big News</h1><p>Small news</p></body></html>");
        assert!(doc.structural_tokens.heading.contains("Big"));
        assert!(!doc.structural_tokens.heading.contains("Small"));
    }

    #[test]
    fn snowball_stems_lowercase() {
        let processor = SnowballProcessor::new();
        assert_eq!(processor.stem("Running"), "run");
    }

    #[test]
    fn snowball_is_stopword() {
        let processor = SnowballProcessor::new();
        assert!(processor.is_stopword("the"));
        assert!(!processor.is_stopword("xyzzy"));
    }
}
