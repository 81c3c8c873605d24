//! C2: the in-memory batch indexer. Turns a batch of raw documents into a
//! local, 1-based doc index and a sorted-by-term partial inverted index.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::corpus::{has_non_empty_fragment, RawDocument};
use crate::docindex::{DocEntry, DocIndex};
use crate::posting::{DocId, PostingList, PostingListBuilder};
use crate::tokenize::{tokenize, HtmlExtractor, LinguisticProcessor};

pub type LocalIndex = BTreeMap<String, PostingList>;

/// The result of indexing one batch: a local doc index numbered densely
/// from 1, and the batch's inverted index, already sorted by term (a
/// `BTreeMap` key, so no separate sort step is needed before spilling).
pub struct BatchOutput {
    pub doc_index: DocIndex,
    pub index: LocalIndex,
}

/// Index one batch of documents. Skips documents whose URL carries a
/// non-empty fragment, and documents whose extracted plain text is empty.
/// Surviving documents are numbered 1..=n in iteration order.
pub fn index_batch(
    documents: Vec<RawDocument>,
    extractor: &dyn HtmlExtractor,
    linguist: &dyn LinguisticProcessor,
) -> BatchOutput {
    let mut doc_index = DocIndex::new();
    let mut builders: BTreeMap<String, PostingListBuilder> = BTreeMap::new();
    let mut n: DocId = 0;

    for document in documents {
        if has_non_empty_fragment(&document.url) {
            continue;
        }

        let extracted = extractor.extract(&document.html);
        if extracted.text.trim().is_empty() {
            continue;
        }

        n += 1;
        doc_index.insert(
            n,
            DocEntry {
                url: document.url,
                path: document.path,
            },
        );

        let tokens = tokenize(&extracted.text);
        let mut raw_tf: HashMap<&str, u32> = HashMap::new();
        for token in &tokens {
            *raw_tf.entry(token.as_str()).or_insert(0) += 1;
        }

        // Position is the enumeration index over the *deduplicated* token
        // set, not the token's real text offset — preserved verbatim from
        // the source; no query path ever consults term_positions.
        let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
        for (position, token) in unique.into_iter().enumerate() {
            let stemmed = linguist.stem(token);
            let fields = extracted.structural_tokens.fields_for(token);
            let tf = raw_tf[token];
            builders
                .entry(stemmed)
                .or_insert_with(PostingListBuilder::new)
                .record(n, tf, fields, position as u32);
        }
    }

    let index = builders
        .into_iter()
        .map(|(term, builder)| (term, builder.finish()))
        .collect();

    BatchOutput { doc_index, index }
}
