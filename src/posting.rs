//! C1: the in-memory posting / posting-list model.
//!
//! A [`Posting`] records one term's occurrence in one document; a
//! [`PostingList`] is the ordered (by docid) sequence of postings for a term,
//! plus its document frequency. Both are immutable once built — accumulation
//! during batch indexing goes through [`PostingListBuilder`], which keeps a
//! docid -> index map so repeated tokens in the same document are O(1) to
//! update instead of the linear scan the original indexing-by-docid approach
//! would require.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub type DocId = u32;

/// The six structural fields a token can appear under. Fixed-shape by
/// design: the source's dynamic tag -> token-set dictionary collapses to one
/// bool per field, since the field set never varies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fields {
    pub title: bool,
    pub heading: bool,
    pub bold: bool,
    pub strong: bool,
    pub italics: bool,
    pub emphasized: bool,
}

impl Fields {
    /// True if the token was seen under any structural tag at all. Drives
    /// the +1 field bonus during ranking.
    pub fn any(&self) -> bool {
        self.title || self.heading || self.bold || self.strong || self.italics || self.emphasized
    }

    pub fn union(&self, other: &Fields) -> Fields {
        Fields {
            title: self.title || other.title,
            heading: self.heading || other.heading,
            bold: self.bold || other.bold,
            strong: self.strong || other.strong,
            italics: self.italics || other.italics,
            emphasized: self.emphasized || other.emphasized,
        }
    }
}

/// One term's occurrence in one document.
///
/// `tf` is the *raw* pre-stemming frequency of the token that produced this
/// posting: two distinct raw tokens that stem to the same term each get
/// their own posting (and their own `tf`) for the same docid. `term_positions`
/// is the enumeration index of the token over the document's deduplicated
/// token set, not a real text offset — no query path ever reads it, so it
/// exists only to round-trip through the on-disk format faithfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub docid: DocId,
    pub tf: u32,
    pub fields: Fields,
    pub term_positions: Vec<u32>,
}

/// All postings for one term, ordered ascending by docid. `df` is always
/// `postings.len()` — kept as a method rather than a stored field so the
/// invariant can't drift.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingList {
    postings: Vec<Posting>,
}

impl PostingList {
    pub fn new() -> Self {
        PostingList {
            postings: Vec::new(),
        }
    }

    /// Build from an already-sorted vector. Callers (the parser, the merge
    /// engine's chunker) are responsible for the sort; this just wraps.
    pub fn from_sorted(postings: Vec<Posting>) -> Self {
        debug_assert!(postings.windows(2).all(|w| w[0].docid < w[1].docid));
        PostingList { postings }
    }

    pub fn df(&self) -> usize {
        self.postings.len()
    }

    pub fn postings(&self) -> &[Posting] {
        &self.postings
    }

    pub fn into_postings(self) -> Vec<Posting> {
        self.postings
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Merge two posting lists produced by disjoint docid ranges (the case
    /// during binary merge, where each side came from a different batch or
    /// an earlier merge of disjoint batches). Concatenates and re-sorts; no
    /// deduplication is performed because the invariant is that the inputs
    /// never share a docid.
    pub fn merge_disjoint(mut self, other: PostingList) -> PostingList {
        self.postings.extend(other.postings);
        self.postings.sort_by_key(|p| p.docid);
        self
    }
}

/// Accumulates postings for one term while a batch is being indexed. Holds a
/// docid -> index map so appending a position to an existing posting doesn't
/// need a linear scan of the growing vector, unlike the source's
/// indexing-by-docid `PostingList.__getitem__`.
#[derive(Debug, Default)]
pub struct PostingListBuilder {
    index_by_docid: HashMap<DocId, usize>,
    postings: Vec<Posting>,
}

impl PostingListBuilder {
    pub fn new() -> Self {
        PostingListBuilder {
            index_by_docid: HashMap::new(),
            postings: Vec::new(),
        }
    }

    /// Record one occurrence of the owning term's stem at `position` for
    /// `docid`. If this term already has a posting for `docid`, only the
    /// position is appended (tf and fields were fixed when the posting was
    /// first created, matching the source's "new posting or append position"
    /// branch).
    pub fn record(&mut self, docid: DocId, tf: u32, fields: Fields, position: u32) {
        if let Some(&i) = self.index_by_docid.get(&docid) {
            self.postings[i].term_positions.push(position);
        } else {
            let i = self.postings.len();
            self.index_by_docid.insert(docid, i);
            self.postings.push(Posting {
                docid,
                tf,
                fields,
                term_positions: vec![position],
            });
        }
    }

    pub fn finish(mut self) -> PostingList {
        self.postings.sort_by_key(|p| p.docid);
        PostingList::from_sorted(self.postings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_appends_position_for_repeat_docid() {
        let mut b = PostingListBuilder::new();
        b.record(1, 3, Fields::default(), 0);
        b.record(1, 3, Fields::default(), 5);
        let list = b.finish();
        assert_eq!(list.df(), 1);
        assert_eq!(list.postings()[0].term_positions, vec![0, 5]);
    }

    #[test]
    fn builder_sorts_by_docid() {
        let mut b = PostingListBuilder::new();
        b.record(5, 1, Fields::default(), 0);
        b.record(2, 1, Fields::default(), 0);
        b.record(9, 1, Fields::default(), 0);
        let list = b.finish();
        let ids: Vec<DocId> = list.postings().iter().map(|p| p.docid).collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }

    #[test]
    fn merge_disjoint_concatenates_and_resorts() {
        let a = PostingList::from_sorted(vec![Posting {
            docid: 1,
            tf: 1,
            fields: Fields::default(),
            term_positions: vec![0],
        }]);
        let b = PostingList::from_sorted(vec![Posting {
            docid: 2,
            tf: 1,
            fields: Fields::default(),
            term_positions: vec![0],
        }]);
        let merged = b.merge_disjoint(a);
        let ids: Vec<DocId> = merged.postings().iter().map(|p| p.docid).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(merged.df(), 2);
    }

    #[test]
    fn fields_any_true_if_one_field_set() {
        let mut f = Fields::default();
        assert!(!f.any());
        f.bold = true;
        assert!(f.any());
    }
}
