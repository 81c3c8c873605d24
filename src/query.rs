//! C7: the query processor. Lazily pulls candidate posting lists from the
//! on-disk index via the meta index, computes the boolean-intersection
//! candidate set for diagnostics, scores every docid present in any term's
//! chunk with cosine similarity over tf-idf plus the structural field bonus,
//! and returns a ranked document list, one page at a time.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;
use std::rc::Rc;

use snafu::ResultExt;

use crate::docindex::DocIndex;
use crate::error::{self, Result};
use crate::format;
use crate::metaindex::{self, MetaIndex};
use crate::posting::{DocId, PostingList};
use crate::tokenize::{self, LinguisticProcessor};

/// Maximum number of postings yielded per query term, per page.
pub const RESULT_CHUNK_SIZE: usize = 100;
/// Maximum number of stemmed query terms processed; excess terms are
/// truncated from the tail.
pub const QUERY_TERM_CAP: usize = 10;

/// An open query session: the final index file (opened once, used via
/// seeks), the loaded meta index, and the loaded doc index.
pub struct Session {
    index_file: Rc<RefCell<File>>,
    meta_index: MetaIndex,
    pub doc_index: DocIndex,
}

impl Session {
    pub fn open(index_path: &Path, meta_path: &Path, doc_path: &Path) -> Result<Self> {
        let file = File::open(index_path).context(error::IoSnafu {
            path: index_path.to_path_buf(),
        })?;
        let meta_index = metaindex::load(meta_path)?;
        let doc_index = DocIndex::load(doc_path)?;
        Ok(Session {
            index_file: Rc::new(RefCell::new(file)),
            meta_index,
            doc_index,
        })
    }

    /// Start a fresh paginated search. Normalizes the query, opens one lazy
    /// posting generator per distinct stemmed term, and precomputes the
    /// query's tf-idf magnitude (constant across pages).
    pub fn search(&self, query: &str, linguist: &dyn LinguisticProcessor) -> QuerySession {
        let query_terms = normalize_query(query, linguist);

        let mut distinct: Vec<String> = query_terms.clone();
        distinct.sort();
        distinct.dedup();

        let mut generators = BTreeMap::new();
        for term in &distinct {
            let offsets = match self.meta_index.get(term) {
                Some(offsets) => offsets.clone(),
                None => {
                    log::debug!("term not found in meta index: {}", term);
                    Vec::new()
                }
            };
            generators.insert(
                term.clone(),
                PostingGenerator::new(self.index_file.clone(), offsets),
            );
        }

        QuerySession {
            query_magnitude: query_vector_magnitude(&query_terms),
            stemmed_query_words: query_terms,
            n_docs: self.doc_index.len(),
            generators,
            done: false,
        }
    }
}

/// Tokenize, stop-word filter (falling back to the unfiltered tokens if
/// every token was a stop word), stem, and cap at `QUERY_TERM_CAP`.
pub fn normalize_query(raw: &str, linguist: &dyn LinguisticProcessor) -> Vec<String> {
    let tokens = tokenize::tokenize(raw);
    let filtered: Vec<&String> = tokens.iter().filter(|t| !linguist.is_stopword(t)).collect();
    let effective: Vec<&String> = if filtered.is_empty() {
        tokens.iter().collect()
    } else {
        filtered
    };
    let mut stemmed: Vec<String> = effective.into_iter().map(|t| linguist.stem(t)).collect();
    stemmed.truncate(QUERY_TERM_CAP);
    stemmed
}

/// One paginated search in progress: the per-term lazy posting generators,
/// and the query-side tf-idf state that's constant across pages.
pub struct QuerySession {
    stemmed_query_words: Vec<String>,
    query_magnitude: f64,
    n_docs: usize,
    generators: BTreeMap<String, PostingGenerator>,
    done: bool,
}

impl QuerySession {
    /// Pull the next page of ranked docids, or `None` once every term
    /// generator is exhausted.
    pub fn next_page(&mut self) -> Option<Vec<DocId>> {
        if self.done {
            return None;
        }

        let mut chunk_map: BTreeMap<String, PostingList> = BTreeMap::new();
        let mut lists: Vec<Vec<DocId>> = Vec::new();
        let mut backup: Vec<DocId> = Vec::new();
        let mut any = false;

        for (term, generator) in self.generators.iter_mut() {
            if let Some(chunk) = generator.next_chunk() {
                any = true;
                let ids: Vec<DocId> = chunk.postings().iter().map(|p| p.docid).collect();
                backup.extend(ids.iter().copied());
                lists.push(ids);
                chunk_map.insert(term.clone(), chunk);
            }
        }

        if !any {
            self.done = true;
            return None;
        }

        // Boolean candidate generation, kept for parity with the source's
        // `common_docids` computation. The original never actually filters
        // scoring by it (see `rank` below), so this is logged, not applied.
        let mut candidates = intersect_all(&lists);
        if candidates.is_empty() {
            let mut uniq: Vec<DocId> = backup.into_iter().collect::<HashSet<_>>().into_iter().collect();
            uniq.sort_unstable();
            uniq.truncate(RESULT_CHUNK_SIZE);
            candidates = uniq;
        }
        log::debug!("boolean candidates this chunk: {}", candidates.len());

        Some(rank(
            &chunk_map,
            &self.stemmed_query_words,
            self.n_docs,
            self.query_magnitude,
        ))
    }
}

fn intersect_all(lists: &[Vec<DocId>]) -> Vec<DocId> {
    let mut iter = lists.iter();
    let first = match iter.next() {
        Some(l) => l,
        None => return Vec::new(),
    };
    let mut common: HashSet<DocId> = first.iter().copied().collect();
    for list in iter {
        let set: HashSet<DocId> = list.iter().copied().collect();
        common = common.intersection(&set).copied().collect();
    }
    let mut result: Vec<DocId> = common.into_iter().collect();
    result.sort_unstable();
    result
}

fn query_vector_magnitude(query_terms: &[String]) -> f64 {
    let mut tf: HashMap<&str, u32> = HashMap::new();
    for term in query_terms {
        *tf.entry(term.as_str()).or_insert(0) += 1;
    }
    let len = query_terms.len() as f64;
    if len == 0.0 {
        return 0.0;
    }
    tf.values()
        .map(|&count| {
            let w = count as f64 / len;
            w * w
        })
        .sum::<f64>()
        .sqrt()
}

/// Score every docid that appears in any term's chunk by cosine similarity
/// over tf-idf weights (document weight `(1 + log10(tf)) * log10(N/df)`,
/// query weight `raw_count(t) / len(query_terms)` — a deliberately
/// simplified, non-idf query vector, preserved as a design choice of this
/// engine), add the +1 structural field bonus, and rank descending by score
/// with ties broken by ascending docid.
///
/// Scoring runs over the union of chunk docids, not the boolean candidate
/// list `next_page` computes alongside it — the source computes
/// `common_docids` but never consults it when building `relevant_docs`, so a
/// docid that matched only some query terms is still scored and ranked here.
/// Preserved rather than fixed, per the project's stance on the original's
/// existing ranking behavior.
fn rank(
    chunk_map: &BTreeMap<String, PostingList>,
    query_terms: &[String],
    n_docs: usize,
    query_magnitude: f64,
) -> Vec<DocId> {
    let mut query_tf: HashMap<&str, u32> = HashMap::new();
    for term in query_terms {
        *query_tf.entry(term.as_str()).or_insert(0) += 1;
    }
    let query_len = query_terms.len() as f64;

    let mut doc_weights: HashMap<DocId, HashMap<&str, f64>> = HashMap::new();
    let mut doc_bonus: HashMap<DocId, bool> = HashMap::new();

    for (term, list) in chunk_map {
        let df = list.df() as f64;
        for posting in list.postings() {
            let weight = (1.0 + (posting.tf as f64).log10()) * ((n_docs as f64) / df).log10();
            doc_weights
                .entry(posting.docid)
                .or_default()
                .insert(term.as_str(), weight);
            let bonus = doc_bonus.entry(posting.docid).or_insert(false);
            *bonus |= posting.fields.any();
        }
    }

    let mut scored: Vec<(DocId, f64)> = Vec::new();
    for (docid, weights) in &doc_weights {
        let doc_magnitude = weights.values().map(|w| w * w).sum::<f64>().sqrt();
        if doc_magnitude == 0.0 || query_magnitude == 0.0 {
            continue;
        }
        let dot: f64 = weights
            .iter()
            .map(|(term, weight)| {
                let query_weight = query_tf.get(term).map(|&c| c as f64 / query_len).unwrap_or(0.0);
                weight * query_weight
            })
            .sum();
        let cosine = dot / (query_magnitude * doc_magnitude);
        let bonus = if *doc_bonus.get(docid).unwrap_or(&false) {
            1.0
        } else {
            0.0
        };
        scored.push((*docid, cosine + bonus));
    }

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    scored.into_iter().map(|(docid, _)| docid).collect()
}

/// Lazily yields chunks of up to `RESULT_CHUNK_SIZE` postings for one term,
/// seeking to each of its recorded meta-index offsets in turn. A chunk never
/// spans two offsets: each recorded line is read in full and then sliced.
struct PostingGenerator {
    file: Rc<RefCell<File>>,
    offsets: VecDeque<u64>,
    pending: VecDeque<PostingList>,
}

impl PostingGenerator {
    fn new(file: Rc<RefCell<File>>, offsets: Vec<u64>) -> Self {
        PostingGenerator {
            file,
            offsets: offsets.into(),
            pending: VecDeque::new(),
        }
    }

    fn next_chunk(&mut self) -> Option<PostingList> {
        loop {
            if let Some(chunk) = self.pending.pop_front() {
                return Some(chunk);
            }

            let offset = self.offsets.pop_front()?;
            let line = match read_line_at(&self.file, offset) {
                Ok(line) => line,
                Err(err) => {
                    log::warn!("failed to read index at offset {}: {}", offset, err);
                    continue;
                }
            };

            match format::parse_line(&line) {
                Some((_, list)) => {
                    for chunk in list.into_postings().chunks(RESULT_CHUNK_SIZE) {
                        self.pending
                            .push_back(PostingList::from_sorted(chunk.to_vec()));
                    }
                }
                None => {
                    log::warn!("skipping malformed index line at offset {}", offset);
                }
            }
        }
    }
}

fn read_line_at(file: &Rc<RefCell<File>>, offset: u64) -> std::io::Result<String> {
    let mut handle = file.borrow_mut();
    handle.seek(SeekFrom::Start(offset))?;
    let mut reader = BufReader::new(&mut *handle);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(line)
}
