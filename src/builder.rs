//! C4: the spilling driver. Walks the corpus in batches, invokes the batch
//! indexer, shifts docids to a global numbering, writes each batch's sorted
//! partial run to disk, and persists the growing `DocIndex` atomically.

use std::fs;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use snafu::ResultExt;

use crate::batch;
use crate::corpus;
use crate::docindex::DocIndex;
use crate::error::{self, Result};
use crate::format;
use crate::merge;
use crate::metaindex;
use crate::posting::DocId;
use crate::tokenize::{HtmlExtractor, LinguisticProcessor};

pub const PARTIAL_INDEXES_DIR: &str = "Partial_Indexes";
pub const MERGED_INDEXES_DIR: &str = "Merged_Indexes";
pub const INV_INDEX_NAME: &str = "InvIndex.txt";
pub const META_INDEX_NAME: &str = "MetaIndex.json";
pub const DOC_INDEX_NAME: &str = "DocIndex.json";

/// Tuning knobs exposed on the CLI. Defaults match the resource budgets
/// from the resource model: `B` = 18,465 documents per batch, `M` = 10 MiB
/// per merge block.
#[derive(Debug, Clone, Copy)]
pub struct BuildConfig {
    pub batch_size: usize,
    pub merge_block_bytes: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            batch_size: 18_465,
            merge_block_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Default)]
pub struct BuildStats {
    pub documents_indexed: usize,
    pub batches: usize,
}

/// Run the full build pipeline: spill partial runs per batch, binary-merge
/// them into one final index, and build the meta index over it. Any I/O
/// error aborts the build, leaving whatever on-disk state already exists
/// (partial runs, a partially-written `DocIndex.json`) untouched — a retry
/// re-runs the whole build rather than resuming.
pub fn run(
    corpus_dir: &Path,
    storage_dir: &Path,
    config: &BuildConfig,
    extractor: &dyn HtmlExtractor,
    linguist: &dyn LinguisticProcessor,
) -> Result<BuildStats> {
    fs::create_dir_all(storage_dir).context(error::IoSnafu {
        path: storage_dir.to_path_buf(),
    })?;
    let partial_dir = storage_dir.join(PARTIAL_INDEXES_DIR);
    let merged_dir = storage_dir.join(MERGED_INDEXES_DIR);
    fs::create_dir_all(&partial_dir).context(error::IoSnafu {
        path: partial_dir.clone(),
    })?;
    fs::create_dir_all(&merged_dir).context(error::IoSnafu {
        path: merged_dir.clone(),
    })?;

    let doc_index_path = storage_dir.join(DOC_INDEX_NAME);
    let mut doc_index = DocIndex::new();
    let mut max_docid: DocId = 0;
    let mut stats = BuildStats::default();

    let documents = corpus::iter_documents(corpus_dir);
    let chunks = documents.chunks(config.batch_size);
    let mut batch_no = 0usize;
    for chunk in &chunks {
        let batch_documents: Vec<_> = chunk.collect();
        if batch_documents.is_empty() {
            continue;
        }
        batch_no += 1;
        log::info!(
            "indexing batch {} ({} documents)",
            batch_no,
            batch_documents.len()
        );

        let output = batch::index_batch(batch_documents, extractor, linguist);
        let local_doc_count = output.doc_index.len() as DocId;

        let partial_path = partial_dir.join(format!("InvIndex_{}.txt", batch_no));
        write_partial_run(&partial_path, &output.index, max_docid)?;

        let mut shifted = DocIndex::new();
        for (docid, entry) in output.doc_index.iter() {
            shifted.insert(docid + max_docid, entry.clone());
        }
        doc_index.merge_from(shifted);
        doc_index.save_atomic(&doc_index_path)?;

        max_docid += local_doc_count;
        stats.documents_indexed += local_doc_count as usize;
        stats.batches += 1;
    }

    log::info!(
        "spilled {} batches, {} documents total; merging",
        stats.batches,
        stats.documents_indexed
    );

    let final_run = merge::merge_runs(&partial_dir, &merged_dir, config.merge_block_bytes)?;
    let final_index_path = storage_dir.join(INV_INDEX_NAME);
    fs::copy(&final_run, &final_index_path).context(error::IoSnafu {
        path: final_index_path.clone(),
    })?;

    let meta_index_path = storage_dir.join(META_INDEX_NAME);
    metaindex::build(&final_index_path, &meta_index_path)?;

    fs::remove_dir_all(&partial_dir).context(error::IoSnafu {
        path: partial_dir.clone(),
    })?;
    fs::remove_dir_all(&merged_dir).context(error::IoSnafu { path: merged_dir })?;

    Ok(stats)
}

fn write_partial_run(path: &Path, index: &batch::LocalIndex, shift: DocId) -> Result<()> {
    let mut out = String::new();
    for (term, list) in index {
        let shifted_postings: Vec<_> = list
            .postings()
            .iter()
            .cloned()
            .map(|mut p| {
                p.docid += shift;
                p
            })
            .collect();
        let shifted_list = crate::posting::PostingList::from_sorted(shifted_postings);
        out.push_str(&format::write_line(term, &shifted_list));
    }
    fs::write(path, out).context(error::IoSnafu {
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenize::{ScraperHtmlExtractor, SnowballProcessor};
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_corpus_file(dir: &Path, name: &str, records: &[(&str, &str)]) {
        let mut f = File::create(dir.join(name)).unwrap();
        for (url, html) in records {
            writeln!(
                f,
                r#"{{"url":"{}","content":{},"encoding":"utf-8"}}"#,
                url,
                serde_json::to_string(html).unwrap()
            )
            .unwrap();
        }
    }

    #[test]
    fn two_batches_disjoint_docs_get_contiguous_ids() {
        let corpus_dir = tempdir().unwrap();
        let storage_dir = tempdir().unwrap();

        write_corpus_file(
            corpus_dir.path(),
            "a.txt",
            &[("http://a", "<html><body>shared unique-a</body></html>")],
        );
        write_corpus_file(
            corpus_dir.path(),
            "b.txt",
            &[("http://b", "<html><body>shared unique-b</body></html>")],
        );

        let extractor = ScraperHtmlExtractor::new();
        let linguist = SnowballProcessor::new();
        let config = BuildConfig {
            batch_size: 1,
            merge_block_bytes: 10 * 1024 * 1024,
        };

        let stats = run(
            corpus_dir.path(),
            storage_dir.path(),
            &config,
            &extractor,
            &linguist,
        )
        .unwrap();

        assert_eq!(stats.documents_indexed, 2);
        assert_eq!(stats.batches, 2);

        let doc_index = DocIndex::load(&storage_dir.path().join(DOC_INDEX_NAME)).unwrap();
        assert_eq!(doc_index.len(), 2);
        assert!(doc_index.get(1).is_some());
        assert!(doc_index.get(2).is_some());

        let final_index = fs::read_to_string(storage_dir.path().join(INV_INDEX_NAME)).unwrap();
        // The shared term appears in both docs; its merged posting list
        // carries both docids in ascending order somewhere in the file.
        let shared_line = final_index
            .lines()
            .find(|line| line.starts_with("Term:share"))
            .expect("shared term should survive the merge");
        let (_, list) = format::parse_line(shared_line).unwrap();
        assert_eq!(list.df(), 2);
        let ids: Vec<DocId> = list.postings().iter().map(|p| p.docid).collect();
        assert_eq!(ids, vec![1, 2]);

        assert!(!storage_dir.path().join(PARTIAL_INDEXES_DIR).exists());
        assert!(!storage_dir.path().join(MERGED_INDEXES_DIR).exists());
    }

    #[test]
    fn single_batch_produces_readable_meta_index() {
        let corpus_dir = tempdir().unwrap();
        let storage_dir = tempdir().unwrap();

        write_corpus_file(
            corpus_dir.path(),
            "a.txt",
            &[(
                "http://example.com",
                "<html><title>Hello</title><body>Hello world</body></html>",
            )],
        );

        let extractor = ScraperHtmlExtractor::new();
        let linguist = SnowballProcessor::new();
        run(
            corpus_dir.path(),
            storage_dir.path(),
            &BuildConfig::default(),
            &extractor,
            &linguist,
        )
        .unwrap();

        let meta_bytes =
            fs::read(storage_dir.path().join(META_INDEX_NAME)).unwrap();
        let meta: std::collections::BTreeMap<String, Vec<u64>> =
            serde_json::from_slice(&meta_bytes).unwrap();
        assert!(meta.contains_key("hello"));
        assert!(meta.contains_key("world"));
    }
}
