//! The `DocIndex`: a key-sorted `docid -> (url, source_path)` mapping,
//! grown monotonically across batches and rewritten atomically to
//! `DocIndex.json` after every batch.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::error::{self, Result};
use crate::posting::DocId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocEntry {
    pub url: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocIndex(BTreeMap<DocId, DocEntry>);

impl DocIndex {
    pub fn new() -> Self {
        DocIndex(BTreeMap::new())
    }

    pub fn insert(&mut self, docid: DocId, entry: DocEntry) {
        self.0.insert(docid, entry);
    }

    pub fn get(&self, docid: DocId) -> Option<&DocEntry> {
        self.0.get(&docid)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DocId, &DocEntry)> {
        self.0.iter()
    }

    /// Merge another (already globally-numbered) doc index into this one.
    pub fn merge_from(&mut self, other: DocIndex) {
        self.0.extend(other.0);
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(DocIndex::new());
        }
        let bytes = fs::read(path).context(error::IoSnafu {
            path: path.to_path_buf(),
        })?;
        serde_json::from_slice(&bytes).context(error::JsonSnafu {
            path: path.to_path_buf(),
        })
    }

    /// Rewrite the whole file atomically: write to a sibling temp file then
    /// rename over the target. The source rewrites `DocIndex.json` in full
    /// on every batch without this guard; this crate keeps the full rewrite
    /// but makes it crash-safe.
    pub fn save_atomic(&self, path: &Path) -> Result<()> {
        let tmp_path = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(self).context(error::JsonSnafu {
            path: path.to_path_buf(),
        })?;
        fs::write(&tmp_path, &body).context(error::IoSnafu {
            path: tmp_path.clone(),
        })?;
        fs::rename(&tmp_path, path).context(error::IoSnafu {
            path: path.to_path_buf(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_and_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("DocIndex.json");

        let mut index = DocIndex::new();
        index.insert(
            1,
            DocEntry {
                url: "http://example.com".to_string(),
                path: PathBuf::from("/corpus/a.json"),
            },
        );
        index.save_atomic(&path).unwrap();

        let loaded = DocIndex::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get(1).unwrap().url, "http://example.com");
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let loaded = DocIndex::load(&path).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn merge_from_is_additive() {
        let mut a = DocIndex::new();
        a.insert(
            1,
            DocEntry {
                url: "a".into(),
                path: "a".into(),
            },
        );
        let mut b = DocIndex::new();
        b.insert(
            2,
            DocEntry {
                url: "b".into(),
                path: "b".into(),
            },
        );
        a.merge_from(b);
        assert_eq!(a.len(), 2);
    }
}
