//! C8: the bounded result cache. Keyed by the raw (un-normalized) query
//! string, first-computed-results-win, evicted by a 2-way tournament over
//! `(last_access, hit_count)` rather than strict LRU, and persisted to a
//! single JSON file after every write.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::error::{self, Result};
use crate::posting::DocId;

/// Retained-payload budget, matching the source's `CACHE_SIZE = 100000000`
/// literal byte count (a plain decimal 100 MB, not 100 MiB).
pub const DEFAULT_BUDGET_BYTES: usize = 100_000_000;

/// Per-entry bookkeeping overhead folded into the size estimate, standing in
/// for the source's shallow `sys.getsizeof` of the whole cache dict.
const ENTRY_OVERHEAD_BYTES: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    last_access: u64,
    hit_count: u64,
    docids: Vec<DocId>,
}

/// A bounded cache from raw query string to a full ranked result list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultCache {
    entries: BTreeMap<String, CacheEntry>,
}

impl ResultCache {
    pub fn new() -> Self {
        ResultCache {
            entries: BTreeMap::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(ResultCache::new());
        }
        let bytes = fs::read(path).context(error::IoSnafu {
            path: path.to_path_buf(),
        })?;
        serde_json::from_slice(&bytes).context(error::JsonSnafu {
            path: path.to_path_buf(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
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

    /// Look up a cached full result list by the exact query string used to
    /// `put` it. Does not bump `last_access`/`hit_count` by itself — callers
    /// go through [`ResultCache::record_hit`] once they've decided to use the
    /// cached results, matching the source's "get, then separately record
    /// the hit" split between `get_result` and `add_result`.
    pub fn get(&self, query: &str) -> Option<&[DocId]> {
        self.entries.get(query).map(|e| e.docids.as_slice())
    }

    /// Record a repeat query against already-cached results: bump
    /// `last_access` to now and increment `hit_count`. The stored results
    /// themselves are never replaced — first-computed-results win.
    pub fn record_hit(&mut self, query: &str) {
        if let Some(entry) = self.entries.get_mut(query) {
            entry.last_access = now();
            entry.hit_count += 1;
        }
    }

    /// Insert a freshly computed result list for a query not already cached,
    /// then evict down to `budget` if the insert pushed the cache over.
    /// Inserting over an existing key is a no-op other than the hit-count
    /// bump `record_hit` already performs — callers check [`Self::get`]
    /// first and only call `put` on a miss.
    pub fn put(&mut self, query: String, docids: Vec<DocId>, budget: usize) {
        self.entries.entry(query).or_insert_with(|| CacheEntry {
            last_access: now(),
            hit_count: 1,
            docids,
        });
        self.evict_to_budget(budget);
    }

    fn estimate_size(&self) -> usize {
        self.entries
            .iter()
            .map(|(query, entry)| {
                query.len()
                    + entry.docids.len() * std::mem::size_of::<DocId>()
                    + ENTRY_OVERHEAD_BYTES
            })
            .sum()
    }

    /// 2-way tournament eviction: sort all entries oldest-first by
    /// `last_access`, then repeatedly compare the two oldest remaining —
    /// drop whichever has the smaller `hit_count` (ties drop the older, i.e.
    /// the first of the pair) — until back under budget or only one entry
    /// is left.
    fn evict_to_budget(&mut self, budget: usize) {
        if self.estimate_size() <= budget {
            return;
        }

        let mut order: Vec<String> = self.entries.keys().cloned().collect();
        order.sort_by_key(|k| self.entries[k].last_access);

        while self.estimate_size() > budget && order.len() > 1 {
            let first = &order[0];
            let second = &order[1];
            let drop_first = self.entries[first].hit_count <= self.entries[second].hit_count;
            if drop_first {
                let key = order.remove(0);
                self.entries.remove(&key);
            } else {
                let key = order.remove(1);
                self.entries.remove(&key);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn miss_then_hit() {
        let mut cache = ResultCache::new();
        assert!(cache.get("cats").is_none());
        cache.put("cats".to_string(), vec![1, 2, 3], DEFAULT_BUDGET_BYTES);
        assert_eq!(cache.get("cats"), Some(&[1u32, 2, 3][..]));
    }

    #[test]
    fn put_does_not_replace_existing_results() {
        let mut cache = ResultCache::new();
        cache.put("cats".to_string(), vec![1, 2], DEFAULT_BUDGET_BYTES);
        cache.put("cats".to_string(), vec![9, 9, 9], DEFAULT_BUDGET_BYTES);
        assert_eq!(cache.get("cats"), Some(&[1u32, 2][..]));
    }

    #[test]
    fn record_hit_bumps_count_without_touching_results() {
        let mut cache = ResultCache::new();
        cache.put("cats".to_string(), vec![1], DEFAULT_BUDGET_BYTES);
        cache.record_hit("cats");
        cache.record_hit("cats");
        assert_eq!(cache.entries.get("cats").unwrap().hit_count, 3);
        assert_eq!(cache.get("cats"), Some(&[1u32][..]));
    }

    #[test]
    fn eviction_drops_lower_hit_count_among_two_oldest() {
        let mut cache = ResultCache::new();
        cache.entries.insert(
            "a".to_string(),
            CacheEntry {
                last_access: 1,
                hit_count: 1,
                docids: vec![1; 1000],
            },
        );
        cache.entries.insert(
            "b".to_string(),
            CacheEntry {
                last_access: 2,
                hit_count: 50,
                docids: vec![1; 1000],
            },
        );
        cache.entries.insert(
            "c".to_string(),
            CacheEntry {
                last_access: 3,
                hit_count: 1,
                docids: vec![1; 1000],
            },
        );

        // Budget small enough that exactly one entry must go; "a" is oldest
        // and has the smaller hit count in its pairing against "b".
        let tiny_budget = cache.estimate_size() - 1;
        cache.evict_to_budget(tiny_budget);

        assert!(!cache.entries.contains_key("a"));
        assert!(cache.entries.contains_key("b"));
        assert!(cache.entries.contains_key("c"));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut cache = ResultCache::new();
        cache.put("dogs".to_string(), vec![4, 5], DEFAULT_BUDGET_BYTES);
        cache.save(&path).unwrap();

        let loaded = ResultCache::load(&path).unwrap();
        assert_eq!(loaded.get("dogs"), Some(&[4u32, 5][..]));
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let loaded = ResultCache::load(&dir.path().join("missing.json")).unwrap();
        assert!(loaded.is_empty());
    }
}
