//! C6: the meta-index builder. A single sequential scan of the final index
//! file, recording the byte offset before each line into `meta[term]`. The
//! value is list-valued (not a single offset) to accommodate the merge
//! engine's multi-line-per-term output.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

use snafu::ResultExt;

use crate::error::{self, Result};
use crate::format;

pub type MetaIndex = BTreeMap<String, Vec<u64>>;

/// Scan `index_path` and write the resulting meta index to `meta_path` as
/// key-sorted JSON. Lines that don't even match the `Term:<term>,` prefix
/// are skipped, not recorded.
pub fn build(index_path: &Path, meta_path: &Path) -> Result<()> {
    let meta = scan(index_path)?;
    let body = serde_json::to_vec_pretty(&meta).context(error::JsonSnafu {
        path: meta_path.to_path_buf(),
    })?;
    fs::write(meta_path, body).context(error::IoSnafu {
        path: meta_path.to_path_buf(),
    })?;
    Ok(())
}

pub fn scan(index_path: &Path) -> Result<MetaIndex> {
    let file = File::open(index_path).context(error::IoSnafu {
        path: index_path.to_path_buf(),
    })?;
    let mut reader = BufReader::new(file);
    let mut meta: MetaIndex = BTreeMap::new();
    let mut offset: u64 = 0;

    loop {
        let start = offset;
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).context(error::IoSnafu {
            path: index_path.to_path_buf(),
        })?;
        if bytes_read == 0 {
            break;
        }
        offset += bytes_read as u64;

        if let Some(term) = format::term_of(&line) {
            meta.entry(term).or_default().push(start);
        }
    }

    Ok(meta)
}

pub fn load(meta_path: &Path) -> Result<MetaIndex> {
    let bytes = fs::read(meta_path).context(error::IoSnafu {
        path: meta_path.to_path_buf(),
    })?;
    serde_json::from_slice(&bytes).context(error::JsonSnafu {
        path: meta_path.to_path_buf(),
    })
}
