//! C5: the bounded-memory binary merge engine. Repeatedly pops two runs off
//! a FIFO queue (initially the partial runs, name-sorted), merges them under
//! a fixed memory budget, and pushes the result to the back, until one run
//! remains.

use std::collections::{BTreeMap, VecDeque};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use snafu::ResultExt;

use crate::error::{self, Result};
use crate::format;
use crate::posting::PostingList;

/// Cheap, shallow estimate of one posting list's in-memory footprint —
/// mirrors the source's use of a shallow `sys.getsizeof` for block-size
/// accounting, which also doesn't account for referenced payloads.
fn estimate_size(term: &str, list: &PostingList) -> usize {
    let mut size = term.len() + 48;
    for posting in list.postings() {
        size += 32 + posting.term_positions.len() * 4;
    }
    size
}

/// Merge all runs found in `partial_dir` (name-sorted) into a single final
/// run written under `merged_dir`, returning its path. With zero or one
/// partial run, no pairwise merge is needed.
pub fn merge_runs(partial_dir: &Path, merged_dir: &Path, block_bytes: usize) -> Result<PathBuf> {
    let mut queue: VecDeque<PathBuf> = read_sorted_files(partial_dir)?;

    if queue.is_empty() {
        let path = merged_dir.join("MergedIndex_0.txt");
        File::create(&path).context(error::IoSnafu { path: path.clone() })?;
        return Ok(path);
    }

    let mut counter = 0usize;
    while queue.len() > 1 {
        counter += 1;
        let a = queue.pop_front().expect("queue.len() > 1");
        let b = queue.pop_front().expect("queue.len() > 1");
        let out_path = merged_dir.join(format!("MergedIndex_{}.txt", counter));
        log::debug!(
            "merging {} and {} into {}",
            a.display(),
            b.display(),
            out_path.display()
        );
        merge_pair(&a, &b, &out_path, block_bytes)?;
        queue.push_back(out_path);
    }

    Ok(queue.pop_front().expect("queue is non-empty"))
}

fn read_sorted_files(dir: &Path) -> Result<VecDeque<PathBuf>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .context(error::IoSnafu {
            path: dir.to_path_buf(),
        })?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    entries.sort();
    Ok(entries.into())
}

/// Merge two runs into one, in the bounded-memory block-at-a-time fashion:
/// load a contiguous prefix of each run's remaining lines up to `block_bytes`
/// (or EOF), merge the two blocks term-by-term, flush, repeat. A term whose
/// postings span more than one block-flush cycle of the *same* pairwise
/// merge produces more than one output line for that term — expected, and
/// left for the meta index (list-valued) and the query processor
/// (concatenates across offsets) to tolerate.
fn merge_pair(a: &Path, b: &Path, out: &Path, block_bytes: usize) -> Result<()> {
    let mut reader_a = BufReader::new(File::open(a).context(error::IoSnafu { path: a.to_path_buf() })?);
    let mut reader_b = BufReader::new(File::open(b).context(error::IoSnafu { path: b.to_path_buf() })?);
    let mut writer = BufWriter::new(
        File::create(out).context(error::IoSnafu {
            path: out.to_path_buf(),
        })?,
    );

    let mut eof_a = false;
    let mut eof_b = false;

    loop {
        let block_a = read_block(&mut reader_a, block_bytes, &mut eof_a);
        let block_b = read_block(&mut reader_b, block_bytes, &mut eof_b);

        let mut merged: BTreeMap<String, PostingList> = BTreeMap::new();
        for (term, list) in block_a {
            merged.insert(term, list);
        }
        for (term, list) in block_b {
            merged
                .entry(term)
                .and_modify(|existing| {
                    let taken = std::mem::take(existing);
                    *existing = taken.merge_disjoint(list.clone());
                })
                .or_insert(list);
        }

        for (term, list) in &merged {
            writer
                .write_all(format::write_line(term, list).as_bytes())
                .context(error::IoSnafu {
                    path: out.to_path_buf(),
                })?;
        }

        if eof_a && eof_b {
            break;
        }
    }

    writer.flush().context(error::IoSnafu {
        path: out.to_path_buf(),
    })?;
    Ok(())
}

fn read_block(
    reader: &mut BufReader<File>,
    budget: usize,
    eof: &mut bool,
) -> BTreeMap<String, PostingList> {
    let mut block: BTreeMap<String, PostingList> = BTreeMap::new();
    let mut accumulated = 0usize;

    if *eof {
        return block;
    }

    loop {
        let mut line = String::new();
        let bytes_read = match reader.read_line(&mut line) {
            Ok(n) => n,
            Err(_) => {
                *eof = true;
                break;
            }
        };
        if bytes_read == 0 {
            *eof = true;
            break;
        }

        if let Some((term, list)) = format::parse_line(&line) {
            accumulated += estimate_size(&term, &list);
            block
                .entry(term)
                .and_modify(|existing| {
                    let taken = std::mem::take(existing);
                    *existing = taken.merge_disjoint(list.clone());
                })
                .or_insert(list);
        }

        if accumulated >= budget {
            break;
        }
    }

    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posting::{Fields, Posting};
    use tempfile::tempdir;

    fn write_run(path: &Path, entries: &[(&str, Vec<(u32, u32)>)]) {
        let mut out = String::new();
        for (term, postings) in entries {
            let list = PostingList::from_sorted(
                postings
                    .iter()
                    .map(|(docid, tf)| Posting {
                        docid: *docid,
                        tf: *tf,
                        fields: Fields::default(),
                        term_positions: vec![0],
                    })
                    .collect(),
            );
            out.push_str(&format::write_line(term, &list));
        }
        fs::write(path, out).unwrap();
    }

    #[test]
    fn merges_disjoint_docids_in_ascending_order() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        let out = dir.path().join("out.txt");

        write_run(&a, &[("cat", vec![(1, 3)]), ("dog", vec![(1, 1)])]);
        write_run(&b, &[("cat", vec![(2, 5)])]);

        merge_pair(&a, &b, &out, 10 * 1024 * 1024).unwrap();

        let contents = fs::read_to_string(&out).unwrap();
        let cat_line = contents
            .lines()
            .find(|l| l.starts_with("Term:cat,"))
            .unwrap();
        let (_, list) = format::parse_line(cat_line).unwrap();
        let ids: Vec<u32> = list.postings().iter().map(|p| p.docid).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(list.df(), 2);
    }

    #[test]
    fn merge_with_empty_run_is_idempotent() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let empty = dir.path().join("empty.txt");
        let out = dir.path().join("out.txt");

        write_run(&a, &[("cat", vec![(1, 3)])]);
        fs::write(&empty, "").unwrap();

        merge_pair(&a, &empty, &out, 10 * 1024 * 1024).unwrap();

        let original = fs::read_to_string(&a).unwrap();
        let merged = fs::read_to_string(&out).unwrap();
        assert_eq!(original, merged);
    }

    #[test]
    fn merge_runs_reduces_queue_to_one_file() {
        let dir = tempdir().unwrap();
        let partial = dir.path().join("partial");
        let merged = dir.path().join("merged");
        fs::create_dir_all(&partial).unwrap();
        fs::create_dir_all(&merged).unwrap();

        write_run(&partial.join("InvIndex_1.txt"), &[("cat", vec![(1, 1)])]);
        write_run(&partial.join("InvIndex_2.txt"), &[("dog", vec![(2, 1)])]);
        write_run(&partial.join("InvIndex_3.txt"), &[("cat", vec![(3, 1)])]);

        let final_path = merge_runs(&partial, &merged, 10 * 1024 * 1024).unwrap();
        let contents = fs::read_to_string(&final_path).unwrap();
        let cat_line = contents
            .lines()
            .find(|l| l.starts_with("Term:cat,"))
            .unwrap();
        let (_, list) = format::parse_line(cat_line).unwrap();
        let ids: Vec<u32> = list.postings().iter().map(|p| p.docid).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
