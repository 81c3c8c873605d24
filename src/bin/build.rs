//! `rsearch-build <corpus_dir> <storage_dir>`: runs the full offline
//! pipeline (spill, binary merge, meta-index) over a corpus directory.

use std::path::PathBuf;
use std::process;

use clap::{crate_authors, crate_description, crate_name, crate_version, App, Arg};

use rsearch::builder::{self, BuildConfig};
use rsearch::error::{self, Error, Result};
use rsearch::tokenize::{ScraperHtmlExtractor, SnowballProcessor};

fn main() {
    env_logger::init();

    match run() {
        Ok(()) => process::exit(0),
        Err(err @ Error::Usage { .. }) => {
            eprintln!("{}", err);
            process::exit(1);
        }
        Err(err) => {
            eprintln!("build failed: {}", err);
            process::exit(2);
        }
    }
}

fn run() -> Result<()> {
    let matches = App::new(crate_name!())
        .version(crate_version!())
        .about(crate_description!())
        .author(crate_authors!())
        .arg(
            Arg::with_name("corpus_dir")
                .help("Directory containing the corpus documents")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("storage_dir")
                .help("Directory to write DocIndex.json, InvIndex.txt, MetaIndex.json into")
                .required(true)
                .index(2),
        )
        .arg(
            Arg::with_name("batch-size")
                .long("batch-size")
                .takes_value(true)
                .help("Documents per in-memory batch (default 18465)"),
        )
        .arg(
            Arg::with_name("merge-block-mib")
                .long("merge-block-mib")
                .takes_value(true)
                .help("Merge block memory budget in MiB (default 10)"),
        )
        .get_matches();

    let corpus_dir = PathBuf::from(matches.value_of("corpus_dir").expect("required arg"));
    let storage_dir = PathBuf::from(matches.value_of("storage_dir").expect("required arg"));

    let mut config = BuildConfig::default();
    if let Some(value) = matches.value_of("batch-size") {
        match value.parse::<usize>() {
            Ok(n) if n > 0 => config.batch_size = n,
            _ => {
                return error::UsageSnafu {
                    message: format!("invalid --batch-size: {}", value),
                }
                .fail();
            }
        }
    }
    if let Some(value) = matches.value_of("merge-block-mib") {
        match value.parse::<usize>() {
            Ok(n) if n > 0 => config.merge_block_bytes = n * 1024 * 1024,
            _ => {
                return error::UsageSnafu {
                    message: format!("invalid --merge-block-mib: {}", value),
                }
                .fail();
            }
        }
    }

    if !corpus_dir.is_dir() {
        return error::UsageSnafu {
            message: format!("corpus directory not found: {}", corpus_dir.display()),
        }
        .fail();
    }

    let extractor = ScraperHtmlExtractor::new();
    let linguist = SnowballProcessor::new();

    let stats = builder::run(&corpus_dir, &storage_dir, &config, &extractor, &linguist)?;
    log::info!(
        "build complete: {} documents across {} batches",
        stats.documents_indexed,
        stats.batches
    );
    Ok(())
}
