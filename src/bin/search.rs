//! `rsearch-search <inv_index_path> <meta_index_path> <doc_index_path>`:
//! the interactive query loop. `-1` quits, `0` starts a new query, an empty
//! line pages to the next batch of results for the current query.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{crate_authors, crate_description, crate_name, crate_version, App, Arg};

use rsearch::cache::{ResultCache, DEFAULT_BUDGET_BYTES};
use rsearch::corpus::CorpusRecord;
use rsearch::docindex::DocEntry;
use rsearch::posting::DocId;
use rsearch::query::{QuerySession, Session};
use rsearch::snippet::{ContextWindowFormatter, SnippetFormatter};
use rsearch::tokenize::{self, HtmlExtractor, LinguisticProcessor, ScraperHtmlExtractor, SnowballProcessor};

fn main() {
    env_logger::init();

    let matches = App::new(crate_name!())
        .version(crate_version!())
        .about(crate_description!())
        .author(crate_authors!())
        .arg(
            Arg::with_name("inv_index_path")
                .help("Path to the final inverted index (InvIndex.txt)")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("meta_index_path")
                .help("Path to the meta index (MetaIndex.json)")
                .required(true)
                .index(2),
        )
        .arg(
            Arg::with_name("doc_index_path")
                .help("Path to the doc index (DocIndex.json)")
                .required(true)
                .index(3),
        )
        .arg(
            Arg::with_name("snippets")
                .long("snippets")
                .help("Display a highlighted context window per matching term instead of just the URL"),
        )
        .arg(
            Arg::with_name("cache")
                .long("cache")
                .takes_value(true)
                .help("Path to the result-cache blob (default: alongside the doc index)"),
        )
        .get_matches();

    let inv_index_path = PathBuf::from(matches.value_of("inv_index_path").expect("required arg"));
    let meta_index_path = PathBuf::from(matches.value_of("meta_index_path").expect("required arg"));
    let doc_index_path = PathBuf::from(matches.value_of("doc_index_path").expect("required arg"));
    let show_snippets = matches.is_present("snippets");
    let cache_path = matches
        .value_of("cache")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            doc_index_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("Cache.json")
        });

    let session = match Session::open(&inv_index_path, &meta_index_path, &doc_index_path) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("failed to open index: {}", err);
            process::exit(2);
        }
    };

    let mut cache = match ResultCache::load(&cache_path) {
        Ok(cache) => cache,
        Err(err) => {
            log::warn!("failed to load cache at {}: {}", cache_path.display(), err);
            ResultCache::new()
        }
    };

    let linguist = SnowballProcessor::new();
    let extractor = ScraperHtmlExtractor::new();
    let formatter = ContextWindowFormatter::new();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    'outer: loop {
        print!("\nEnter text to search or '-1' to exit: ");
        io::stdout().flush().ok();
        let query = match read_line(&mut lines) {
            Some(line) => line,
            None => break,
        };
        if query == "-1" {
            break;
        }

        let mut search = session.search(&query, &linguist);
        let filter_terms = filtered_query_terms(&query, &linguist);
        let mut first_page = true;

        loop {
            let page = if first_page {
                match cache.get(&query) {
                    Some(cached) => {
                        let page = cached.to_vec();
                        cache.record_hit(&query);
                        Some(page)
                    }
                    None => fetch_and_cache(&mut search, &mut cache, &query),
                }
            } else {
                fetch_and_cache(&mut search, &mut cache, &query)
            };
            first_page = false;

            if let Err(err) = cache.save(&cache_path) {
                log::warn!("failed to persist cache: {}", err);
            }

            let docids = match page {
                Some(docids) => docids,
                None => {
                    println!("End of results");
                    break;
                }
            };

            print_results(&docids, &session, &filter_terms, show_snippets, &extractor, &formatter);

            print!(
                "\nPress enter to see more results for {}. \nEnter '0' to search something else\nEnter '-1' to quit\n",
                query
            );
            io::stdout().flush().ok();
            match read_line(&mut lines) {
                Some(ref cin) if cin == "-1" => break 'outer,
                Some(ref cin) if cin == "0" => break,
                Some(_) => continue,
                None => break 'outer,
            }
        }
    }
}

fn read_line<R: BufRead>(lines: &mut io::Lines<R>) -> Option<String> {
    match lines.next() {
        Some(Ok(line)) => Some(line.trim_end_matches(|c| c == '\r' || c == '\n').to_string()),
        _ => None,
    }
}

fn fetch_and_cache(
    search: &mut QuerySession,
    cache: &mut ResultCache,
    query: &str,
) -> Option<Vec<DocId>> {
    let page = search.next_page();
    if let Some(ref docids) = page {
        cache.put(query.to_string(), docids.clone(), DEFAULT_BUDGET_BYTES);
    }
    page
}

/// Non-stemmed query terms, stopword-filtered with the same fallback as
/// [`rsearch::query::normalize_query`]. Used only for snippet generation,
/// which searches for the terms as they appear in the document rather than
/// their stems.
fn filtered_query_terms(raw: &str, linguist: &dyn LinguisticProcessor) -> Vec<String> {
    let tokens = tokenize::tokenize(raw);
    let filtered: Vec<String> = tokens
        .iter()
        .filter(|t| !linguist.is_stopword(t))
        .cloned()
        .collect();
    if filtered.is_empty() {
        tokens
    } else {
        filtered
    }
}

fn print_results(
    docids: &[DocId],
    session: &Session,
    filter_terms: &[String],
    show_snippets: bool,
    extractor: &dyn HtmlExtractor,
    formatter: &dyn SnippetFormatter,
) {
    for &docid in docids {
        let entry = match session.doc_index.get(docid) {
            Some(entry) => entry,
            None => continue,
        };

        if !show_snippets {
            println!("{}", entry.url);
            continue;
        }

        println!("{}", "=".repeat(80));
        println!("{}", entry.url);
        match load_document_text(entry, extractor) {
            Some(text) => {
                let windows = formatter.windows(&text, filter_terms);
                for window in &windows {
                    println!("\t..\n{}", window);
                }
            }
            None => log::warn!("could not re-extract text for {}", entry.url),
        }
        println!("{}", "=".repeat(80));
    }
}

/// Re-reads the corpus record backing `entry` and extracts its plain text,
/// for snippet display only — neither index-building nor ranking ever
/// revisits the corpus after a document has been indexed.
fn load_document_text(entry: &DocEntry, extractor: &dyn HtmlExtractor) -> Option<String> {
    let contents = fs::read_to_string(&entry.path).ok()?;
    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if let Ok(record) = serde_json::from_str::<CorpusRecord>(line) {
            if record.url == entry.url {
                return Some(extractor.extract(&record.content).text);
            }
        }
    }
    None
}
