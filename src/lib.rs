//! rsearch: an out-of-core HTML search engine.
//!
//! Two pipelines live here. The builder (`builder`, backed by `batch`,
//! `format`, `merge`, `metaindex`, `docindex`, `corpus`) turns a corpus
//! directory into a disk-resident inverted index in bounded memory. The
//! query processor (`query`, fronted by `cache`) streams ranked results
//! back out of that index. `tokenize` supplies the HTML extraction and
//! stemming collaborators both sides depend on; `snippet` is the optional
//! presentation layer neither core pipeline needs to function.

pub mod batch;
pub mod builder;
pub mod cache;
pub mod corpus;
pub mod docindex;
pub mod error;
pub mod format;
pub mod merge;
pub mod metaindex;
pub mod posting;
pub mod query;
pub mod snippet;
pub mod tokenize;

pub use error::{Error, Result};
