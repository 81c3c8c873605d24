use std::path::PathBuf;

use snafu::Snafu;

/// Crate-wide error type. Variants line up with the failure kinds called out
/// by the error-handling design: usage errors exit the CLI early, I/O errors
/// abort a build in progress, and the remaining variants are recoverable
/// (logged and skipped) at their call sites rather than surfaced here.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("I/O error on {}: {}", path.display(), source))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("usage error: {}", message))]
    Usage { message: String },

    #[snafu(display("malformed corpus document in {}: {}", path.display(), source))]
    MalformedDocument {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[snafu(display("failed to (de)serialize {}: {}", path.display(), source))]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
