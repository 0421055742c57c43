//! Error types for note import.
//!
//! Only document- and batch-level failures are errors. Problems with a
//! single trade or summary line are reported as [`ParseWarning`]s instead.
//!
//! [`ParseWarning`]: crate::models::ParseWarning

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("invalid PDF {path}: {reason}")]
    InvalidPdf { path: PathBuf, reason: String },

    #[error("text extraction failed for {path}: {reason}")]
    Extraction { path: PathBuf, reason: String },

    #[error("failed to write split document {path}: {reason}")]
    SplitWrite { path: PathBuf, reason: String },

    #[error("invalid pattern '{pattern}' in profile {profile}: {source}")]
    Pattern {
        profile: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("pattern '{pattern}' in profile {profile} lacks the named group '{group}'")]
    MissingGroup {
        profile: String,
        pattern: String,
        group: String,
    },

    #[error("unsupported document type: {0}")]
    UnsupportedFile(PathBuf),
}

impl ImportError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;
