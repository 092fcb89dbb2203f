//! Shared error types for the migrator.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort processing of a single file (or, for `Config`, the run).
///
/// Ambiguous rewrites and membership-table gaps are deliberately *not*
/// represented here: an ambiguous rewrite inserts a sentinel annotation and
/// processing continues, and an unknown class silently keeps its legacy
/// module.
#[derive(Debug, Error)]
pub enum Error {
    /// File could not be read or written
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File bytes do not decode under the declared encoding
    #[error("decode error in {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// The tokenizer rejected the source; the file is skipped unmodified
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Membership tables could not be loaded
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn decode(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
