use std::path::PathBuf;

use thiserror::Error;

/// The full error taxonomy threaded through every layer of the engine.
///
/// Every failure raised deliberately by the core is one of these variants;
/// [`Error::Io`] wraps the unexpected OS-level failures (permission denied,
/// disk full) that the engine doesn't name on purpose.
#[derive(Debug, Error)]
pub enum Error {
    #[error("out of space: file cap of {max_file_count} data files reached")]
    OutOfSpace { max_file_count: u32 },

    #[error("missing file: {path}")]
    MissingFile { path: PathBuf },

    #[error("no evictable frame: all {pool_size} resident frames are pinned")]
    NoEvictableFrame { pool_size: usize },

    #[error("page full: no free slot in page {page}")]
    PageFull {
        page: crate::common::PageAddress,
    },

    #[error("type mismatch: value '{value}' does not parse as {expected}")]
    TypeMismatch { value: String, expected: String },

    #[error("unknown table '{name}'")]
    UnknownTable { name: String },

    #[error("table '{name}' already exists")]
    DuplicateTable { name: String },

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Error::BadRequest(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
