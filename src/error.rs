use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for ingestion operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Error type shared by inference, provisioning, streaming and the archive pipeline.
///
/// Only [`IngestionError::SampleParse`] is surfaced to callers as a per-table failure; the
/// line-level variants are counted and handed to an
/// [`crate::ingestion::IngestionObserver`] instead of aborting a run.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Error returned by the SQLite table store.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The sample record for a table kind could not be read or decoded.
    #[error("failed to infer schema for table '{table}' from {}: {message}", .path.display())]
    SampleParse {
        table: String,
        path: PathBuf,
        message: String,
    },

    /// One input line was not a JSON object.
    #[error("failed to parse json at {}:{line}: {message}", .path.display())]
    LineParse {
        path: PathBuf,
        line: u64,
        message: String,
    },

    /// The destination table could not be created.
    #[error("failed to create table '{table}': {message}")]
    TableCreation { table: String, message: String },

    /// A typed row could not be inserted.
    #[error("failed to insert line {line} into '{table}': {message}")]
    Write {
        table: String,
        line: u64,
        message: String,
    },

    /// An archive file name does not follow `<group>_<tableKind>.<ext>`, or maps to the same
    /// decompressed file as another archive.
    #[error("invalid archive name '{name}': {message}")]
    InvalidArchiveName { name: String, message: String },

    /// The external decompression step failed for one archive.
    #[error("failed to decompress {}: {message}", .path.display())]
    Decompress { path: PathBuf, message: String },

    /// The decompression thread pool could not be built.
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
