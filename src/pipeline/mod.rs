//! End-to-end orchestration: discover, decompress, infer, provision, stream.
//!
//! ```text
//! archives ──(parallel)──► decompressed files ──► sample per kind ──► schema per kind
//!                                                                        │
//!                           rows ◄── stream each file, in order ◄── provision tables
//! ```
//!
//! Everything after decompression runs sequentially on the calling thread: one file is fully
//! drained before the next begins, and the run totals are only touched from here.

pub mod archive;
pub mod decompress;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{IngestionError, IngestionResult};
use crate::ingestion::{
    IngestionContext, IngestionOptions, IngestionStats, SampleBasedInference, SchemaInferencer, ingest_file,
};
use crate::store::{TableStore, provision_table};
use crate::types::Schema;

pub use archive::{ArchiveRef, DecompressedFile, discover_archives, smallest_file_per_kind};
pub use decompress::{CommandDecompressor, Decompressor, decompress_all};

/// Configuration for a [`Pipeline`] run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Extension of the archives to pick up (without the dot).
    pub archive_extension: String,
    /// Where decompressed files are written. Defaults to `<dir>/decompressed`.
    pub decompressed_dir: Option<PathBuf>,
    /// Decompression worker threads. `None` uses the available parallelism.
    pub num_threads: Option<usize>,
    /// Per-file ingestion options, shared by every table.
    pub ingestion: IngestionOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            archive_extension: "zst".to_string(),
            decompressed_dir: None,
            num_threads: None,
            ingestion: IngestionOptions::default(),
        }
    }
}

/// A file or archive that could not be processed, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Totals across every ingested file.
    pub stats: IngestionStats,
    /// Inferred schema per table kind.
    pub schemas: BTreeMap<String, Schema>,
    /// Table kinds whose schema could not be inferred, with the reason.
    pub failed_tables: BTreeMap<String, String>,
    /// Archives that were badly named or failed to decompress.
    pub failed_archives: Vec<FileFailure>,
    /// Files that could not be opened or read to the end.
    pub failed_files: Vec<FileFailure>,
    /// Files not ingested because their table kind has no schema.
    pub skipped_files: Vec<PathBuf>,
}

impl RunReport {
    /// Whether anything at all went wrong, down to a single line.
    pub fn has_failures(&self) -> bool {
        self.stats.has_failures()
            || !self.failed_tables.is_empty()
            || !self.failed_archives.is_empty()
            || !self.failed_files.is_empty()
            || !self.skipped_files.is_empty()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Job finished:")?;
        for line in self.stats.to_string().lines() {
            writeln!(f, "    {line}")?;
        }
        for (table, reason) in &self.failed_tables {
            writeln!(f, "    table '{table}' skipped: {reason}")?;
        }
        for failure in self.failed_archives.iter().chain(&self.failed_files) {
            writeln!(f, "    {} failed: {}", failure.path.display(), failure.reason)?;
        }
        if !self.skipped_files.is_empty() {
            writeln!(f, "    {} file(s) skipped without a schema", self.skipped_files.len())?;
        }
        Ok(())
    }
}

/// Runs the whole ingestion job against one [`TableStore`].
pub struct Pipeline<'s, S: TableStore + ?Sized> {
    store: &'s S,
    inferencer: Box<dyn SchemaInferencer>,
    options: PipelineOptions,
}

impl<'s, S: TableStore + ?Sized> Pipeline<'s, S> {
    /// Create a pipeline using [`SampleBasedInference`].
    pub fn new(store: &'s S, options: PipelineOptions) -> Self {
        Self {
            store,
            inferencer: Box::new(SampleBasedInference),
            options,
        }
    }

    /// Replace the schema inference strategy.
    pub fn with_inferencer(mut self, inferencer: Box<dyn SchemaInferencer>) -> Self {
        self.inferencer = inferencer;
        self
    }

    /// Discover the archives in `dir`, decompress them all, then ingest the results.
    ///
    /// Badly named archives and failed decompressions are reported and left out. An `Err` is
    /// returned only when the archive directory cannot be listed, the output directory cannot be
    /// created, or the decompression pool cannot start.
    pub fn run_archives(&self, dir: impl AsRef<Path>, decompressor: &dyn Decompressor) -> IngestionResult<RunReport> {
        let dir = dir.as_ref();
        let mut report = RunReport::default();

        let mut archives: Vec<ArchiveRef> = Vec::new();
        let mut outputs = BTreeSet::new();
        for path in discover_archives(dir, &self.options.archive_extension)? {
            match ArchiveRef::from_path(&path) {
                // Two archives sharing a stem would decompress onto the same file.
                Ok(archive) if !outputs.insert(archive.decompressed_file_name()) => {
                    let e = IngestionError::InvalidArchiveName {
                        message: format!(
                            "decompresses to {} like an earlier archive",
                            archive.decompressed_file_name()
                        ),
                        name: archive.file_name,
                    };
                    self.record_archive_failure(&mut report, path, e);
                }
                Ok(archive) => archives.push(archive),
                Err(e) => self.record_archive_failure(&mut report, path, e),
            }
        }

        let output_dir = self
            .options
            .decompressed_dir
            .clone()
            .unwrap_or_else(|| dir.join("decompressed"));
        fs::create_dir_all(&output_dir)?;

        tracing::info!(count = archives.len(), dir = %dir.display(), "decompressing archives");
        let mut files = Vec::with_capacity(archives.len());
        for (archive, result) in decompress_all(&archives, dir, &output_dir, decompressor, self.options.num_threads)? {
            match result {
                Ok(file) => files.push(file),
                Err(e) => self.record_archive_failure(&mut report, dir.join(&archive.file_name), e),
            }
        }

        self.ingest_into(&files, &mut report);
        Ok(report)
    }

    /// Infer, provision and stream already decompressed files, in the given order.
    pub fn ingest_files(&self, files: &[DecompressedFile]) -> RunReport {
        let mut report = RunReport::default();
        self.ingest_into(files, &mut report);
        report
    }

    fn ingest_into(&self, files: &[DecompressedFile], report: &mut RunReport) {
        let opts = &self.options.ingestion;

        for (kind, sample) in smallest_file_per_kind(files) {
            tracing::info!(table = %kind, sample = %sample.display(), "inferring schema");
            match self.inferencer.infer_from_file(&kind, &sample) {
                Ok(schema) => {
                    report.schemas.insert(kind, schema);
                }
                Err(e) => {
                    opts.report_failure(&IngestionContext::new(&sample, Some(kind.as_str())), &e);
                    report.failed_tables.insert(kind, e.to_string());
                }
            }
        }

        for (kind, schema) in &report.schemas {
            provision_table(self.store, kind, schema, opts);
        }

        for file in files {
            let kind = file.table_kind();
            let Some(schema) = report.schemas.get(kind) else {
                tracing::warn!(table = kind, path = %file.path.display(), "no schema for table, skipping file");
                report.skipped_files.push(file.path.clone());
                continue;
            };

            tracing::info!(table = kind, path = %file.path.display(), "streaming file");
            if let Err(e) = ingest_file(&file.path, kind, schema, self.store, opts, &mut report.stats) {
                report.failed_files.push(FileFailure {
                    path: file.path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    fn record_archive_failure(&self, report: &mut RunReport, path: PathBuf, error: IngestionError) {
        self.options
            .ingestion
            .report_failure(&IngestionContext::new(&path, None), &error);
        report.failed_archives.push(FileFailure {
            path,
            reason: error.to_string(),
        });
    }
}
