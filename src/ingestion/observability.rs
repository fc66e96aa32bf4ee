use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::IngestionError;

use super::stats::IngestionStats;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IngestionSeverity {
    /// Informational event.
    Info,
    /// Recoverable, counted failure of a single line or archive name.
    Warning,
    /// A row, table or store operation failed; the run continues.
    Error,
    /// A whole table kind, archive or file could not be processed.
    Critical,
}

impl IngestionSeverity {
    /// Severity assigned to an error when it is reported.
    pub fn for_error(e: &IngestionError) -> Self {
        match e {
            IngestionError::Io(_) => Self::Critical,
            IngestionError::Sqlite(_) => Self::Error,
            IngestionError::SampleParse { .. } => Self::Critical,
            IngestionError::LineParse { .. } => Self::Warning,
            IngestionError::TableCreation { .. } => Self::Error,
            IngestionError::Write { .. } => Self::Error,
            IngestionError::InvalidArchiveName { .. } => Self::Warning,
            IngestionError::Decompress { .. } => Self::Critical,
            IngestionError::ThreadPool(_) => Self::Critical,
        }
    }
}

/// What was being processed when an event fired.
#[derive(Debug, Clone)]
pub struct IngestionContext {
    /// Input file (sample, decompressed file or archive).
    pub path: PathBuf,
    /// Destination table / table kind, when known.
    pub table: Option<String>,
}

impl IngestionContext {
    pub fn new(path: impl Into<PathBuf>, table: Option<&str>) -> Self {
        Self {
            path: path.into(),
            table: table.map(str::to_string),
        }
    }

    fn table_label(&self) -> &str {
        self.table.as_deref().unwrap_or("-")
    }
}

/// Observer interface for ingestion outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait IngestionObserver: Send + Sync {
    /// Called when a file has been streamed to end-of-file.
    fn on_success(&self, _ctx: &IngestionContext, _stats: IngestionStats) {}

    /// Called for every reported failure, including per-line ones.
    fn on_failure(&self, _ctx: &IngestionContext, _severity: IngestionSeverity, _error: &IngestionError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl IngestionObserver for CompositeObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Forwards ingestion events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl IngestionObserver for TracingObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        tracing::info!(
            table = ctx.table_label(),
            path = %ctx.path.display(),
            lines = stats.lines_parsed,
            parse_errors = stats.parse_failures,
            rows = stats.rows_attempted,
            write_errors = stats.write_failures,
            "file ingested"
        );
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        let table = ctx.table_label();
        let path = ctx.path.display();
        match severity {
            IngestionSeverity::Info => tracing::info!(table, path = %path, %error, "ingestion event"),
            IngestionSeverity::Warning => tracing::warn!(table, path = %path, %error, "ingestion failure"),
            IngestionSeverity::Error | IngestionSeverity::Critical => {
                tracing::error!(table, path = %path, ?severity, %error, "ingestion failure")
            }
        }
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        tracing::error!(
            alert = true,
            table = ctx.table_label(),
            path = %ctx.path.display(),
            ?severity,
            %error,
            "ingestion alert"
        );
    }
}

/// Appends ingestion events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl IngestionObserver for FileObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.append_line(&format!(
            "{} ok table={} path={} lines={} parse_errors={} rows={} write_errors={}",
            unix_ts(),
            ctx.table_label(),
            ctx.path.display(),
            stats.lines_parsed,
            stats.parse_failures,
            stats.rows_attempted,
            stats.write_failures
        ));
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.append_line(&format!(
            "{} fail severity={:?} table={} path={} err={}",
            unix_ts(),
            severity,
            ctx.table_label(),
            ctx.path.display(),
            error
        ));
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} table={} path={} err={}",
            unix_ts(),
            severity,
            ctx.table_label(),
            ctx.path.display(),
            error
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
