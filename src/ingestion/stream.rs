//! Streaming a decompressed NDJSON file into its table.
//!
//! Lines are read, decoded, coerced and inserted strictly one at a time. A bad line or a failed
//! insert is counted and reported, then the loop moves on; only failing to read the file itself
//! stops it early.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};

use crate::error::{IngestionError, IngestionResult};
use crate::store::TableStore;
use crate::types::Schema;

use super::coercion::{CoercionOptions, coerce_record};
use super::inference::trim_line_ending;
use super::observability::{IngestionContext, IngestionObserver, IngestionSeverity};
use super::stats::IngestionStats;

/// Options controlling per-file ingestion and failure reporting.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct IngestionOptions {
    /// How raw values are narrowed to column values.
    pub coercion: CoercionOptions,
    /// Skip whitespace-only lines instead of counting them as parse failures.
    pub skip_blank_lines: bool,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for IngestionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionOptions")
            .field("coercion", &self.coercion)
            .field("skip_blank_lines", &self.skip_blank_lines)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            coercion: CoercionOptions::default(),
            skip_blank_lines: false,
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }
}

impl IngestionOptions {
    /// Hand a failure to the observer, alerting when it meets the threshold.
    pub fn report_failure(&self, ctx: &IngestionContext, error: &IngestionError) {
        if let Some(obs) = self.observer.as_ref() {
            let sev = IngestionSeverity::for_error(error);
            obs.on_failure(ctx, sev, error);
            if sev >= self.alert_at_or_above {
                obs.on_alert(ctx, sev, error);
            }
        }
    }

    pub(crate) fn report_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        if let Some(obs) = self.observer.as_ref() {
            obs.on_success(ctx, stats);
        }
    }
}

/// Stream every line of `path` into `table`.
///
/// Counters for this file are merged into `stats` even when reading stops early, so run totals
/// always reflect the lines that were actually processed.
///
/// Only lines that are not valid JSON count as parse failures. A line holding JSON `null` is
/// counted as parsed and skipped without a write. Any other non-object value (a number, string
/// or array) is inserted as a row whose columns are all NULL. Lines are decoded as raw bytes, so
/// a line containing invalid UTF-8 is a parse failure rather than being decoded lossily.
///
/// Returns `Ok(())` at end-of-file however many lines failed; an `Err` means the file could not
/// be opened or read.
///
/// # Examples
///
/// ```no_run
/// use archive_ingest::ingestion::{ingest_file, IngestionOptions, IngestionStats};
/// use archive_ingest::store::{provision_table, SqliteStore};
/// use archive_ingest::types::{DataType, Field, Schema};
///
/// # fn main() -> Result<(), archive_ingest::IngestionError> {
/// let store = SqliteStore::open("reddit.db")?;
/// let schema = Schema::new(vec![
///     Field::new("id", DataType::Integer),
///     Field::new("body", DataType::Text),
/// ]);
/// let opts = IngestionOptions::default();
/// provision_table(&store, "comments", &schema, &opts);
///
/// let mut stats = IngestionStats::default();
/// ingest_file("decompressed/rust_comments.json", "comments", &schema, &store, &opts, &mut stats)?;
/// println!("{stats}");
/// # Ok(())
/// # }
/// ```
pub fn ingest_file<S: TableStore + ?Sized>(
    path: impl AsRef<Path>,
    table: &str,
    schema: &Schema,
    store: &S,
    options: &IngestionOptions,
    stats: &mut IngestionStats,
) -> IngestionResult<()> {
    let path = path.as_ref();
    let ctx = IngestionContext::new(path, Some(table));

    let mut file_stats = IngestionStats::default();
    let result = drain_file(path, table, schema, store, options, &ctx, &mut file_stats);
    stats.merge(&file_stats);

    match &result {
        Ok(()) => options.report_success(&ctx, file_stats),
        Err(e) => options.report_failure(&ctx, e),
    }
    result
}

fn drain_file<S: TableStore + ?Sized>(
    path: &Path,
    table: &str,
    schema: &Schema,
    store: &S,
    options: &IngestionOptions,
    ctx: &IngestionContext,
    stats: &mut IngestionStats,
) -> IngestionResult<()> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut buf = Vec::new();
    let mut line_no: u64 = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;

        let line = trim_line_ending(&buf);
        if options.skip_blank_lines && line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let record = match serde_json::from_slice::<JsonValue>(line) {
            Ok(JsonValue::Object(record)) => record,
            // A bare `null` decodes but carries no row.
            Ok(JsonValue::Null) => {
                stats.record_parsed();
                continue;
            }
            // Scalars and arrays have no fields, so every column ends up NULL.
            Ok(_) => Map::new(),
            Err(e) => {
                stats.record_parse_failure();
                options.report_failure(
                    ctx,
                    &IngestionError::LineParse {
                        path: path.to_path_buf(),
                        line: line_no,
                        message: e.to_string(),
                    },
                );
                continue;
            }
        };
        stats.record_parsed();

        let row = coerce_record(schema, &record, &options.coercion);
        match store.insert_row(table, &row) {
            Ok(()) => stats.record_write(true),
            Err(e) => {
                stats.record_write(false);
                options.report_failure(
                    ctx,
                    &IngestionError::Write {
                        table: table.to_string(),
                        line: line_no,
                        message: e.to_string(),
                    },
                );
            }
        }
    }

    Ok(())
}
