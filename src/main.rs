use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use archive_ingest::ingestion::{
    CoercionOptions, CompositeObserver, FileObserver, IngestionObserver, IngestionOptions, IngestionSeverity,
    TextEncoding, TracingObserver,
};
use archive_ingest::pipeline::{CommandDecompressor, Pipeline, PipelineOptions, RunReport};
use archive_ingest::store::SqliteStore;

/// Load `<group>_<tableKind>.zst` archives of NDJSON records into SQLite tables.
#[derive(Debug, Parser)]
#[command(name = "archive-ingest", version, about)]
struct Cli {
    /// Directory containing the archives.
    #[arg(long, env = "ARCHIVE_INGEST_DIR", default_value = ".")]
    dir: PathBuf,

    /// SQLite database file. Defaults to `<dir>/reddit.db`.
    #[arg(long, env = "ARCHIVE_INGEST_DATABASE")]
    database: Option<PathBuf>,

    /// Output directory for decompressed files. Defaults to `<dir>/decompressed`.
    #[arg(long)]
    decompressed_dir: Option<PathBuf>,

    /// Archive extension to pick up.
    #[arg(long, default_value = "zst")]
    extension: String,

    /// zstd executable used for decompression.
    #[arg(long, default_value = "zstd")]
    zstd: PathBuf,

    /// Decompression worker threads (defaults to available parallelism).
    #[arg(long)]
    threads: Option<usize>,

    /// Ignore whitespace-only lines instead of counting them as parse errors.
    #[arg(long)]
    skip_blank_lines: bool,

    /// Store JSON strings verbatim and JSON null as NULL.
    #[arg(long)]
    native_strings: bool,

    /// Also append ingestion events to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print the final report as JSON.
    #[arg(long)]
    json: bool,

    /// Exit with status 2 if any line, row, table, archive or file failed.
    #[arg(long)]
    strict: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "ingestion aborted");
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> archive_ingest::IngestionResult<ExitCode> {
    let mut observers: Vec<Arc<dyn IngestionObserver>> = vec![Arc::new(TracingObserver)];
    if let Some(path) = &cli.log_file {
        observers.push(Arc::new(FileObserver::new(path)));
    }
    let options = pipeline_options(cli, Arc::new(CompositeObserver::new(observers)));

    let database = cli.database.clone().unwrap_or_else(|| cli.dir.join("reddit.db"));
    let store = SqliteStore::open(&database)?;
    tracing::info!(database = %database.display(), "opened table store");

    let decompressor = CommandDecompressor::zstd(cli.zstd.as_os_str());
    let report = Pipeline::new(&store, options).run_archives(&cli.dir, &decompressor)?;

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{s}"),
            Err(e) => tracing::error!(error = %e, "failed to serialize report"),
        }
    } else {
        print!("{report}");
    }

    Ok(ExitCode::from(exit_status(cli.strict, &report)))
}

fn pipeline_options(cli: &Cli, observer: Arc<dyn IngestionObserver>) -> PipelineOptions {
    PipelineOptions {
        archive_extension: cli.extension.clone(),
        decompressed_dir: cli.decompressed_dir.clone(),
        num_threads: cli.threads,
        ingestion: IngestionOptions {
            coercion: CoercionOptions {
                text_encoding: if cli.native_strings {
                    TextEncoding::Native
                } else {
                    TextEncoding::Json
                },
            },
            skip_blank_lines: cli.skip_blank_lines,
            observer: Some(observer),
            alert_at_or_above: IngestionSeverity::Critical,
        },
    }
}

/// 0 for a completed run, 2 when `--strict` is set and anything failed.
fn exit_status(strict: bool, report: &RunReport) -> u8 {
    if strict && report.has_failures() { 2 } else { 0 }
}
