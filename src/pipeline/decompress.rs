//! Parallel decompression of discovered archives.
//!
//! Decompression is the only concurrent phase of a run: every archive is handed to a rayon pool
//! and the caller blocks until all of them have finished.

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use crate::error::{IngestionError, IngestionResult};

use super::archive::{ArchiveRef, DecompressedFile};

/// Turns one compressed archive into a newline-delimited JSON file.
pub trait Decompressor: Send + Sync {
    fn decompress(&self, source: &Path, destination: &Path) -> IngestionResult<()>;
}

impl<F> Decompressor for F
where
    F: Fn(&Path, &Path) -> IngestionResult<()> + Send + Sync,
{
    fn decompress(&self, source: &Path, destination: &Path) -> IngestionResult<()> {
        self(source, destination)
    }
}

/// Runs an external decompression utility, `zstd` by default.
///
/// The command line is `<program> <args...> <source> -o <destination>`.
#[derive(Debug, Clone)]
pub struct CommandDecompressor {
    program: OsString,
    args: Vec<OsString>,
}

impl CommandDecompressor {
    pub fn new(program: impl Into<OsString>, args: impl IntoIterator<Item = impl Into<OsString>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `zstd -d -q -f --long=31`, using `program` as the zstd binary.
    pub fn zstd(program: impl Into<OsString>) -> Self {
        Self::new(program, ["-d", "-q", "-f", "--long=31"])
    }
}

impl Default for CommandDecompressor {
    fn default() -> Self {
        Self::zstd("zstd")
    }
}

impl Decompressor for CommandDecompressor {
    fn decompress(&self, source: &Path, destination: &Path) -> IngestionResult<()> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(source)
            .arg("-o")
            .arg(destination)
            .output()
            .map_err(|e| IngestionError::Decompress {
                path: source.to_path_buf(),
                message: format!("failed to run {}: {e}", self.program.to_string_lossy()),
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = match stderr.trim() {
            "" => format!("{} exited with {}", self.program.to_string_lossy(), output.status),
            msg => msg.to_string(),
        };
        Err(IngestionError::Decompress {
            path: source.to_path_buf(),
            message,
        })
    }
}

/// Decompress every archive from `source_dir` into `output_dir` concurrently.
///
/// Results are returned in the order of `archives`. Individual failures do not stop the other
/// archives; only failing to build the thread pool is an `Err`.
pub fn decompress_all(
    archives: &[ArchiveRef],
    source_dir: &Path,
    output_dir: &Path,
    decompressor: &dyn Decompressor,
    num_threads: Option<usize>,
) -> IngestionResult<Vec<(ArchiveRef, IngestionResult<DecompressedFile>)>> {
    let n_threads = num_threads
        .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
        .max(1);
    let pool = ThreadPoolBuilder::new().num_threads(n_threads).build()?;

    let results = pool.install(|| {
        archives
            .par_iter()
            .map(|archive| {
                let source = source_dir.join(&archive.file_name);
                let destination = output_dir.join(archive.decompressed_file_name());
                tracing::debug!(source = %source.display(), destination = %destination.display(), "decompressing");
                let result = decompressor
                    .decompress(&source, &destination)
                    .map(|()| DecompressedFile::new(destination, archive.clone()));
                (archive.clone(), result)
            })
            .collect()
    });
    Ok(results)
}
