//! Archive discovery and file naming.
//!
//! Archives are named `<group>_<tableKind>.<ext>`; the table kind selects the destination table
//! and schema, the group key only distinguishes files of the same kind.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use serde::Serialize;

use crate::error::{IngestionError, IngestionResult};

/// A discovered archive and the table it feeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveRef {
    pub file_name: String,
    pub table_kind: String,
    pub group_key: String,
}

impl ArchiveRef {
    /// Parse `<group>_<tableKind>.<ext...>`.
    ///
    /// The stem ends at the first `.` and is split at its last `_`, so group keys may themselves
    /// contain underscores (`ask_science_comments.zst` is group `ask_science`, kind `comments`).
    pub fn from_file_name(file_name: &str) -> IngestionResult<Self> {
        let invalid = |message: &str| IngestionError::InvalidArchiveName {
            name: file_name.to_string(),
            message: message.to_string(),
        };

        let stem = file_name.split('.').next().unwrap_or(file_name);
        let (group, kind) = stem
            .rsplit_once('_')
            .ok_or_else(|| invalid("expected <group>_<tableKind>"))?;
        if group.is_empty() {
            return Err(invalid("group key is empty"));
        }
        if kind.is_empty() {
            return Err(invalid("table kind is empty"));
        }

        Ok(Self {
            file_name: file_name.to_string(),
            table_kind: kind.to_string(),
            group_key: group.to_string(),
        })
    }

    pub fn from_path(path: &Path) -> IngestionResult<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| IngestionError::InvalidArchiveName {
                name: path.display().to_string(),
                message: "path has no utf-8 file name".to_string(),
            })?;
        Self::from_file_name(name)
    }

    /// File name of the decompressed output.
    pub fn decompressed_file_name(&self) -> String {
        format!("{}_{}.json", self.group_key, self.table_kind)
    }
}

/// A decompressed NDJSON file ready for ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecompressedFile {
    pub path: PathBuf,
    pub archive: ArchiveRef,
}

impl DecompressedFile {
    pub fn new(path: impl Into<PathBuf>, archive: ArchiveRef) -> Self {
        Self {
            path: path.into(),
            archive,
        }
    }

    /// Build from an already decompressed `<group>_<tableKind>.json` path.
    pub fn from_path(path: impl Into<PathBuf>) -> IngestionResult<Self> {
        let path = path.into();
        let archive = ArchiveRef::from_path(&path)?;
        Ok(Self { path, archive })
    }

    pub fn table_kind(&self) -> &str {
        &self.archive.table_kind
    }
}

/// List `*.<extension>` files directly inside `dir`, sorted by path.
pub fn discover_archives(dir: impl AsRef<Path>, extension: &str) -> IngestionResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let dir_str = dir.to_str().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("directory is not valid utf-8: {}", dir.display()),
        )
    })?;
    let pattern = format!(
        "{}/*.{}",
        Pattern::escape(dir_str.trim_end_matches('/')),
        Pattern::escape(extension)
    );

    let entries = glob::glob(&pattern)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(glob::GlobError::into_error)?;
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Pick the sample file for each table kind.
///
/// The smallest non-empty file of a kind wins (first one on ties). When every file of a kind is
/// empty or unreadable, its first file is returned so inference can report why.
pub fn smallest_file_per_kind(files: &[DecompressedFile]) -> BTreeMap<String, PathBuf> {
    struct Candidate<'a> {
        first: &'a Path,
        smallest: Option<(u64, &'a Path)>,
    }

    let mut by_kind: BTreeMap<&str, Candidate<'_>> = BTreeMap::new();
    for file in files {
        let entry = by_kind.entry(file.table_kind()).or_insert(Candidate {
            first: &file.path,
            smallest: None,
        });
        let Ok(size) = fs::metadata(&file.path).map(|m| m.len()) else {
            continue;
        };
        if size == 0 {
            continue;
        }
        if entry.smallest.is_none_or(|(best, _)| size < best) {
            entry.smallest = Some((size, &file.path));
        }
    }

    by_kind
        .into_iter()
        .map(|(kind, c)| {
            let path = c.smallest.map_or(c.first, |(_, p)| p);
            (kind.to_string(), path.to_path_buf())
        })
        .collect()
}
