//! Archive normalization and deterministic serialization.
//!
//! Source archives (as produced by code-hosting "download as zip" endpoints)
//! wrap every file in a single top-level directory such as
//! `Pack-Files-main/`. [`normalize`] strips that directory so paths are
//! stable across branch renames, and [`write_archive`] serializes a file set
//! with fixed entry order, timestamps and permissions so equal inputs always
//! produce byte-identical output.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::domain::{BuildError, Result};

/// Normalized source files keyed by root-stripped relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTree {
    root: String,
    files: BTreeMap<String, Vec<u8>>,
}

impl SourceTree {
    /// Top-level directory that was stripped, including the trailing `/`.
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn files(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn open(bytes: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>> {
    ZipArchive::new(Cursor::new(bytes)).map_err(|e| BuildError::MalformedArchive(e.to_string()))
}

/// The root is the first path component of the first directory entry.
fn detect_root(names: &[String]) -> Option<String> {
    names
        .iter()
        .find(|name| name.ends_with('/'))
        .and_then(|dir| dir.split('/').next())
        .filter(|first| !first.is_empty())
        .map(|first| format!("{first}/"))
}

fn is_safe_relative(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('/')
        && !path.contains('\\')
        && path.split('/').all(|segment| segment != ".." && segment != ".")
}

/// Re-root a zip archive to relative paths under its single top-level directory.
///
/// # Errors
///
/// - `MalformedArchive`: not a readable zip, or no directory entry to take
///   the root from
/// - `EmptyArchive`: no file entries remain under the root
///
/// Entries outside the root are skipped. Duplicate paths resolve last-write-wins.
pub fn normalize(bytes: &[u8]) -> Result<SourceTree> {
    let mut archive = open(bytes)?;

    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        names.push(archive.by_index_raw(i)?.name().to_string());
    }

    let root = detect_root(&names).ok_or_else(|| {
        BuildError::MalformedArchive("no top-level directory entry found".to_string())
    })?;

    // The zip central directory index keeps only the last entry for a
    // repeated name, so each relative path is seen at most once here.
    let mut files = BTreeMap::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let Some(relative) = entry.name().strip_prefix(root.as_str()).map(str::to_string) else {
            debug!(name = entry.name(), root = %root, "Skipping entry outside archive root");
            continue;
        };
        if !is_safe_relative(&relative) {
            warn!(name = entry.name(), "Skipping entry with unsafe path");
            continue;
        }

        let mut content = Vec::new();
        entry.read_to_end(&mut content)?;
        files.insert(relative, content);
    }

    if files.is_empty() {
        return Err(BuildError::EmptyArchive { root });
    }

    Ok(SourceTree { root, files })
}

/// Serialize files into a deflated zip in the order given.
///
/// Every entry gets the same timestamp (1980-01-01) and permissions, so the
/// output depends only on the paths, their order and their contents. Pass a
/// sorted iterator (e.g. a `BTreeMap`) for a canonical artifact.
pub fn write_archive<'a, I>(entries: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o644);

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (path, content) in entries {
        writer.start_file(path, options)?;
        writer.write_all(content)?;
    }
    Ok(writer.finish()?.into_inner())
}

/// Read every file entry of a flat zip (no root stripping).
pub fn read_archive(bytes: &[u8]) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut archive = open(bytes)?;
    let mut files = BTreeMap::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let mut content = Vec::new();
        entry.read_to_end(&mut content)?;
        files.insert(entry.name().to_string(), content);
    }
    Ok(files)
}
