//! Fingerprinted file state of one build.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::digest::FileDigest;

/// One fingerprinted file: canonical root-stripped path plus content digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: String,
    pub digest: FileDigest,
}

/// Mapping from canonical path to content digest.
///
/// Serializes as a flat JSON object of `path -> hex digest`, which is the
/// format published to (and read back from) the snapshot store. Keys are kept
/// sorted so the published JSON is stable across builds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(BTreeMap<String, FileDigest>);

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `digest` for `path`, replacing any previous entry.
    pub fn insert(&mut self, path: impl Into<String>, digest: FileDigest) {
        self.0.insert(path.into(), digest);
    }

    pub fn get(&self, path: &str) -> Option<&FileDigest> {
        self.0.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Paths in lexicographic order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&String, &FileDigest)> {
        self.0.iter()
    }

    /// Pretty-printed JSON, as published.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl FromIterator<FileRecord> for Snapshot {
    fn from_iter<I: IntoIterator<Item = FileRecord>>(iter: I) -> Self {
        Snapshot(iter.into_iter().map(|r| (r.path, r.digest)).collect())
    }
}

impl FromIterator<(String, FileDigest)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, FileDigest)>>(iter: I) -> Self {
        Snapshot(iter.into_iter().collect())
    }
}
