//! Snapshot diff engine.
//!
//! [`diff_snapshots`] partitions the paths of two snapshots into added,
//! removed and modified sets. Unchanged paths appear in none of them, and no
//! path appears in more than one.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::Snapshot;

/// Kind of change a path underwent between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Removed => "removed",
            ChangeKind::Modified => "modified",
        }
    }

    /// Section label used in changelogs.
    pub fn label(&self) -> &'static str {
        match self {
            ChangeKind::Added => "Added",
            ChangeKind::Removed => "Removed",
            ChangeKind::Modified => "Modified",
        }
    }

    pub const ALL: [ChangeKind; 3] = [ChangeKind::Added, ChangeKind::Removed, ChangeKind::Modified];
}

/// Added / removed / modified partition between two snapshots.
///
/// Sets are ordered, so every listing derived from a change set (changelog,
/// notifications) is lexicographic by path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
    pub modified: BTreeSet<String>,
}

impl ChangeSet {
    /// Total change magnitude: `|added| + |removed| + |modified|`.
    pub fn magnitude(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitude() == 0
    }

    pub fn paths(&self, kind: ChangeKind) -> &BTreeSet<String> {
        match kind {
            ChangeKind::Added => &self.added,
            ChangeKind::Removed => &self.removed,
            ChangeKind::Modified => &self.modified,
        }
    }

    /// How `path` changed, or `None` if it is unchanged or unknown.
    pub fn kind_of(&self, path: &str) -> Option<ChangeKind> {
        ChangeKind::ALL
            .into_iter()
            .find(|kind| self.paths(*kind).contains(path))
    }
}

/// Compare `previous` against `current`.
///
/// An empty `previous` (cold start) yields every current path as added.
pub fn diff_snapshots(previous: &Snapshot, current: &Snapshot) -> ChangeSet {
    let mut changes = ChangeSet::default();

    for (path, digest) in current.iter() {
        match previous.get(path) {
            None => {
                changes.added.insert(path.clone());
            }
            Some(prev) if prev != digest => {
                changes.modified.insert(path.clone());
            }
            Some(_) => {}
        }
    }

    changes.removed = previous
        .paths()
        .filter(|path| !current.contains(path))
        .map(str::to_string)
        .collect();

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FileDigest;

    fn snap(entries: &[(&str, &str)]) -> Snapshot {
        entries
            .iter()
            .map(|(p, c)| (p.to_string(), FileDigest::compute(c.as_bytes())))
            .collect()
    }

    fn set(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn identical_snapshots_have_no_changes() {
        let a = snap(&[("a", "1"), ("b", "2")]);
        let changes = diff_snapshots(&a, &a);
        assert!(changes.is_empty());
        assert_eq!(changes.magnitude(), 0);
    }

    #[test]
    fn cold_start_marks_everything_added() {
        let current = snap(&[("a", "1"), ("b", "2")]);
        let changes = diff_snapshots(&Snapshot::new(), &current);
        assert_eq!(changes.added, set(&["a", "b"]));
        assert!(changes.removed.is_empty());
        assert!(changes.modified.is_empty());
    }

    #[test]
    fn mixed_changes() {
        let previous = snap(&[("a", "1"), ("b", "2"), ("c", "3")]);
        let current = snap(&[("a", "1"), ("b", "9"), ("d", "4")]);
        let changes = diff_snapshots(&previous, &current);
        assert_eq!(changes.added, set(&["d"]));
        assert_eq!(changes.removed, set(&["c"]));
        assert_eq!(changes.modified, set(&["b"]));
        assert_eq!(changes.magnitude(), 3);
    }

    #[test]
    fn everything_removed() {
        let previous = snap(&[("a", "1")]);
        let changes = diff_snapshots(&previous, &Snapshot::new());
        assert_eq!(changes.removed, set(&["a"]));
        assert_eq!(changes.kind_of("a"), Some(ChangeKind::Removed));
    }

    #[test]
    fn kind_of_unchanged_is_none() {
        let previous = snap(&[("a", "1"), ("b", "2")]);
        let current = snap(&[("a", "1"), ("b", "3")]);
        let changes = diff_snapshots(&previous, &current);
        assert_eq!(changes.kind_of("a"), None);
        assert_eq!(changes.kind_of("b"), Some(ChangeKind::Modified));
    }
}
