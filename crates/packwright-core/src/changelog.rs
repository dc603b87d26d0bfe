//! Changelog rendering.
//!
//! Block layout:
//!
//! ```text
//! ====== VERSION 1-4-0-2aae6c ======
//!
//! Added:
//! - assets/new.png
//!
//! Modified:
//! - pack.mcmeta
//! ```
//!
//! History is newest-first: each build prepends its block, separated from
//! the previous history by a blank line.

use serde::{Deserialize, Serialize};

use crate::diff::{ChangeKind, ChangeSet};
use crate::domain::VersionCode;

/// One build's changelog entry with lexicographically ordered path lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    pub version: VersionCode,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
}

impl ChangelogEntry {
    pub fn new(version: VersionCode, changes: &ChangeSet) -> Self {
        Self {
            version,
            added: changes.added.iter().cloned().collect(),
            removed: changes.removed.iter().cloned().collect(),
            modified: changes.modified.iter().cloned().collect(),
        }
    }

    fn section(&self, kind: ChangeKind) -> &[String] {
        match kind {
            ChangeKind::Added => &self.added,
            ChangeKind::Removed => &self.removed,
            ChangeKind::Modified => &self.modified,
        }
    }

    /// Render the block. Never empty: the header is always present.
    pub fn render(&self) -> String {
        let mut parts = vec![format!("====== VERSION {} ======", self.version)];
        for kind in ChangeKind::ALL {
            let paths = self.section(kind);
            if paths.is_empty() {
                continue;
            }
            let bullets: Vec<String> = paths.iter().map(|p| format!("- {p}")).collect();
            parts.push(format!("{}:\n{}", kind.label(), bullets.join("\n")));
        }
        parts.join("\n\n")
    }
}

/// Render the changelog block for one build.
pub fn render(version: &VersionCode, changes: &ChangeSet) -> String {
    ChangelogEntry::new(version.clone(), changes).render()
}

/// Prepend `block` to `history`, separated by a blank line.
///
/// A blank history yields the block alone.
pub fn prepend(block: &str, history: &str) -> String {
    if history.trim().is_empty() {
        block.to_string()
    } else {
        format!("{block}\n\n{history}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn version(s: &str) -> VersionCode {
        s.parse().unwrap()
    }

    fn set(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn empty_change_set_renders_header_only() {
        let block = render(&version("0-0-2-abcdef"), &ChangeSet::default());
        assert_eq!(block, "====== VERSION 0-0-2-abcdef ======");
    }

    #[test]
    fn sections_in_fixed_order_with_bullets() {
        let changes = ChangeSet {
            added: set(&["d", "a"]),
            removed: set(&["c"]),
            modified: set(&["b"]),
        };
        let block = render(&version("0-0-1-abcdef"), &changes);
        assert_eq!(
            block,
            "====== VERSION 0-0-1-abcdef ======\n\n\
             Added:\n- a\n- d\n\n\
             Removed:\n- c\n\n\
             Modified:\n- b"
        );
    }

    #[test]
    fn empty_sections_are_omitted() {
        let changes = ChangeSet {
            modified: set(&["pack.png"]),
            ..ChangeSet::default()
        };
        let block = render(&version("1-0-1-abcdef"), &changes);
        assert!(!block.contains("Added:"));
        assert!(!block.contains("Removed:"));
        assert!(block.contains("Modified:\n- pack.png"));
    }

    #[test]
    fn prepend_to_empty_history() {
        assert_eq!(prepend("block", ""), "block");
        assert_eq!(prepend("block", "  \n"), "block");
    }

    #[test]
    fn prepend_keeps_newest_first() {
        let history = prepend("====== VERSION 0-0-1-aaaaaa ======", "");
        let history = prepend("====== VERSION 0-0-2-bbbbbb ======", &history);
        assert_eq!(
            history,
            "====== VERSION 0-0-2-bbbbbb ======\n\n====== VERSION 0-0-1-aaaaaa ======"
        );
    }
}
