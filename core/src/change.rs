//! Change records produced by comparing a base tree with a target tree.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tree::RelPath;

/// Classification of a path between the base and target trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Present only in the target tree.
    Added,
    /// Present in both trees with differing content or metadata.
    Modified,
    /// Present only in the base tree.
    Deleted,
    /// Present in both trees and identical.
    Unchanged,
}

impl ChangeKind {
    /// Whether the target's copy of this path belongs in the output archive.
    pub fn is_included(self) -> bool {
        matches!(self, ChangeKind::Added | ChangeKind::Modified)
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Added => write!(f, "A"),
            ChangeKind::Modified => write!(f, "M"),
            ChangeKind::Deleted => write!(f, "D"),
            ChangeKind::Unchanged => write!(f, "U"),
        }
    }
}

/// One classified path. The path is relative, valid in whichever tree(s)
/// the kind says it exists in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub path: RelPath,
    pub kind: ChangeKind,
}

impl ChangeRecord {
    pub fn new(path: RelPath, kind: ChangeKind) -> Self {
        Self { path, kind }
    }
}

/// Per-kind tally over a set of change records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeCounts {
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

impl ChangeCounts {
    pub fn tally<'a>(records: impl IntoIterator<Item = &'a ChangeRecord>) -> Self {
        let mut counts = Self::default();
        for record in records {
            match record.kind {
                ChangeKind::Added => counts.added += 1,
                ChangeKind::Modified => counts.modified += 1,
                ChangeKind::Deleted => counts.deleted += 1,
                ChangeKind::Unchanged => counts.unchanged += 1,
            }
        }
        counts
    }
}
