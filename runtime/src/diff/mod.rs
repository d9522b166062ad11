//! Tree comparison.
//!
//! The build pipeline only depends on the [`Differ`] capability. [`FsDiffer`]
//! is the stock implementation: it snapshots both trees and merges the two
//! sorted path sets, comparing entries present on both sides.

mod snapshot;

use std::cmp::Ordering;

use acibuild_core::change::{ChangeKind, ChangeRecord};
use acibuild_core::config::CompareMode;
use acibuild_core::error::Result;
use acibuild_core::tree::{Base, Target, Tree};

pub use snapshot::{sha256_file, EntryKind, EntrySnapshot, TreeSnapshot};

/// Compares two rooted trees and classifies every path found in either.
///
/// Implementations must report each path exactly once, must not report the
/// tree roots themselves, and must fail the whole comparison on any I/O error.
pub trait Differ {
    fn diff(&self, base: &Tree<Base>, target: &Tree<Target>) -> Result<Vec<ChangeRecord>>;
}

/// Snapshot-and-merge differ over the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDiffer {
    mode: CompareMode,
}

impl FsDiffer {
    pub fn new(mode: CompareMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> CompareMode {
        self.mode
    }
}

impl Differ for FsDiffer {
    fn diff(&self, base: &Tree<Base>, target: &Tree<Target>) -> Result<Vec<ChangeRecord>> {
        let before = TreeSnapshot::capture(base, self.mode)?;
        let after = TreeSnapshot::capture(target, self.mode)?;

        tracing::debug!(
            base_rootfs = %base.root().display(),
            rootfs = %target.root().display(),
            base_entries = before.len(),
            target_entries = after.len(),
            mode = %self.mode,
            "Captured tree snapshots"
        );

        Ok(merge(&before, &after, self.mode))
    }
}

/// Merge two sorted snapshots into change records, in path order.
fn merge(before: &TreeSnapshot, after: &TreeSnapshot, mode: CompareMode) -> Vec<ChangeRecord> {
    let mut changes = Vec::with_capacity(before.len().max(after.len()));
    let mut old = before.entries.iter().peekable();
    let mut new = after.entries.iter().peekable();

    loop {
        let order = match (old.peek(), new.peek()) {
            (None, None) => break,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some((a, _)), Some((b, _))) => a.cmp(b),
        };

        match order {
            Ordering::Less => {
                if let Some((path, _)) = old.next() {
                    changes.push(ChangeRecord::new(path.clone(), ChangeKind::Deleted));
                }
            }
            Ordering::Greater => {
                if let Some((path, _)) = new.next() {
                    changes.push(ChangeRecord::new(path.clone(), ChangeKind::Added));
                }
            }
            Ordering::Equal => {
                if let (Some((path, a)), Some((_, b))) = (old.next(), new.next()) {
                    let kind = if a.differs(b, mode) {
                        ChangeKind::Modified
                    } else {
                        ChangeKind::Unchanged
                    };
                    changes.push(ChangeRecord::new(path.clone(), kind));
                }
            }
        }
    }

    changes
}
