//! Streams target tree entries into an image writer.

use acibuild_core::error::{BuildError, Result, WalkPhase};
use acibuild_core::tree::{Target, Tree, TreePath};

use crate::plan::InclusionSet;
use crate::walk::walk_tree;
use crate::writer::{ImageEntry, ImageWriter};

/// Which walked entries are written.
#[derive(Debug, Clone, Copy)]
pub enum Selection<'a> {
    /// Every entry, the tree root included.
    All,
    /// Only members of the inclusion set.
    Only(&'a InclusionSet),
}

impl Selection<'_> {
    fn includes(&self, path: &TreePath<Target>) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(set) => set.contains(path),
        }
    }
}

/// Outcome of an assembly walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyReport {
    pub written: usize,
    pub skipped: usize,
    /// Inclusion members that were not found during the walk.
    pub missing: usize,
}

/// Walk `target` in traversal order and write each selected entry under
/// `prefix/` through `writer`, then close the writer.
///
/// The walk always descends into unselected directories, since selected
/// descendants may live below them. Any walk or write failure aborts before
/// `close`; the writer is dropped and its output must be discarded.
pub fn assemble<I: ImageWriter>(
    target: &Tree<Target>,
    prefix: &str,
    selection: Selection<'_>,
    mut writer: I,
) -> Result<(I::Output, AssemblyReport)> {
    let mut report = AssemblyReport::default();

    walk_tree(
        target,
        |path, entry| {
            if !selection.includes(&path) {
                report.skipped += 1;
                return Ok(());
            }

            let metadata = entry.metadata().map_err(|e| BuildError::Walk {
                phase: WalkPhase::Assembly,
                path: entry.path().to_path_buf(),
                source: e.into(),
            })?;

            writer.add_entry(&ImageEntry {
                archive_path: path.archive_path(prefix),
                source: entry.path(),
                metadata: &metadata,
            })?;
            report.written += 1;
            Ok(())
        },
        |path, source| BuildError::Walk {
            phase: WalkPhase::Assembly,
            path,
            source,
        },
    )?;

    if let Selection::Only(set) = selection {
        report.missing = set.len().saturating_sub(report.written);
        if report.missing > 0 {
            tracing::warn!(
                rootfs = %target.root().display(),
                missing = report.missing,
                "Changed entries disappeared from the target tree before assembly"
            );
        }
    }

    let output = writer.close()?;
    Ok((output, report))
}
