//! Selection planning: which target entries go into the archive, and whether
//! the manifest needs a path whitelist.

use std::collections::BTreeSet;

use acibuild_core::change::{ChangeCounts, ChangeKind, ChangeRecord};
use acibuild_core::error::{BuildError, Result, WalkPhase};
use acibuild_core::tree::{Target, Tree, TreePath};

use crate::walk::walk_tree;

/// Target paths that must be written into the output archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InclusionSet {
    paths: BTreeSet<TreePath<Target>>,
}

impl InclusionSet {
    pub fn contains(&self, path: &TreePath<Target>) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TreePath<Target>> {
        self.paths.iter()
    }
}

/// Outcome of planning over a change list.
#[derive(Debug, Clone, Default)]
pub struct SelectionPlan {
    pub inclusion: InclusionSet,
    /// True iff at least one record is [`ChangeKind::Deleted`].
    pub has_deleted: bool,
    pub counts: ChangeCounts,
}

/// Derive the inclusion set and the deletion flag from `records`.
///
/// Added and modified paths are taken from `target`; unchanged and deleted
/// records contribute nothing to the set.
pub fn plan(target: &Tree<Target>, records: &[ChangeRecord]) -> SelectionPlan {
    let mut inclusion = InclusionSet::default();
    let mut has_deleted = false;

    for record in records {
        if record.kind.is_included() {
            inclusion.paths.insert(target.join(&record.path));
        }
        if !has_deleted && record.kind == ChangeKind::Deleted {
            has_deleted = true;
        }
    }

    SelectionPlan {
        inclusion,
        has_deleted,
        counts: ChangeCounts::tally(records),
    }
}

/// Every path allowed to exist in the composed filesystem, `/`-rooted, in
/// traversal order. Empty means no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathWhitelist(Vec<String>);

impl PathWhitelist {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// List every entry of `target`, the root included as `/`.
///
/// Any traversal failure aborts; a partial whitelist is never returned.
pub fn build_whitelist(target: &Tree<Target>) -> Result<PathWhitelist> {
    let mut paths = Vec::new();
    walk_tree(
        target,
        |path, _| {
            paths.push(path.rel().to_rooted_string());
            Ok(())
        },
        |path, source| BuildError::Walk {
            phase: WalkPhase::Whitelist,
            path,
            source,
        },
    )?;

    tracing::debug!(
        rootfs = %target.root().display(),
        entries = paths.len(),
        "Built path whitelist"
    );

    Ok(PathWhitelist(paths))
}

#[cfg(test)]
mod tests {
    use super::*;
    use acibuild_core::tree::RelPath;
    use std::fs;
    use tempfile::TempDir;

    fn record(path: &str, kind: ChangeKind) -> ChangeRecord {
        ChangeRecord::new(RelPath::new(path).unwrap(), kind)
    }

    #[test]
    fn test_plan_includes_added_and_modified_only() {
        let target: Tree<Target> = Tree::new("/img/rootfs");
        let records = vec![
            record("a.txt", ChangeKind::Unchanged),
            record("b.txt", ChangeKind::Modified),
            record("c.txt", ChangeKind::Added),
            record("d.txt", ChangeKind::Deleted),
        ];

        let plan = plan(&target, &records);
        let included: Vec<String> = plan
            .inclusion
            .iter()
            .map(|p| p.rel().to_rooted_string())
            .collect();
        assert_eq!(included, vec!["/b.txt", "/c.txt"]);
        assert!(plan.has_deleted);
        assert_eq!(plan.counts.deleted, 1);
    }

    #[test]
    fn test_plan_without_deletions() {
        let target: Tree<Target> = Tree::new("/img/rootfs");
        let records = vec![
            record("a.txt", ChangeKind::Unchanged),
            record("c.txt", ChangeKind::Added),
        ];
        let plan = plan(&target, &records);
        assert!(!plan.has_deleted);
        assert!(plan
            .inclusion
            .contains(&target.join(&RelPath::new("c.txt").unwrap())));
        assert!(!plan
            .inclusion
            .contains(&target.join(&RelPath::new("a.txt").unwrap())));
    }

    #[test]
    fn test_plan_empty_records() {
        let target: Tree<Target> = Tree::new("/img/rootfs");
        let plan = plan(&target, &[]);
        assert!(plan.inclusion.is_empty());
        assert!(!plan.has_deleted);
    }

    #[test]
    fn test_plan_many_deletions_single_flag() {
        let target: Tree<Target> = Tree::new("/img/rootfs");
        let records = vec![
            record("x", ChangeKind::Deleted),
            record("y", ChangeKind::Deleted),
            record("z", ChangeKind::Added),
        ];
        let plan = plan(&target, &records);
        assert!(plan.has_deleted);
        assert_eq!(plan.inclusion.len(), 1);
    }

    #[test]
    fn test_build_whitelist_lists_whole_tree() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("etc")).unwrap();
        fs::write(tmp.path().join("etc").join("passwd"), "root").unwrap();
        fs::write(tmp.path().join("a.txt"), "1").unwrap();

        let whitelist = build_whitelist(&Tree::new(tmp.path())).unwrap();
        assert_eq!(
            whitelist.as_slice(),
            &["/", "/a.txt", "/etc", "/etc/passwd"]
        );
    }

    #[test]
    fn test_build_whitelist_missing_tree() {
        let tmp = TempDir::new().unwrap();
        let err = build_whitelist(&Tree::new(tmp.path().join("missing"))).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Walk {
                phase: WalkPhase::Whitelist,
                ..
            }
        ));
    }
}
