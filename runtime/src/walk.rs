//! Deterministic tree traversal shared by every pass over a rootfs.

use std::io;
use std::path::{Path, PathBuf};

use acibuild_core::error::{BuildError, Result};
use acibuild_core::tree::{RelPath, Tree, TreePath, TreeRole};
use walkdir::{DirEntry, WalkDir};

/// Visit every entry under `tree` (the root included), depth-first with
/// siblings sorted by file name. Symlinks are reported, never followed.
///
/// `on_error` turns a traversal failure into the caller's error flavor; a
/// failing `visit` aborts the walk with its own error.
pub(crate) fn walk_tree<R, F, E>(tree: &Tree<R>, mut visit: F, on_error: E) -> Result<()>
where
    R: TreeRole,
    F: FnMut(TreePath<R>, &DirEntry) -> Result<()>,
    E: Fn(PathBuf, io::Error) -> BuildError,
{
    for entry in WalkDir::new(tree.root())
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| tree.root().to_path_buf());
            on_error(path, io::Error::from(e))
        })?;

        let rel = entry
            .path()
            .strip_prefix(tree.root())
            .map_err(|_| BuildError::InvalidPath {
                path: entry.path().to_path_buf(),
                reason: format!("walked outside {} tree {}", tree.role(), tree.root().display()),
            })?;
        let path = tree.join(&RelPath::new(rel)?);

        visit(path, &entry)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use acibuild_core::{Target, WalkPhase};
    use std::fs;
    use tempfile::TempDir;

    fn collect(tree: &Tree<Target>) -> Result<Vec<String>> {
        let mut seen = Vec::new();
        walk_tree(
            tree,
            |path, _| {
                seen.push(path.rel().to_rooted_string());
                Ok(())
            },
            |path, source| BuildError::Walk {
                phase: WalkPhase::Assembly,
                path,
                source,
            },
        )?;
        Ok(seen)
    }

    #[test]
    fn test_walk_sorted_depth_first() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("b")).unwrap();
        fs::write(tmp.path().join("b").join("z.txt"), "z").unwrap();
        fs::write(tmp.path().join("b").join("a.txt"), "a").unwrap();
        fs::write(tmp.path().join("a.txt"), "a").unwrap();
        fs::write(tmp.path().join("c.txt"), "c").unwrap();

        let tree = Tree::new(tmp.path());
        assert_eq!(
            collect(&tree).unwrap(),
            vec!["/", "/a.txt", "/b", "/b/a.txt", "/b/z.txt", "/c.txt"]
        );
    }

    #[test]
    fn test_walk_missing_root_is_walk_error() {
        let tmp = TempDir::new().unwrap();
        let tree = Tree::new(tmp.path().join("missing"));
        let err = collect(&tree).unwrap_err();
        assert!(matches!(err, BuildError::Walk { phase: WalkPhase::Assembly, .. }));
    }

    #[test]
    fn test_walk_visit_error_aborts() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a"), "a").unwrap();
        fs::write(tmp.path().join("b"), "b").unwrap();

        let tree: Tree<Target> = Tree::new(tmp.path());
        let mut visited = 0;
        let result = walk_tree(
            &tree,
            |_, _| {
                visited += 1;
                if visited == 2 {
                    return Err(io::Error::new(io::ErrorKind::Other, "stop").into());
                }
                Ok(())
            },
            |path, source| BuildError::Walk {
                phase: WalkPhase::Assembly,
                path,
                source,
            },
        );
        assert!(result.is_err());
        assert_eq!(visited, 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_does_not_follow_symlinks() {
        let tmp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("secret"), "s").unwrap();
        std::os::unix::fs::symlink(outside.path(), tmp.path().join("link")).unwrap();

        let tree = Tree::new(tmp.path());
        assert_eq!(collect(&tree).unwrap(), vec!["/", "/link"]);
    }
}
