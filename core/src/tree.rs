//! Rooted file trees and paths that remember which tree they belong to.
//!
//! A build compares two trees, `base` and `target`. Paths are carried as
//! [`TreePath<R>`] where `R` is a zero-sized role marker, so a path taken from
//! the base tree cannot be handed to code that expects a target path.

use std::fmt;
use std::marker::PhantomData;
use std::path::{Component, Path, PathBuf};

use crate::error::{BuildError, Result};

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Base {}
    impl Sealed for super::Target {}
}

/// Role of a tree within a build.
pub trait TreeRole:
    sealed::Sealed + Copy + fmt::Debug + Eq + Ord + std::hash::Hash + Send + Sync + 'static
{
    /// Human-readable role name used in errors and logs.
    const NAME: &'static str;
}

/// Marker for the prior state of the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Base;

/// Marker for the new state of the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Target;

impl TreeRole for Base {
    const NAME: &'static str = "base";
}

impl TreeRole for Target {
    const NAME: &'static str = "target";
}

/// A normalized path relative to some tree root.
///
/// Only normal components are kept; `.` is dropped and `..`, roots, and
/// prefixes are rejected. The empty path denotes the tree root itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelPath(PathBuf);

impl RelPath {
    /// The tree root.
    pub fn root() -> Self {
        Self(PathBuf::new())
    }

    /// Validate and normalize a relative path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut normalized = PathBuf::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => normalized.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(BuildError::InvalidPath {
                        path: path.to_path_buf(),
                        reason: "parent directory components are not allowed".to_string(),
                    })
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(BuildError::InvalidPath {
                        path: path.to_path_buf(),
                        reason: "path must be relative to the tree root".to_string(),
                    })
                }
            }
        }
        Ok(Self(normalized))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.as_os_str().is_empty()
    }

    /// Render as a `/`-rooted string, e.g. `etc/passwd` becomes `/etc/passwd`
    /// and the root becomes `/`.
    pub fn to_rooted_string(&self) -> String {
        let mut rooted = String::from("/");
        let parts: Vec<_> = self
            .0
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        rooted.push_str(&parts.join("/"));
        rooted
    }
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rooted_string())
    }
}

/// A rooted directory on disk playing role `R` in a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree<R: TreeRole> {
    root: PathBuf,
    _role: PhantomData<R>,
}

impl<R: TreeRole> Tree<R> {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            _role: PhantomData,
        }
    }

    /// Absolute (or caller-relative) root directory of the tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn role(&self) -> &'static str {
        R::NAME
    }

    /// Attach this tree's provenance to a relative path.
    pub fn join(&self, rel: &RelPath) -> TreePath<R> {
        TreePath {
            rel: rel.clone(),
            _role: PhantomData,
        }
    }

    /// Express an on-disk path under this tree as a [`TreePath`].
    pub fn relativize(&self, path: &Path) -> Result<TreePath<R>> {
        let rel = path
            .strip_prefix(&self.root)
            .map_err(|_| BuildError::InvalidPath {
                path: path.to_path_buf(),
                reason: format!("not under {} tree {}", R::NAME, self.root.display()),
            })?;
        Ok(self.join(&RelPath::new(rel)?))
    }

    /// Resolve a path of this tree to its location on disk.
    pub fn resolve(&self, path: &TreePath<R>) -> PathBuf {
        self.root.join(path.rel.as_path())
    }
}

/// A path inside a tree of role `R`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TreePath<R: TreeRole> {
    rel: RelPath,
    _role: PhantomData<R>,
}

impl<R: TreeRole> TreePath<R> {
    pub fn rel(&self) -> &RelPath {
        &self.rel
    }

    pub fn is_root(&self) -> bool {
        self.rel.is_root()
    }

    /// Archive member name with `prefix` as the top directory.
    pub fn archive_path(&self, prefix: &str) -> PathBuf {
        Path::new(prefix).join(self.rel.as_path())
    }
}

impl<R: TreeRole> fmt::Display for TreePath<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", R::NAME, self.rel)
    }
}
