//! Point-in-time record of every entry in a tree.

use std::collections::BTreeMap;
use std::fs::{self, File, Metadata};
use std::io;
use std::path::PathBuf;

use acibuild_core::config::CompareMode;
use acibuild_core::error::{BuildError, Result};
use acibuild_core::tree::{RelPath, Tree, TreeRole};
use sha2::{Digest, Sha256};

use crate::walk::walk_tree;

/// Type of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Dir,
    File,
    Symlink,
    /// Device nodes, fifos, sockets.
    Other,
}

/// Metadata recorded for a single entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySnapshot {
    pub kind: EntryKind,
    /// Permission and type bits (0 on non-unix)
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    /// Modification time (nanoseconds since epoch)
    pub mtime: i128,
    /// Target of a symlink
    pub link_target: Option<PathBuf>,
    /// SHA-256 of a regular file's bytes, only captured in content mode
    pub digest: Option<String>,
}

impl EntrySnapshot {
    /// Whether `self` (base) and `other` (target) describe different entries.
    pub fn differs(&self, other: &EntrySnapshot, mode: CompareMode) -> bool {
        if self.kind != other.kind
            || self.mode != other.mode
            || self.uid != other.uid
            || self.gid != other.gid
            || self.link_target != other.link_target
        {
            return true;
        }

        if self.kind != EntryKind::File {
            return false;
        }

        match mode {
            CompareMode::Content => self.size != other.size || self.digest != other.digest,
            CompareMode::Metadata => self.size != other.size || self.mtime != other.mtime,
        }
    }
}

/// A snapshot of a tree's entries, keyed by relative path. The root itself is
/// not recorded.
#[derive(Debug, Clone)]
pub struct TreeSnapshot {
    pub entries: BTreeMap<RelPath, EntrySnapshot>,
}

impl TreeSnapshot {
    /// Walk `tree` and record every entry below its root.
    pub fn capture<R: TreeRole>(tree: &Tree<R>, mode: CompareMode) -> Result<Self> {
        let mut entries = BTreeMap::new();
        let diff_error = |path: PathBuf, source: io::Error| BuildError::Diff {
            tree: R::NAME,
            path,
            source,
        };

        walk_tree(
            tree,
            |path, entry| {
                if path.is_root() {
                    return Ok(());
                }
                let metadata = entry
                    .metadata()
                    .map_err(|e| diff_error(entry.path().to_path_buf(), io::Error::from(e)))?;
                let snapshot = snapshot_entry(entry.path(), &metadata, mode)
                    .map_err(|e| diff_error(entry.path().to_path_buf(), e))?;
                entries.insert(path.rel().clone(), snapshot);
                Ok(())
            },
            diff_error,
        )?;

        Ok(TreeSnapshot { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn snapshot_entry(
    path: &std::path::Path,
    metadata: &Metadata,
    mode: CompareMode,
) -> io::Result<EntrySnapshot> {
    let file_type = metadata.file_type();
    let kind = if file_type.is_dir() {
        EntryKind::Dir
    } else if file_type.is_file() {
        EntryKind::File
    } else if file_type.is_symlink() {
        EntryKind::Symlink
    } else {
        EntryKind::Other
    };

    let link_target = if kind == EntryKind::Symlink {
        Some(fs::read_link(path)?)
    } else {
        None
    };

    let digest = if kind == EntryKind::File && mode == CompareMode::Content {
        Some(sha256_file(path)?)
    } else {
        None
    };

    let mtime = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_nanos() as i128)
        .unwrap_or(0);

    #[cfg(unix)]
    let (unix_mode, uid, gid) = {
        use std::os::unix::fs::MetadataExt;
        (metadata.mode(), metadata.uid(), metadata.gid())
    };
    #[cfg(not(unix))]
    let (unix_mode, uid, gid) = (0u32, 0u32, 0u32);

    Ok(EntrySnapshot {
        kind,
        mode: unix_mode,
        uid,
        gid,
        size: metadata.len(),
        mtime,
        link_target,
        digest,
    })
}

/// Compute the SHA-256 digest of a file, streaming its contents.
pub fn sha256_file(path: &std::path::Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}
