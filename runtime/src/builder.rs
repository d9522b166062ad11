//! Image archive builders.
//!
//! Both builders take paths to *extracted images* (a directory holding a
//! `rootfs/` tree) and write a complete ACI to the caller's stream.
//!
//! ```text
//! DiffAciBuilder::build
//!   diff(base/rootfs, image/rootfs) ──► plan ──► whitelist? ──► augment
//!                                                                  │
//!   AciWriter(manifest first) ◄── assemble(image/rootfs, inclusion)┘
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use acibuild_core::change::ChangeCounts;
use acibuild_core::config::BuilderConfig;
use acibuild_core::error::Result;
use acibuild_core::manifest::ImageManifest;
use acibuild_core::tree::{Base, Target, Tree};
use serde::Serialize;

use crate::assemble::{assemble, Selection};
use crate::augment::augment;
use crate::diff::{Differ, FsDiffer};
use crate::plan::{build_whitelist, plan, PathWhitelist};
use crate::writer::AciWriter;

/// Builds an image archive from an extracted image.
pub trait AciBuilder {
    /// Write the archive for `manifest` to `out`. On error nothing written to
    /// `out` may be trusted.
    fn build<W: Write>(&self, manifest: ImageManifest, out: W) -> Result<BuildReport>;
}

/// Summary of a finished build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub changes: ChangeCounts,
    pub has_deleted: bool,
    pub whitelist_len: usize,
    /// Filesystem entries written (manifest excluded)
    pub entries_written: usize,
    /// Changed entries that vanished before they could be archived
    pub entries_missing: usize,
}

/// Builds an ACI holding only the rootfs entries that were added or modified
/// between a base image and a new image.
///
/// If anything was deleted relative to the base, the manifest gets a path
/// whitelist listing every path of the new rootfs.
#[derive(Debug, Clone)]
pub struct DiffAciBuilder<D: Differ = FsDiffer> {
    base: Tree<Base>,
    target: Tree<Target>,
    differ: D,
    rootfs_dir: String,
    compression_level: u32,
}

impl DiffAciBuilder<FsDiffer> {
    /// `base_path` and `path` are the directories of the two extracted images.
    pub fn new(base_path: impl AsRef<Path>, path: impl AsRef<Path>) -> Self {
        Self::with_config(base_path, path, &BuilderConfig::default())
    }

    pub fn with_config(
        base_path: impl AsRef<Path>,
        path: impl AsRef<Path>,
        config: &BuilderConfig,
    ) -> Self {
        Self {
            base: Tree::new(base_path.as_ref().join(&config.rootfs_dir)),
            target: Tree::new(path.as_ref().join(&config.rootfs_dir)),
            differ: FsDiffer::new(config.compare),
            rootfs_dir: config.rootfs_dir.clone(),
            compression_level: config.compression_level,
        }
    }
}

impl<D: Differ> DiffAciBuilder<D> {
    /// Swap the comparison strategy.
    pub fn with_differ<E: Differ>(self, differ: E) -> DiffAciBuilder<E> {
        DiffAciBuilder {
            base: self.base,
            target: self.target,
            differ,
            rootfs_dir: self.rootfs_dir,
            compression_level: self.compression_level,
        }
    }

    pub fn base(&self) -> &Tree<Base> {
        &self.base
    }

    pub fn target(&self) -> &Tree<Target> {
        &self.target
    }
}

impl<D: Differ> AciBuilder for DiffAciBuilder<D> {
    fn build<W: Write>(&self, manifest: ImageManifest, out: W) -> Result<BuildReport> {
        tracing::info!(
            base = %self.base.root().display(),
            image = %self.target.root().display(),
            name = %manifest.name,
            "Building diff image"
        );

        let records = self.differ.diff(&self.base, &self.target)?;
        let selection = plan(&self.target, &records);

        tracing::info!(
            added = selection.counts.added,
            modified = selection.counts.modified,
            deleted = selection.counts.deleted,
            unchanged = selection.counts.unchanged,
            "Classified changes"
        );

        let whitelist = if selection.has_deleted {
            build_whitelist(&self.target)?
        } else {
            PathWhitelist::default()
        };
        let whitelist_len = whitelist.len();
        let manifest = augment(manifest, whitelist);

        let writer = AciWriter::new(&manifest, out, self.compression_level)?;
        let (_, assembly) = assemble(
            &self.target,
            &self.rootfs_dir,
            Selection::Only(&selection.inclusion),
            writer,
        )?;

        tracing::info!(
            entries = assembly.written,
            whitelist = whitelist_len,
            "Diff image built"
        );

        Ok(BuildReport {
            changes: selection.counts,
            has_deleted: selection.has_deleted,
            whitelist_len,
            entries_written: assembly.written,
            entries_missing: assembly.missing,
        })
    }
}

/// Builds an ACI holding the whole rootfs of an extracted image. The
/// manifest is written as given.
#[derive(Debug, Clone)]
pub struct SimpleAciBuilder {
    path: PathBuf,
    target: Tree<Target>,
    rootfs_dir: String,
    compression_level: u32,
}

impl SimpleAciBuilder {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_config(path, &BuilderConfig::default())
    }

    pub fn with_config(path: impl AsRef<Path>, config: &BuilderConfig) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            target: Tree::new(path.as_ref().join(&config.rootfs_dir)),
            rootfs_dir: config.rootfs_dir.clone(),
            compression_level: config.compression_level,
        }
    }
}

impl AciBuilder for SimpleAciBuilder {
    fn build<W: Write>(&self, manifest: ImageManifest, out: W) -> Result<BuildReport> {
        tracing::info!(
            image = %self.path.display(),
            name = %manifest.name,
            "Building full image"
        );

        let writer = AciWriter::new(&manifest, out, self.compression_level)?;
        let (_, assembly) = assemble(&self.target, &self.rootfs_dir, Selection::All, writer)?;

        tracing::info!(entries = assembly.written, "Full image built");

        Ok(BuildReport {
            changes: ChangeCounts::default(),
            has_deleted: false,
            whitelist_len: manifest.path_whitelist.len(),
            entries_written: assembly.written,
            entries_missing: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acibuild_core::change::{ChangeKind, ChangeRecord};
    use acibuild_core::tree::RelPath;
    use acibuild_core::BuildError;
    use std::fs;
    use tempfile::TempDir;

    fn image(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        let rootfs = dir.path().join("rootfs");
        fs::create_dir(&rootfs).unwrap();
        for (name, content) in files {
            let path = rootfs.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
        dir
    }

    /// Differ that replays a fixed change list.
    struct FixedDiffer(Vec<ChangeRecord>);

    impl Differ for FixedDiffer {
        fn diff(&self, _: &Tree<Base>, _: &Tree<Target>) -> Result<Vec<ChangeRecord>> {
            Ok(self.0.clone())
        }
    }

    struct FailingDiffer;

    impl Differ for FailingDiffer {
        fn diff(&self, base: &Tree<Base>, _: &Tree<Target>) -> Result<Vec<ChangeRecord>> {
            Err(BuildError::Diff {
                tree: "base",
                path: base.root().to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        }
    }

    #[test]
    fn test_diff_builder_report() {
        let base = image(&[("a.txt", "1"), ("b.txt", "2")]);
        let new = image(&[("a.txt", "1"), ("b.txt", "3"), ("c.txt", "4")]);

        let mut out = Vec::new();
        let report = DiffAciBuilder::new(base.path(), new.path())
            .build(ImageManifest::new("app"), &mut out)
            .unwrap();

        assert_eq!(report.changes.added, 1);
        assert_eq!(report.changes.modified, 1);
        assert_eq!(report.changes.unchanged, 1);
        assert!(!report.has_deleted);
        assert_eq!(report.whitelist_len, 0);
        assert_eq!(report.entries_written, 2);
        assert!(!out.is_empty());
    }

    #[test]
    fn test_diff_builder_with_custom_differ() {
        let base = image(&[]);
        let new = image(&[("only.txt", "x"), ("other.txt", "y")]);
        let differ = FixedDiffer(vec![ChangeRecord::new(
            RelPath::new("only.txt").unwrap(),
            ChangeKind::Modified,
        )]);

        let mut out = Vec::new();
        let report = DiffAciBuilder::new(base.path(), new.path())
            .with_differ(differ)
            .build(ImageManifest::new("app"), &mut out)
            .unwrap();
        assert_eq!(report.entries_written, 1);
    }

    #[test]
    fn test_diff_builder_propagates_diff_error() {
        let base = image(&[]);
        let new = image(&[]);
        let mut out = Vec::new();
        let err = DiffAciBuilder::new(base.path(), new.path())
            .with_differ(FailingDiffer)
            .build(ImageManifest::new("app"), &mut out)
            .unwrap_err();
        assert!(matches!(err, BuildError::Diff { .. }));
        assert!(out.is_empty());
    }

    #[test]
    fn test_diff_builder_missing_rootfs() {
        let base = TempDir::new().unwrap();
        let new = image(&[("a", "a")]);
        let err = DiffAciBuilder::new(base.path(), new.path())
            .build(ImageManifest::new("app"), Vec::new())
            .unwrap_err();
        assert!(matches!(err, BuildError::Diff { tree: "base", .. }));
    }

    #[test]
    fn test_custom_rootfs_dir() {
        let base = TempDir::new().unwrap();
        let new = TempDir::new().unwrap();
        fs::create_dir(base.path().join("fs")).unwrap();
        fs::create_dir(new.path().join("fs")).unwrap();
        fs::write(new.path().join("fs").join("x"), "x").unwrap();

        let config = BuilderConfig {
            rootfs_dir: "fs".to_string(),
            ..Default::default()
        };
        let builder = DiffAciBuilder::with_config(base.path(), new.path(), &config);
        assert_eq!(builder.target().root(), new.path().join("fs"));

        let report = builder.build(ImageManifest::new("app"), Vec::new()).unwrap();
        assert_eq!(report.entries_written, 1);
    }

    #[test]
    fn test_simple_builder_writes_everything() {
        let new = image(&[("a.txt", "1"), ("dir/b.txt", "2")]);
        let report = SimpleAciBuilder::new(new.path())
            .build(ImageManifest::new("app"), Vec::new())
            .unwrap();
        // rootfs, a.txt, dir, dir/b.txt
        assert_eq!(report.entries_written, 4);
        assert!(!report.has_deleted);
    }
}
