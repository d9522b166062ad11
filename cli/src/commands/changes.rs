//! `acibuild changes` command - List the changes between two extracted images.

use std::path::PathBuf;

use acibuild_core::{Base, BuilderConfig, ChangeKind, ChangeRecord, CompareMode, Target, Tree};
use acibuild_runtime::{Differ, FsDiffer};
use clap::Args;

#[derive(Args)]
pub struct ChangesArgs {
    /// Extracted base image directory (contains rootfs/)
    pub base: PathBuf,

    /// Extracted new image directory (contains rootfs/)
    pub image: PathBuf,

    /// How to detect modified files: content or metadata
    #[arg(long)]
    pub compare: Option<CompareMode>,

    /// Also list unchanged paths
    #[arg(short, long)]
    pub all: bool,
}

pub async fn execute(
    args: ChangesArgs,
    config: BuilderConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mode = args.compare.unwrap_or(config.compare);
    let base: Tree<Base> = Tree::new(args.base.join(&config.rootfs_dir));
    let target: Tree<Target> = Tree::new(args.image.join(&config.rootfs_dir));

    let records =
        tokio::task::spawn_blocking(move || FsDiffer::new(mode).diff(&base, &target)).await??;

    for line in format_changes(&records, args.all) {
        println!("{line}");
    }
    Ok(())
}

/// One `<kind> <path>` line per record, unchanged records only when `all`.
fn format_changes(records: &[ChangeRecord], all: bool) -> Vec<String> {
    records
        .iter()
        .filter(|r| all || r.kind != ChangeKind::Unchanged)
        .map(|r| format!("{} {}", r.kind, r.path))
        .collect()
}
