//! `acibuild diff` command - Build an image from the changes between two
//! extracted images.

use std::path::PathBuf;

use acibuild_core::{BuilderConfig, CompareMode};
use acibuild_runtime::DiffAciBuilder;
use clap::Args;

#[derive(Args)]
pub struct DiffArgs {
    /// Extracted base image directory (contains rootfs/)
    pub base: PathBuf,

    /// Extracted new image directory (contains rootfs/)
    pub image: PathBuf,

    /// Image manifest (JSON) to embed in the archive
    #[arg(short, long)]
    pub manifest: PathBuf,

    /// Output archive path
    #[arg(short, long)]
    pub output: PathBuf,

    /// How to detect modified files: content or metadata
    #[arg(long)]
    pub compare: Option<CompareMode>,

    /// Gzip compression level (0-9)
    #[arg(long)]
    pub compression_level: Option<u32>,

    /// Print the build report as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(
    args: DiffArgs,
    mut config: BuilderConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(compare) = args.compare {
        config.compare = compare;
    }
    if let Some(level) = args.compression_level {
        config.compression_level = level;
    }
    config.validate()?;

    let builder = DiffAciBuilder::with_config(&args.base, &args.image, &config);
    let report = super::build_to_file(builder, args.manifest, args.output.clone()).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    super::print_report(&args.output, &report);
    println!(
        "  {} added, {} modified, {} deleted, {} unchanged",
        report.changes.added,
        report.changes.modified,
        report.changes.deleted,
        report.changes.unchanged
    );
    if report.has_deleted {
        println!("  path whitelist: {} paths", report.whitelist_len);
    }
    if report.entries_missing > 0 {
        println!(
            "  warning: {} changed entries vanished before they were archived",
            report.entries_missing
        );
    }
    Ok(())
}
