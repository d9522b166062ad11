//! `acibuild build` command - Build an image holding a complete rootfs.

use std::path::PathBuf;

use acibuild_core::BuilderConfig;
use acibuild_runtime::SimpleAciBuilder;
use clap::Args;

#[derive(Args)]
pub struct BuildArgs {
    /// Extracted image directory (contains rootfs/)
    pub image: PathBuf,

    /// Image manifest (JSON) to embed in the archive
    #[arg(short, long)]
    pub manifest: PathBuf,

    /// Output archive path
    #[arg(short, long)]
    pub output: PathBuf,

    /// Gzip compression level (0-9)
    #[arg(long)]
    pub compression_level: Option<u32>,

    /// Print the build report as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(
    args: BuildArgs,
    mut config: BuilderConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(level) = args.compression_level {
        config.compression_level = level;
    }
    config.validate()?;

    let builder = SimpleAciBuilder::with_config(&args.image, &config);
    let report = super::build_to_file(builder, args.manifest, args.output.clone()).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        super::print_report(&args.output, &report);
    }
    Ok(())
}
