//! `acibuild version` command.

use clap::Args;

#[derive(Args)]
pub struct VersionArgs;

pub async fn execute(_args: VersionArgs) -> Result<(), Box<dyn std::error::Error>> {
    println!("acibuild version {}", acibuild_core::VERSION);
    println!("  runtime {}", acibuild_runtime::VERSION);
    Ok(())
}
