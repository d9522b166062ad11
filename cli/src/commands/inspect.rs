//! `acibuild inspect` command - Show the manifest and entries of an image.

use std::io::BufReader;
use std::path::PathBuf;

use acibuild_runtime::{read_image, ImageArchive};
use clap::Args;

use crate::output;

#[derive(Args)]
pub struct InspectArgs {
    /// Image archive to read
    pub archive: PathBuf,

    /// Print the manifest as JSON instead of a summary
    #[arg(long)]
    pub manifest: bool,
}

pub async fn execute(args: InspectArgs) -> Result<(), Box<dyn std::error::Error>> {
    let path = args.archive;
    let file = std::fs::File::open(&path)
        .map_err(|e| format!("Failed to open {}: {e}", path.display()))?;
    let image = tokio::task::spawn_blocking(move || read_image(BufReader::new(file))).await??;

    if args.manifest {
        println!("{}", serde_json::to_string_pretty(&image.manifest)?);
        return Ok(());
    }

    println!("{}", render(&image));
    Ok(())
}

fn render(image: &ImageArchive) -> String {
    let manifest = &image.manifest;
    let total: u64 = image.entries.iter().map(|e| e.size).sum();

    let mut out = String::new();
    out.push_str(&format!("Name:       {}\n", manifest.name));
    out.push_str(&format!(
        "Kind:       {} {}\n",
        manifest.ac_kind, manifest.ac_version
    ));
    if manifest.path_whitelist.is_empty() {
        out.push_str("Whitelist:  none\n");
    } else {
        out.push_str(&format!(
            "Whitelist:  {} paths\n",
            manifest.path_whitelist.len()
        ));
    }
    out.push_str(&format!(
        "Entries:    {} ({})\n\n",
        image.entries.len(),
        output::format_bytes(total)
    ));

    let mut table = output::new_table(&["PATH", "TYPE", "MODE", "SIZE"]);
    for entry in &image.entries {
        table.add_row(vec![
            entry.path.clone(),
            entry.kind.to_string(),
            output::format_mode(entry.mode),
            output::format_bytes(entry.size),
        ]);
    }
    out.push_str(&table.to_string());
    out
}
