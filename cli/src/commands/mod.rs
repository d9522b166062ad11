//! CLI command definitions and dispatch.

mod build;
mod changes;
mod diff;
mod inspect;
mod version;

use std::path::{Path, PathBuf};

use acibuild_core::{BuildError, BuilderConfig, ImageManifest};
use acibuild_runtime::{AciBuilder, BuildReport};
use clap::{Parser, Subcommand};

/// acibuild - build incremental ACI images from extracted image trees.
#[derive(Parser)]
#[command(name = "acibuild", version, about)]
pub struct Cli {
    /// Builder configuration file (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Load the configuration named by `--config`, or the defaults.
    pub fn load_config(&self) -> Result<BuilderConfig, BuildError> {
        match &self.config {
            Some(path) => BuilderConfig::from_path(path),
            None => Ok(BuilderConfig::default()),
        }
    }
}

/// Available commands.
#[derive(Subcommand)]
pub enum Command {
    /// Build an image holding only what changed since a base image
    Diff(diff::DiffArgs),
    /// Build an image holding a complete rootfs
    Build(build::BuildArgs),
    /// List the changes between two extracted images
    Changes(changes::ChangesArgs),
    /// Show the manifest and entries of an image archive
    Inspect(inspect::InspectArgs),
    /// Show version information
    Version(version::VersionArgs),
}

/// Dispatch a parsed CLI command.
pub async fn dispatch(cli: Cli, config: BuilderConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Diff(args) => diff::execute(args, config).await,
        Command::Build(args) => build::execute(args, config).await,
        Command::Changes(args) => changes::execute(args, config).await,
        Command::Inspect(args) => inspect::execute(args).await,
        Command::Version(args) => version::execute(args).await,
    }
}

/// Permission bits of a written image archive.
#[cfg(unix)]
const ARCHIVE_MODE: u32 = 0o644;

/// Run `builder` on a blocking thread, writing into a temporary file next to
/// `output`. The file only replaces `output` once the archive is complete.
async fn build_to_file<B>(
    builder: B,
    manifest_path: PathBuf,
    output: PathBuf,
) -> Result<BuildReport, Box<dyn std::error::Error>>
where
    B: AciBuilder + Send + 'static,
{
    let report = tokio::task::spawn_blocking(move || -> Result<BuildReport, BuildError> {
        let manifest = ImageManifest::from_path(&manifest_path)?;

        let mut tmp = tempfile::NamedTempFile::new_in(output_dir(&output))?;
        let report = builder.build(manifest, tmp.as_file_mut())?;
        tmp.as_file().sync_all()?;

        // Temp files are created 0600.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(ARCHIVE_MODE))?;
        }
        tmp.persist(&output).map_err(|e| e.error)?;

        tracing::debug!(output = %output.display(), "Persisted image archive");
        Ok(report)
    })
    .await??;

    Ok(report)
}

/// Directory a temporary file for `output` is created in.
fn output_dir(output: &Path) -> &Path {
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Print a one-line summary of a finished build.
fn print_report(output: &Path, report: &BuildReport) {
    let size = std::fs::metadata(output).map(|m| m.len()).unwrap_or(0);
    println!(
        "Wrote {} ({}): {} entries",
        output.display(),
        crate::output::format_bytes(size),
        report.entries_written
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use acibuild_core::CompareMode;

    #[test]
    fn test_parse_diff() {
        let cli = Cli::try_parse_from([
            "acibuild",
            "diff",
            "base",
            "image",
            "--manifest",
            "manifest.json",
            "--output",
            "out.aci",
            "--compare",
            "metadata",
            "--compression-level",
            "9",
        ])
        .unwrap();

        match cli.command {
            Command::Diff(args) => {
                assert_eq!(args.base, PathBuf::from("base"));
                assert_eq!(args.image, PathBuf::from("image"));
                assert_eq!(args.output, PathBuf::from("out.aci"));
                assert_eq!(args.compare, Some(CompareMode::Metadata));
                assert_eq!(args.compression_level, Some(9));
            }
            _ => panic!("expected diff command"),
        }
    }

    #[test]
    fn test_parse_diff_requires_output() {
        let result = Cli::try_parse_from([
            "acibuild",
            "diff",
            "base",
            "image",
            "--manifest",
            "manifest.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_rejects_unknown_compare_mode() {
        let result = Cli::try_parse_from([
            "acibuild",
            "diff",
            "base",
            "image",
            "--manifest",
            "m.json",
            "--output",
            "o.aci",
            "--compare",
            "mtime",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["acibuild", "changes", "a", "b", "--config", "cfg.json"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("cfg.json")));
    }

    #[test]
    fn test_load_config_defaults() {
        let cli = Cli::try_parse_from(["acibuild", "version"]).unwrap();
        assert_eq!(cli.load_config().unwrap(), BuilderConfig::default());
    }

    #[test]
    fn test_load_config_from_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"compare": "metadata", "log_level": "debug"}"#).unwrap();

        let cli = Cli::try_parse_from([
            "acibuild",
            "--config",
            path.to_str().unwrap(),
            "version",
        ])
        .unwrap();
        let config = cli.load_config().unwrap();
        assert_eq!(config.compare, CompareMode::Metadata);
        assert_eq!(config.compression_level, 6);
    }

    #[test]
    fn test_parse_build_json() {
        let cli = Cli::try_parse_from([
            "acibuild", "build", "img", "-m", "m.json", "-o", "o.aci", "--json",
        ])
        .unwrap();
        match cli.command {
            Command::Build(args) => assert!(args.json),
            _ => panic!("expected build command"),
        }
    }

    #[test]
    fn test_report_json_shape() {
        let report = BuildReport {
            changes: acibuild_core::ChangeCounts {
                added: 2,
                modified: 1,
                deleted: 1,
                unchanged: 5,
            },
            has_deleted: true,
            whitelist_len: 8,
            entries_written: 3,
            entries_missing: 0,
        };
        let value = serde_json::to_value(report).unwrap();
        assert_eq!(value["changes"]["added"], 2);
        assert_eq!(value["changes"]["unchanged"], 5);
        assert_eq!(value["has_deleted"], true);
        assert_eq!(value["whitelist_len"], 8);
        assert_eq!(value["entries_written"], 3);
    }

    #[test]
    fn test_output_dir() {
        assert_eq!(output_dir(Path::new("out.aci")), Path::new("."));
        assert_eq!(output_dir(Path::new("/tmp/out.aci")), Path::new("/tmp"));
    }
}
