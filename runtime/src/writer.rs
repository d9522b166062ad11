//! Image archive writing.
//!
//! [`ImageWriter`] is the capability the assembler writes through. [`AciWriter`]
//! produces a gzip-compressed tar whose first member is the JSON manifest,
//! followed by filesystem entries under `rootfs/`.

use std::fs::Metadata;
use std::io::Write;
use std::path::{Path, PathBuf};

use acibuild_core::error::{BuildError, Result};
use acibuild_core::manifest::ImageManifest;
use flate2::write::GzEncoder;
use flate2::Compression;

/// Archive member name of the manifest.
pub const MANIFEST_ENTRY: &str = "manifest";

/// One filesystem entry handed to an [`ImageWriter`].
#[derive(Debug)]
pub struct ImageEntry<'a> {
    /// Member name inside the archive, e.g. `rootfs/etc/passwd`
    pub archive_path: PathBuf,
    /// Location on disk the content and metadata are read from
    pub source: &'a Path,
    /// Metadata of `source` as seen by the walk (symlinks not followed)
    pub metadata: &'a Metadata,
}

/// Sink for image archive entries.
///
/// A writer is created with its manifest and must have emitted the manifest
/// before the first [`add_entry`](ImageWriter::add_entry) call. The archive is
/// only valid once [`close`](ImageWriter::close) succeeds.
pub trait ImageWriter {
    /// What `close` hands back, usually the underlying stream.
    type Output;

    fn add_entry(&mut self, entry: &ImageEntry<'_>) -> Result<()>;

    fn close(self) -> Result<Self::Output>;
}

/// Gzip-compressed tar image writer.
///
/// Owns the destination stream until [`close`](ImageWriter::close). Dropping
/// the writer on an error path releases both layers without reporting.
pub struct AciWriter<W: Write> {
    archive: tar::Builder<GzEncoder<W>>,
    entries: usize,
}

impl<W: Write> AciWriter<W> {
    /// Open `out` for writing and emit `manifest` as the lead entry.
    pub fn new(manifest: &ImageManifest, out: W, compression_level: u32) -> Result<Self> {
        let encoder = GzEncoder::new(out, Compression::new(compression_level));
        let mut archive = tar::Builder::new(encoder);
        archive.follow_symlinks(false);

        let data = manifest.to_json_vec()?;
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        );
        header.set_cksum();

        archive
            .append_data(&mut header, MANIFEST_ENTRY, data.as_slice())
            .map_err(|e| BuildError::Write {
                path: PathBuf::from(MANIFEST_ENTRY),
                source: e,
            })?;

        Ok(Self {
            archive,
            entries: 0,
        })
    }

    /// Number of filesystem entries written so far (manifest excluded).
    pub fn entries(&self) -> usize {
        self.entries
    }
}

impl<W: Write> ImageWriter for AciWriter<W> {
    type Output = W;

    fn add_entry(&mut self, entry: &ImageEntry<'_>) -> Result<()> {
        self.archive
            .append_path_with_name(entry.source, &entry.archive_path)
            .map_err(|e| BuildError::Write {
                path: entry.archive_path.clone(),
                source: e,
            })?;
        self.entries += 1;

        tracing::debug!(
            entry = %entry.archive_path.display(),
            size = entry.metadata.len(),
            "Added entry to image"
        );
        Ok(())
    }

    /// Finish the tar layer, then the gzip layer. Both are attempted even if
    /// the first fails, and every failure is reported.
    fn close(mut self) -> Result<W> {
        let archive_err = self.archive.finish().err();

        let encoder = match self.archive.into_inner() {
            Ok(encoder) => encoder,
            Err(e) => {
                return Err(BuildError::Close {
                    archive: Some(archive_err.unwrap_or(e)),
                    compression: None,
                })
            }
        };

        match (archive_err, encoder.finish()) {
            (None, Ok(out)) => Ok(out),
            (archive, Ok(_)) => Err(BuildError::Close {
                archive,
                compression: None,
            }),
            (archive, Err(e)) => Err(BuildError::Close {
                archive,
                compression: Some(e),
            }),
        }
    }
}
