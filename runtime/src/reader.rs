//! Reading image archives back.

use std::io::Read;

use acibuild_core::error::{BuildError, Result};
use acibuild_core::manifest::ImageManifest;
use flate2::read::GzDecoder;

use crate::writer::MANIFEST_ENTRY;

/// One archive member as listed by [`read_image`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub kind: EntryType,
    pub size: u64,
    pub mode: u32,
}

/// Coarse member type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    File,
    Dir,
    Symlink,
    Other,
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntryType::File => "file",
            EntryType::Dir => "dir",
            EntryType::Symlink => "symlink",
            EntryType::Other => "other",
        };
        write!(f, "{}", s)
    }
}

impl From<tar::EntryType> for EntryType {
    fn from(t: tar::EntryType) -> Self {
        if t.is_file() {
            EntryType::File
        } else if t.is_dir() {
            EntryType::Dir
        } else if t.is_symlink() {
            EntryType::Symlink
        } else {
            EntryType::Other
        }
    }
}

/// A decoded image archive: the manifest and every member after it.
#[derive(Debug, Clone)]
pub struct ImageArchive {
    pub manifest: ImageManifest,
    pub entries: Vec<ArchiveEntry>,
}

impl ImageArchive {
    /// Member paths in archive order, manifest excluded.
    pub fn paths(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.path.as_str()).collect()
    }
}

/// Decode a gzip-compressed image archive.
///
/// The first member must be the manifest; anything else is rejected.
pub fn read_image<R: Read>(reader: R) -> Result<ImageArchive> {
    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    let mut members = archive.entries()?;

    let mut first = members
        .next()
        .ok_or_else(|| BuildError::ManifestError("archive is empty".to_string()))??;
    let first_path = first.path()?.to_string_lossy().to_string();
    if first_path != MANIFEST_ENTRY {
        return Err(BuildError::ManifestError(format!(
            "first archive member is {}, expected {}",
            first_path, MANIFEST_ENTRY
        )));
    }

    let mut json = String::new();
    first.read_to_string(&mut json)?;
    let manifest = ImageManifest::from_json(&json)?;

    let mut entries = Vec::new();
    for member in members {
        let member = member?;
        let header = member.header();
        entries.push(ArchiveEntry {
            path: member
                .path()?
                .to_string_lossy()
                .trim_end_matches('/')
                .to_string(),
            kind: header.entry_type().into(),
            size: header.size()?,
            mode: header.mode()?,
        });
    }

    tracing::debug!(
        name = %manifest.name,
        entries = entries.len(),
        "Read image archive"
    );

    Ok(ImageArchive { manifest, entries })
}
