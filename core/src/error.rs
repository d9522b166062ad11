use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Which traversal a [`BuildError::Walk`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkPhase {
    /// Enumerating every path of the target tree for the path whitelist.
    Whitelist,
    /// Walking the target tree to stream entries into the archive.
    Assembly,
}

impl fmt::Display for WalkPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalkPhase::Whitelist => write!(f, "whitelist walk"),
            WalkPhase::Assembly => write!(f, "assembly walk"),
        }
    }
}

/// acibuild error types
#[derive(Error, Debug)]
pub enum BuildError {
    /// Tree comparison failed
    #[error("Diff failed in {tree} tree at {}: {source}", .path.display())]
    Diff {
        tree: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    /// Directory traversal failed partway
    #[error("Error walking rootfs during {phase} at {}: {source}", .path.display())]
    Walk {
        phase: WalkPhase,
        path: PathBuf,
        source: io::Error,
    },

    /// The archive or compression layer rejected a write
    #[error("Failed to write {} to image: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    /// Finalizing the archive or compression layer failed
    #[error("Unable to close image: {}", close_detail(.archive, .compression))]
    Close {
        archive: Option<io::Error>,
        compression: Option<io::Error>,
    },

    /// A path escaped or could not be expressed relative to its tree
    #[error("Invalid path {}: {reason}", .path.display())]
    InvalidPath { path: PathBuf, reason: String },

    /// Manifest is missing, malformed, or semantically invalid
    #[error("Manifest error: {0}")]
    ManifestError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

fn close_detail(archive: &Option<io::Error>, compression: &Option<io::Error>) -> String {
    match (archive, compression) {
        (Some(a), Some(c)) => format!("archive layer: {a}; compression layer: {c}"),
        (Some(a), None) => format!("archive layer: {a}"),
        (None, Some(c)) => format!("compression layer: {c}"),
        (None, None) => "unknown failure".to_string(),
    }
}

impl From<serde_json::Error> for BuildError {
    fn from(err: serde_json::Error) -> Self {
        BuildError::SerializationError(err.to_string())
    }
}

/// Result type alias for acibuild operations
pub type Result<T> = std::result::Result<T, BuildError>;
