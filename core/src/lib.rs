//! acibuild Core - Foundational Types
//!
//! Error taxonomy, tree provenance types, change records, the image
//! manifest schema, and builder configuration shared by the runtime and CLI.

pub mod change;
pub mod config;
pub mod error;
pub mod manifest;
pub mod tree;

// Re-export commonly used types
pub use change::{ChangeCounts, ChangeKind, ChangeRecord};
pub use config::{BuilderConfig, CompareMode, LogLevel};
pub use error::{BuildError, Result, WalkPhase};
pub use manifest::{AcKind, ImageManifest, Kind};
pub use tree::{Base, RelPath, Target, Tree, TreePath, TreeRole};

/// acibuild version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
