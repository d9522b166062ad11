//! acibuild Runtime - Diff-to-Archive Pipeline
//!
//! Compares a base and a new extracted image tree, selects the entries that
//! were added or modified, and streams them into a gzip-compressed ACI whose
//! manifest carries a path whitelist when anything was deleted.

#![allow(clippy::result_large_err)]

pub mod assemble;
pub mod augment;
pub mod builder;
pub mod diff;
pub mod plan;
pub mod reader;
pub mod writer;

mod walk;

// Re-export common types
pub use assemble::{assemble, AssemblyReport, Selection};
pub use augment::augment;
pub use builder::{AciBuilder, BuildReport, DiffAciBuilder, SimpleAciBuilder};
pub use diff::{Differ, FsDiffer};
pub use plan::{build_whitelist, plan, InclusionSet, PathWhitelist, SelectionPlan};
pub use reader::{read_image, ArchiveEntry, EntryType, ImageArchive};
pub use writer::{AciWriter, ImageEntry, ImageWriter, MANIFEST_ENTRY};

/// acibuild Runtime version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
