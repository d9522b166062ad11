//! acibuild CLI - build incremental ACI images from extracted image trees.

pub mod commands;
pub mod output;
