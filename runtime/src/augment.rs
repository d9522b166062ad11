//! Merge the computed path whitelist into the caller's manifest.

use acibuild_core::manifest::ImageManifest;

use crate::plan::PathWhitelist;

/// Set the manifest's path whitelist to `whitelist`, replacing whatever the
/// caller put there. No other field is touched and nothing is validated.
pub fn augment(mut manifest: ImageManifest, whitelist: PathWhitelist) -> ImageManifest {
    manifest.path_whitelist = whitelist.into_vec();
    manifest
}
