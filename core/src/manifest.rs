//! Image manifest schema.
//!
//! A subset of the appc image manifest: enough to round-trip the fields an
//! image builder touches, with `pathWhitelist` as the one field the build
//! pipeline writes.

use std::fmt;
use std::path::Path;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::error::{BuildError, Result};

/// Kind of an appc schema document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcKind {
    ImageManifest,
    PodManifest,
}

impl fmt::Display for AcKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcKind::ImageManifest => write!(f, "ImageManifest"),
            AcKind::PodManifest => write!(f, "PodManifest"),
        }
    }
}

/// The `acVersion`/`acKind` header shared by every schema document.
///
/// Useful for sniffing a document before committing to a full parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kind {
    pub ac_version: Version,
    pub ac_kind: AcKind,
}

impl Kind {
    pub fn from_json(data: &str) -> Result<Self> {
        serde_json::from_str(data)
            .map_err(|e| BuildError::ManifestError(format!("Failed to parse kind: {}", e)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub image_name: String,
    #[serde(rename = "imageID", default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Image manifest carried as the first entry of an image archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    pub ac_kind: AcKind,
    pub ac_version: Version,
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,

    /// Application definition, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,

    /// Complete set of paths allowed in the composed filesystem. Empty means
    /// no constraint.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path_whitelist: Vec<String>,
}

impl ImageManifest {
    /// Create a minimal manifest for `name`, stamped with acVersion 0.7.4.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            ac_kind: AcKind::ImageManifest,
            ac_version: Version::new(0, 7, 4),
            name: name.into(),
            labels: Vec::new(),
            app: None,
            annotations: Vec::new(),
            dependencies: Vec::new(),
            path_whitelist: Vec::new(),
        }
    }

    /// Load and validate a manifest from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BuildError::ManifestError(format!(
                "Failed to read manifest at {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate a manifest from JSON text.
    pub fn from_json(data: &str) -> Result<Self> {
        let manifest: Self = serde_json::from_str(data)
            .map_err(|e| BuildError::ManifestError(format!("Failed to parse manifest: {}", e)))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Serialize to compact JSON, as stored in the archive.
    pub fn to_json_vec(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn kind(&self) -> Kind {
        Kind {
            ac_version: self.ac_version.clone(),
            ac_kind: self.ac_kind,
        }
    }

    /// Look up a label value by name.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.value.as_str())
    }

    /// Check the invariants an image builder relies on.
    pub fn validate(&self) -> Result<()> {
        if self.ac_kind != AcKind::ImageManifest {
            return Err(BuildError::ManifestError(format!(
                "Wrong acKind: expected ImageManifest, got {}",
                self.ac_kind
            )));
        }

        validate_ac_identifier(&self.name)
            .map_err(|reason| BuildError::ManifestError(format!("Invalid name '{}': {}", self.name, reason)))?;

        if let Some(bad) = self.path_whitelist.iter().find(|p| !p.starts_with('/')) {
            return Err(BuildError::ManifestError(format!(
                "Path whitelist entry '{}' is not absolute",
                bad
            )));
        }

        Ok(())
    }
}

/// AC identifiers: lowercase ASCII alphanumerics plus `-._~/@:`, starting
/// with an alphanumeric.
fn validate_ac_identifier(s: &str) -> std::result::Result<(), String> {
    let first = s.chars().next().ok_or_else(|| "must not be empty".to_string())?;
    if !(first.is_ascii_lowercase() || first.is_ascii_digit()) {
        return Err("must start with a lowercase letter or digit".to_string());
    }
    if let Some(c) = s.chars().find(|c| {
        !(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | '_' | '~' | '/' | '@' | ':'))
    }) {
        return Err(format!("invalid character '{}'", c));
    }
    Ok(())
}
