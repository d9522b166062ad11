use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

use crate::error::{BuildError, Result};

/// Builder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// How the differ decides that a path present in both trees changed
    pub compare: CompareMode,

    /// Gzip compression level (0-9)
    pub compression_level: u32,

    /// Name of the rootfs directory inside an extracted image
    pub rootfs_dir: String,

    /// Log level
    pub log_level: LogLevel,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            compare: CompareMode::Content,
            compression_level: 6,
            rootfs_dir: "rootfs".to_string(),
            log_level: LogLevel::Warn,
        }
    }
}

impl BuilderConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BuildError::ConfigError(format!(
                "Failed to read config at {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| BuildError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.compression_level > 9 {
            return Err(BuildError::ConfigError(format!(
                "compression_level must be between 0 and 9, got {}",
                self.compression_level
            )));
        }

        let mut components = Path::new(&self.rootfs_dir).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(()),
            _ => Err(BuildError::ConfigError(format!(
                "rootfs_dir must be a single directory name, got '{}'",
                self.rootfs_dir
            ))),
        }
    }
}

/// Strategy for detecting modified entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompareMode {
    /// SHA-256 of regular file contents
    #[default]
    Content,
    /// File size and modification time
    Metadata,
}

impl std::fmt::Display for CompareMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Content => write!(f, "content"),
            Self::Metadata => write!(f, "metadata"),
        }
    }
}

impl std::str::FromStr for CompareMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "content" => Ok(Self::Content),
            "metadata" => Ok(Self::Metadata),
            _ => Err(format!(
                "unknown compare mode: '{}' (supported: content, metadata)",
                s
            )),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}
