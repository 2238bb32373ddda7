//! Reader and writer configuration

use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::error::Result;

/// Top-level configuration for exifkit.
///
/// Loaded from JSON; every field is optional and falls back to its default.
///
/// ```rust,no_run
/// use exifkit::config::Config;
///
/// let config = Config::load("exifkit.json").unwrap();
/// assert!(config.write.prefer_in_place);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Parsing limits and source handling.
    pub read: ReadOptions,
    /// Save strategy and commit behavior.
    pub write: WriteOptions,
}

/// Controls how EXIF blocks are parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    /// Memory-map files instead of reading through a file handle.
    pub use_mmap: bool,
    /// Values up to this many bytes are decoded while parsing; larger ones load lazily.
    pub eager_limit: usize,
    /// Maximum number of IFDs in the top-level chain.
    pub max_ifds: usize,
    /// Maximum number of records in one IFD.
    pub max_entries: usize,
    /// Maximum sub-IFD nesting below a top-level IFD.
    pub max_depth: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            use_mmap: true,
            eager_limit: 0,
            max_ifds: 64,
            max_entries: 4096,
            max_depth: 4,
        }
    }
}

/// Controls how modified trees are saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// Patch original byte regions when every change fits; `false` always regenerates.
    pub prefer_in_place: bool,
    /// Keep a `.bak` copy of the original next to the saved file.
    pub backup_originals: bool,
    /// fsync the temporary file before it replaces the original.
    pub sync: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            prefer_in_place: true,
            backup_originals: false,
            sync: true,
        }
    }
}

impl Config {
    /// Loads config from `path`, using defaults when the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::warn!("Config file not found at {}. Using defaults.", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parses config from a JSON string.
    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Saves config to `path` as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        log::info!("Config saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.read.use_mmap);
        assert_eq!(config.read.eager_limit, 0);
        assert_eq!(config.read.max_depth, 4);
        assert!(config.write.prefer_in_place);
        assert!(!config.write.backup_originals);
        assert!(config.write.sync);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = Config::from_json(r#"{"write": {"backup_originals": true}}"#).unwrap();
        assert!(config.write.backup_originals);
        assert!(config.write.prefer_in_place);
        assert_eq!(config.read, ReadOptions::default());
    }

    #[test]
    fn test_invalid_json() {
        let err = Config::from_json("{ not json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exifkit.json");

        let mut config = Config::default();
        config.read.eager_limit = 64;
        config.write.sync = false;
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }
}
