//! Configuration for the form index.

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration for scanning and watching a form tree.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Root of the `<application>/<form>.<extension>` hierarchy.
    pub source_folder: PathBuf,
    /// Derive form names as `<file stem>-<form-version>` when a document
    /// declares a version.
    pub store_versions: bool,
    /// Document file extension, without the leading dot.
    pub extension: String,
    /// How many identifier candidates to draw before giving up.
    pub max_id_attempts: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            source_folder: PathBuf::from("src/forms"),
            store_versions: false,
            extension: "xhtml".to_string(),
            max_id_attempts: 32,
        }
    }
}

impl IndexConfig {
    /// Config for `source_folder` with every other field defaulted.
    pub fn new(source_folder: impl Into<PathBuf>) -> Self {
        Self {
            source_folder: source_folder.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|error| ConfigError::Load {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;

        toml::from_str(&raw).map_err(|error| ConfigError::Load {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })
    }

    /// Check that the source folder is an absolute, readable directory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let path = &self.source_folder;
        if !path.is_absolute() {
            return Err(ConfigError::NotAbsolute(path.clone()));
        }

        let unreadable = |reason: String| ConfigError::Unreadable {
            path: path.clone(),
            reason,
        };

        let metadata = std::fs::metadata(path).map_err(|e| unreadable(e.to_string()))?;
        if !metadata.is_dir() {
            return Err(unreadable("not a directory".to_string()));
        }
        std::fs::read_dir(path).map_err(|e| unreadable(e.to_string()))?;

        Ok(())
    }

    /// `file_name` without the document extension, if it has it.
    pub fn document_stem<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        file_name
            .strip_suffix(self.extension.as_str())
            .and_then(|rest| rest.strip_suffix('.'))
            .filter(|stem| !stem.is_empty())
    }
}
