//! Configuration handling for shulkr
//!
//! The configuration lives in a TOML file named `.shulkr` at the root of the
//! repository holding the generated sources. Every field has a default, so a
//! missing file or a missing section behaves like an empty one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ShulkrError;

/// Name of the configuration file at the repository root.
pub const CONFIG_FILE_NAME: &str = ".shulkr";

/// Shulkr configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Whether renamed locals are reverted at all
    #[serde(default = "default_true")]
    pub undo_renamed_vars: bool,

    /// Settings for reverting renamed locals
    #[serde(default)]
    pub undo: UndoConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            undo_renamed_vars: true,
            undo: UndoConfig::default(),
        }
    }
}

/// Settings for the undo-renames workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndoConfig {
    /// Revision the working tree is compared against
    #[serde(default = "default_base_ref")]
    pub base_ref: String,

    /// File extensions (without the dot) that are analyzed
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// What to do when a file cannot be analyzed
    #[serde(default)]
    pub on_error: OnError,
}

/// Policy for files whose analysis fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    /// Stop the run and report the failing file.
    #[default]
    Abort,
    /// Leave the file untouched, record the failure, and continue.
    Skip,
}

impl fmt::Display for OnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OnError::Abort => write!(f, "abort"),
            OnError::Skip => write!(f, "skip"),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_base_ref() -> String {
    "HEAD".to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["java".to_string()]
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            base_ref: default_base_ref(),
            extensions: default_extensions(),
            on_error: OnError::default(),
        }
    }
}

impl UndoConfig {
    /// Whether `path` has one of the configured extensions.
    pub fn matches_extension(&self, path: &str) -> bool {
        Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }
}

impl Config {
    /// Path of the configuration file for a repository root.
    pub fn path_in(repo_root: &Path) -> PathBuf {
        repo_root.join(CONFIG_FILE_NAME)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ShulkrError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ShulkrError::Config(format!("failed to read config file: {}", e)))?;
        toml::from_str(&content)
            .map_err(|e| ShulkrError::Config(format!("failed to parse config file: {}", e)))
    }

    /// Load `.shulkr` from the given repository root, or defaults if it does not exist
    pub fn load_from_repo(repo_root: &Path) -> Result<Self, ShulkrError> {
        let config_path = Self::path_in(repo_root);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Config::default())
        }
    }

    /// Write the configuration to `.shulkr` in the given repository root
    pub fn save(&self, repo_root: &Path) -> Result<PathBuf, ShulkrError> {
        let config_path = Self::path_in(repo_root);
        let content = toml::to_string_pretty(self)
            .map_err(|e| ShulkrError::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(&config_path, content)
            .map_err(|e| ShulkrError::Config(format!("failed to write config file: {}", e)))?;
        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_when_file_is_missing() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from_repo(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.undo.base_ref, "HEAD");
        assert_eq!(config.undo.extensions, vec!["java".to_string()]);
        assert_eq!(config.undo.on_error, OnError::Abort);
        assert!(config.undo_renamed_vars);
    }

    #[test]
    fn undo_can_be_disabled() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".shulkr"), "undo_renamed_vars = false\n").unwrap();
        let config = Config::load_from_repo(dir.path()).unwrap();
        assert!(!config.undo_renamed_vars);
        assert_eq!(config.undo, UndoConfig::default());
    }

    #[test]
    fn save_writes_config_file_at_repo_root() {
        let dir = TempDir::new().unwrap();
        let path = Config::default().save(dir.path()).unwrap();
        assert_eq!(path, dir.path().join(".shulkr"));
        assert!(path.exists());
    }

    #[test]
    fn save_then_load_preserves_fields() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.undo.on_error = OnError::Skip;
        config.undo.base_ref = "v1.18.1".to_string();
        config.save(dir.path()).unwrap();

        let loaded = Config::load_from_repo(dir.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".shulkr"), "[undo]\non_error = \"skip\"\n").unwrap();
        let config = Config::load_from_repo(dir.path()).unwrap();
        assert_eq!(config.undo.on_error, OnError::Skip);
        assert_eq!(config.undo.base_ref, "HEAD");
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".shulkr"), "[undo\n").unwrap();
        let err = Config::load_from_repo(dir.path()).unwrap_err();
        assert!(matches!(err, ShulkrError::Config(_)));
    }

    #[test]
    fn extension_matching() {
        let undo = UndoConfig::default();
        assert!(undo.matches_extension("src/main/java/net/Foo.java"));
        assert!(!undo.matches_extension("src/main/resources/pack.mcmeta"));
        assert!(!undo.matches_extension("README"));
    }
}
