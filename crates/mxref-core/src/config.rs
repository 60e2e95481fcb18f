//! Persistent configuration for mxref.
//!
//! Loads/saves a TOML config at `~/.mxref/config.toml`, or `.mxref.toml` at a
//! workspace root.

use crate::MxrefError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the per-workspace config.
pub const WORKSPACE_CONFIG_FILE: &str = ".mxref.toml";

/// Top-level mxref configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MxrefConfig {
    pub index: IndexConfig,
    pub watch: WatchConfig,
}

impl MxrefConfig {
    /// Load configuration from the given path.
    pub fn load(path: &Path) -> Result<Self, MxrefError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| MxrefError::Config(e.to_string()))
    }

    /// Save configuration to the given path.
    pub fn save(&self, path: &Path) -> Result<(), MxrefError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| MxrefError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from the default path, or return defaults if the file doesn't exist.
    pub fn load_or_default() -> Self {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path).unwrap_or_default()
        } else {
            Self::default()
        }
    }

    /// Prefer `<root>/.mxref.toml`, then the user config, then defaults.
    pub fn load_for_workspace(root: &Path) -> Self {
        let local = root.join(WORKSPACE_CONFIG_FILE);
        if local.exists() {
            match Self::load(&local) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Ignoring invalid config {}: {e}", local.display());
                }
            }
        }
        Self::load_or_default()
    }

    /// Default config path: `~/.mxref/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".mxref")
            .join("config.toml")
    }
}

/// What counts as a manifest and how lineage walks are bounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// File-name suffix identifying manifest documents.
    pub manifest_suffix: String,
    /// Directory names never descended into when listing manifests.
    pub ignore_dirs: Vec<String>,
    /// Maximum hops followed by transitive supersession walks.
    pub max_lineage_depth: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            manifest_suffix: ".manifest.json".to_string(),
            ignore_dirs: [
                "node_modules",
                ".git",
                "target",
                "dist",
                "build",
                ".venv",
                "venv",
                "__pycache__",
                "vendor",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            max_lineage_depth: 32,
        }
    }
}

impl IndexConfig {
    /// Whether `file_name` follows the manifest naming convention.
    pub fn is_manifest_name(&self, file_name: &str) -> bool {
        file_name.ends_with(&self.manifest_suffix) && file_name.len() > self.manifest_suffix.len()
    }

    /// Whether a directory with this name is skipped.
    pub fn is_ignored_dir(&self, dir_name: &str) -> bool {
        self.ignore_dirs.iter().any(|d| d == dir_name)
    }
}

/// Debounce timings for change notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Quiet period before a changed manifest is re-indexed.
    pub debounce_ms: u64,
    /// Debounce applied to raw file-system events by the watcher.
    pub fs_debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            fs_debounce_ms: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrips_through_toml() {
        let config = MxrefConfig::default();
        let toml_str =
            toml::to_string_pretty(&config).expect("default config should serialize to TOML");
        let parsed: MxrefConfig =
            toml::from_str(&toml_str).expect("serialized TOML should parse back");
        assert_eq!(parsed, config);
        assert_eq!(parsed.watch.debounce_ms, 500);
        assert_eq!(parsed.index.manifest_suffix, ".manifest.json");
    }

    #[test]
    fn load_nonexistent_returns_error() {
        let result = MxrefConfig::load(Path::new("/tmp/nonexistent_mxref_config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = MxrefConfig::default();
        config.watch.debounce_ms = 250;
        config.index.max_lineage_depth = 4;

        config.save(&path).expect("save should succeed");
        let loaded = MxrefConfig::load(&path).expect("load should succeed");

        assert_eq!(loaded.watch.debounce_ms, 250);
        assert_eq!(loaded.index.max_lineage_depth, 4);
    }

    #[test]
    fn partial_toml_uses_defaults_for_missing_fields() {
        let partial = r#"
[watch]
debounce_ms = 100
"#;
        let config: MxrefConfig = toml::from_str(partial).expect("partial TOML should parse");
        assert_eq!(config.watch.debounce_ms, 100);
        assert_eq!(config.watch.fs_debounce_ms, 50);
        assert_eq!(config.index.max_lineage_depth, 32);
    }

    #[test]
    fn workspace_config_takes_precedence() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(WORKSPACE_CONFIG_FILE),
            "[index]\nmanifest_suffix = \".plan.json\"\n",
        )
        .unwrap();

        let config = MxrefConfig::load_for_workspace(dir.path());
        assert_eq!(config.index.manifest_suffix, ".plan.json");
        assert!(config.index.is_manifest_name("task-1.plan.json"));
        assert!(!config.index.is_manifest_name("task-1.manifest.json"));
    }

    #[test]
    fn manifest_name_requires_a_stem() {
        let config = IndexConfig::default();
        assert!(config.is_manifest_name("task-001.manifest.json"));
        assert!(!config.is_manifest_name(".manifest.json"));
        assert!(!config.is_manifest_name("package.json"));
        assert!(config.is_ignored_dir("node_modules"));
        assert!(!config.is_ignored_dir("src"));
    }
}
