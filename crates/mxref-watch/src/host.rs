//! File-system backed [`ManifestHost`].

use async_trait::async_trait;
use mxref_core::{IndexConfig, ManifestHost, ManifestPath, MxrefError};
use std::path::{Path, PathBuf};

/// Reads manifests straight from disk under a set of workspace roots.
#[derive(Debug, Clone)]
pub struct FsHost {
    roots: Vec<PathBuf>,
    config: IndexConfig,
}

impl FsHost {
    pub fn new(roots: Vec<PathBuf>, config: IndexConfig) -> Self {
        Self { roots, config }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }
}

#[async_trait]
impl ManifestHost for FsHost {
    async fn list_manifest_documents(&self) -> Result<Vec<ManifestPath>, MxrefError> {
        let roots = self.roots.clone();
        let config = self.config.clone();
        let paths = tokio::task::spawn_blocking(move || {
            roots
                .iter()
                .flat_map(|root| scan_manifests(root, &config))
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| MxrefError::Host(format!("manifest scan failed: {e}")))?;

        Ok(paths
            .into_iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect())
    }

    async fn read_document_text(&self, path: &str) -> Result<String, MxrefError> {
        Ok(tokio::fs::read_to_string(path).await?)
    }

    fn workspace_roots(&self) -> Vec<PathBuf> {
        self.roots.clone()
    }
}

/// Every manifest under `root`, skipping ignored directories.
///
/// Unreadable directories are logged and skipped.
pub fn scan_manifests(root: &Path, config: &IndexConfig) -> Vec<PathBuf> {
    let walker = walkdir::WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() > 0 && entry.file_type().is_dir() {
                return !config.is_ignored_dir(&entry.file_name().to_string_lossy());
            }
            true
        });

    let mut manifests = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable path under {}: {e}", root.display());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let is_manifest = entry
            .file_name()
            .to_str()
            .is_some_and(|name| config.is_manifest_name(name));
        if is_manifest {
            manifests.push(entry.into_path());
        }
    }
    manifests.sort();
    manifests
}
