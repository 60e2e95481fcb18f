//! SHA-256 based change detection for incremental re-indexing.
//!
//! Tracks the content hash of each manifest as last indexed so that change
//! notifications carrying identical text (a save without edits, a touch) can
//! skip the remove/re-insert/recompute cycle.

use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Tracks manifest content hashes for incremental change detection.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    /// Map of manifest path -> SHA-256 hex hash of the last indexed text.
    known_hashes: HashMap<String, String>,
}

impl ChangeDetector {
    /// Create a new empty ChangeDetector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the manifest is new or its content hash differs.
    pub fn is_changed(&self, path: &str, content: &str) -> bool {
        let hash = Self::hash_content(content);
        self.known_hashes.get(path) != Some(&hash)
    }

    /// Record the hash after the manifest was successfully indexed.
    pub fn update_hash(&mut self, path: &str, content: &str) {
        let hash = Self::hash_content(content);
        self.known_hashes.insert(path.to_string(), hash);
    }

    /// Forget a manifest (deleted, or failed to parse).
    pub fn remove_hash(&mut self, path: &str) {
        self.known_hashes.remove(path);
    }

    /// Keep only the manifests for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.known_hashes.retain(|path, _| keep(path));
    }

    fn hash_content(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
