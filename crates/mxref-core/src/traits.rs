use async_trait::async_trait;
use std::path::PathBuf;

use crate::{ManifestPath, MxrefError};

// ── Traits ──────────────────────────────────────────────────────────────────

/// Environment the index reads manifests from.
///
/// The index never touches the file system itself: listing and reading are
/// delegated here and awaited outside of any index lock.
#[async_trait]
pub trait ManifestHost: Send + Sync {
    /// Enumerate every manifest document in the workspace.
    async fn list_manifest_documents(&self) -> Result<Vec<ManifestPath>, MxrefError>;

    /// Fetch the current text of a manifest.
    async fn read_document_text(&self, path: &str) -> Result<String, MxrefError>;

    /// Workspace roots that relative manifest paths resolve against.
    fn workspace_roots(&self) -> Vec<PathBuf>;
}
