//! The cross-reference index.
//!
//! Owns every manifest entry plus the two global reverse maps (file -> file
//! references, artifact name -> artifact references). All mutation goes through
//! [`CrossReferenceIndex::build_index`], [`CrossReferenceIndex::index_document`],
//! [`CrossReferenceIndex::apply_entry`] and [`CrossReferenceIndex::remove`], which keep the reverse maps equal to
//! the union of the entries and the `superseded_by` lists symmetric with the
//! `supersedes` lists.

use crate::entry::entry_from_text;
use crate::paths::PathNormalizer;
use mxref_core::{
    ArtifactReference, FileReference, IndexReport, IndexStats, ManifestIndexEntry, ManifestPath,
    MxrefError, SupersessionChain,
};
use std::collections::HashMap;
use std::path::PathBuf;

/// In-memory cross-reference index over a workspace's manifests.
#[derive(Debug, Default)]
pub struct CrossReferenceIndex {
    pub(crate) normalizer: PathNormalizer,
    pub(crate) entries: HashMap<ManifestPath, ManifestIndexEntry>,
    /// Resolved file path -> references from every entry.
    pub(crate) file_index: HashMap<String, Vec<FileReference>>,
    /// Artifact name -> declarations from every entry.
    pub(crate) artifact_index: HashMap<String, Vec<ArtifactReference>>,
}

impl CrossReferenceIndex {
    /// Create an empty index that resolves paths with `normalizer`.
    pub fn new(normalizer: PathNormalizer) -> Self {
        Self {
            normalizer,
            ..Default::default()
        }
    }

    /// Create an empty index for the given workspace roots.
    pub fn with_roots(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self::new(PathNormalizer::new(roots))
    }

    pub fn normalizer(&self) -> &PathNormalizer {
        &self.normalizer
    }

    /// Canonical key for a manifest path given by a caller.
    pub(crate) fn manifest_key(&self, path: &str) -> ManifestPath {
        self.normalizer.resolve_query(path)
    }

    // ── Mutation ────────────────────────────────────────────────────────────

    /// Rebuild from scratch.
    ///
    /// Each document is `(path, text)`, where the text may be a host read
    /// error. Documents that cannot be read or parsed are skipped and logged;
    /// they never abort the build. Documents are indexed in path order so that
    /// rebuilding an unchanged corpus yields identical results.
    pub fn build_index<I>(&mut self, documents: I) -> IndexReport
    where
        I: IntoIterator<Item = (ManifestPath, Result<String, MxrefError>)>,
    {
        self.clear();

        let mut documents: Vec<(ManifestPath, Result<String, MxrefError>)> = documents
            .into_iter()
            .map(|(path, text)| (self.manifest_key(&path), text))
            .collect();
        documents.sort_by(|a, b| a.0.cmp(&b.0));
        documents.dedup_by(|a, b| a.0 == b.0);

        let mut report = IndexReport {
            scanned: documents.len(),
            ..Default::default()
        };

        for (path, text) in documents {
            match text.and_then(|text| self.index_document(&path, &text)) {
                Ok(()) => report.indexed += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(manifest = %path, "Skipping manifest: {e}");
                }
            }
        }

        self.recompute_superseded_by();

        report.file_references = self.file_index.values().map(Vec::len).sum();
        report.artifact_references = self.artifact_index.values().map(Vec::len).sum();

        tracing::info!(
            "Indexed manifests: {} scanned, {} indexed, {} failed, {} file references, {} artifact references",
            report.scanned,
            report.indexed,
            report.failed,
            report.file_references,
            report.artifact_references,
        );

        report
    }

    /// Parse `text` and insert it as the entry for `path`, replacing any
    /// previous entry and merging its references into the global maps.
    ///
    /// Does not touch other entries' `superseded_by`; run
    /// [`recompute_superseded_by`](Self::recompute_superseded_by) afterwards,
    /// or use [`apply_change`](Self::apply_change). On parse failure the
    /// previous entry is gone and nothing is inserted.
    pub fn index_document(&mut self, path: &str, text: &str) -> Result<(), MxrefError> {
        let path = self.manifest_key(path);
        self.remove(&path);

        let entry = entry_from_text(&path, text, &self.normalizer)?;

        tracing::debug!(
            manifest = %path,
            "Indexed {} file references, {} artifacts",
            entry.file_reference_count(),
            entry.artifact_reference_count(),
        );

        self.insert_entry(entry);
        Ok(())
    }

    fn insert_entry(&mut self, entry: ManifestIndexEntry) {
        for (file, references) in &entry.referenced_files {
            self.file_index
                .entry(file.clone())
                .or_default()
                .extend(references.iter().cloned());
        }
        for (name, references) in &entry.artifacts {
            self.artifact_index
                .entry(name.clone())
                .or_default()
                .extend(references.iter().cloned());
        }
        self.entries.insert(entry.path.clone(), entry);
    }

    /// Remove a manifest and every reference it owns. No-op if absent.
    ///
    /// Only shrinks the supersession edge set, so the targets' `superseded_by`
    /// lists are patched in place instead of recomputed.
    pub fn remove(&mut self, path: &str) -> Option<ManifestIndexEntry> {
        let key = self.manifest_key(path);
        let entry = self.entries.remove(&key)?;

        for file in entry.referenced_files.keys() {
            strip_bucket(&mut self.file_index, file, |r| r.manifest == key);
        }
        for name in entry.artifacts.keys() {
            strip_bucket(&mut self.artifact_index, name, |r| r.manifest == key);
        }
        for target in &entry.supersedes {
            if let Some(target_entry) = self.entries.get_mut(target) {
                target_entry.superseded_by.retain(|p| p != &key);
            }
        }

        Some(entry)
    }

    /// Rebuild every `superseded_by` list from the `supersedes` lists.
    pub fn recompute_superseded_by(&mut self) {
        for entry in self.entries.values_mut() {
            entry.superseded_by.clear();
        }

        let edges: Vec<(ManifestPath, ManifestPath)> = self
            .entries
            .values()
            .flat_map(|e| e.supersedes.iter().map(|t| (e.path.clone(), t.clone())))
            .collect();

        for (source, target) in edges {
            if let Some(target_entry) = self.entries.get_mut(&target) {
                target_entry.superseded_by.push(source);
            }
        }

        for entry in self.entries.values_mut() {
            entry.superseded_by.sort();
            entry.superseded_by.dedup();
        }
    }

    /// Handle a create/change notification: remove, re-index, recompute.
    ///
    /// A new `supersedes` list can affect any other entry's `superseded_by`,
    /// so the full recompute runs after every successful re-index.
    pub fn apply_change(&mut self, path: &str, text: &str) -> Result<(), MxrefError> {
        let key = self.manifest_key(path);
        match entry_from_text(&key, text, &self.normalizer) {
            Ok(entry) => {
                self.apply_entry(entry);
                Ok(())
            }
            Err(e) => {
                self.remove(&key);
                Err(e)
            }
        }
    }

    /// Replace the entry at `entry.path` with an entry built ahead of time by
    /// [`entry_from_text`], then recompute `superseded_by`.
    pub fn apply_entry(&mut self, entry: ManifestIndexEntry) {
        self.remove(&entry.path);
        self.insert_entry(entry);
        self.recompute_superseded_by();
    }

    /// Handle a delete notification. Returns whether an entry was removed.
    pub fn apply_delete(&mut self, path: &str) -> bool {
        self.remove(path).is_some()
    }

    /// Drop all entries and references.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.file_index.clear();
        self.artifact_index.clear();
    }

    // ── Queries ─────────────────────────────────────────────────────────────

    /// All references to `path`, grouped by owning manifest.
    pub fn references_for_file(&self, path: &str) -> Vec<FileReference> {
        let key = self.normalizer.resolve_query(path);
        let mut references = self.file_index.get(&key).cloned().unwrap_or_default();
        references.sort_by(|a, b| a.manifest.cmp(&b.manifest));
        references
    }

    /// All declarations of an artifact named exactly `name`.
    pub fn references_for_artifact(&self, name: &str) -> Vec<ArtifactReference> {
        let mut references = self.artifact_index.get(name).cloned().unwrap_or_default();
        references.sort_by(|a, b| a.manifest.cmp(&b.manifest));
        references
    }

    /// One-hop supersession neighbourhood, restricted to indexed manifests.
    pub fn supersession_chain(&self, path: &str) -> SupersessionChain {
        let Some(entry) = self.entry(path) else {
            return SupersessionChain::default();
        };
        SupersessionChain {
            parents: entry
                .superseded_by
                .iter()
                .filter(|p| self.entries.contains_key(*p))
                .cloned()
                .collect(),
            children: entry
                .supersedes
                .iter()
                .filter(|p| self.entries.contains_key(*p))
                .cloned()
                .collect(),
        }
    }

    pub fn entry(&self, path: &str) -> Option<&ManifestIndexEntry> {
        self.entries.get(&self.manifest_key(path))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(&self.manifest_key(path))
    }

    /// Every indexed manifest, sorted.
    pub fn all_manifest_paths(&self) -> Vec<ManifestPath> {
        let mut paths: Vec<ManifestPath> = self.entries.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Distinct manifests referencing `path` in any category, sorted.
    pub fn manifests_for_file(&self, path: &str) -> Vec<ManifestPath> {
        let mut manifests: Vec<ManifestPath> = self
            .references_for_file(path)
            .into_iter()
            .map(|r| r.manifest)
            .collect();
        manifests.dedup();
        manifests
    }

    /// Every artifact name declared by any manifest, sorted.
    pub fn artifact_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.artifact_index.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            manifests: self.entries.len(),
            files: self.file_index.len(),
            artifact_names: self.artifact_index.len(),
            file_references: self.file_index.values().map(Vec::len).sum(),
            artifact_references: self.artifact_index.values().map(Vec::len).sum(),
            supersession_edges: self.entries.values().map(|e| e.superseded_by.len()).sum(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Drop the references matching `owned` from one bucket, and the bucket
/// itself once empty.
fn strip_bucket<T>(index: &mut HashMap<String, Vec<T>>, key: &str, owned: impl Fn(&T) -> bool) {
    if let Some(bucket) = index.get_mut(key) {
        bucket.retain(|r| !owned(r));
        if bucket.is_empty() {
            index.remove(key);
        }
    }
}
