//! Debounced change coordinator and the service façade around it.
//!
//! One actor task owns every mutation of the index. Change notifications are
//! debounced per manifest; deletes apply immediately. Host reads and parsing
//! happen before the write lock is taken, so queries only ever wait for the
//! in-memory remove/re-insert/recompute step.

use mxref_core::{
    ArtifactReference, FileReference, IndexReport, IndexStats, LineageDirection,
    ManifestHost, ManifestIndexEntry, ManifestPath, MxrefConfig, MxrefError, SupersessionChain,
};
use mxref_index::{entry_from_text, ChangeDetector, CrossReferenceIndex, PathNormalizer};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

type SharedIndex = Arc<RwLock<CrossReferenceIndex>>;

enum Request {
    Changed(ManifestPath),
    Deleted(ManifestPath),
    Rebuild(oneshot::Sender<Result<IndexReport, MxrefError>>),
    Flush(oneshot::Sender<()>),
    Shutdown,
}

// ── Service ─────────────────────────────────────────────────────────────────

/// Live cross-reference index for one workspace.
///
/// Queries read a shared snapshot; every mutation is funnelled through the
/// coordinator task started by [`initialize`](Self::initialize).
pub struct ManifestIndexService {
    index: SharedIndex,
    sender: mpsc::UnboundedSender<Request>,
    task: Mutex<Option<JoinHandle<()>>>,
    max_lineage_depth: usize,
}

impl ManifestIndexService {
    /// Run the first full build and start the coordinator.
    ///
    /// Never fails: if the host cannot list manifests the service starts empty
    /// and fills in on the next `rebuild` or change notification. Must be
    /// called from within a tokio runtime.
    pub async fn initialize(host: Arc<dyn ManifestHost>, config: &MxrefConfig) -> Self {
        let normalizer = PathNormalizer::new(host.workspace_roots());
        let index: SharedIndex = Arc::new(RwLock::new(CrossReferenceIndex::new(
            normalizer.clone(),
        )));
        let (sender, receiver) = mpsc::unbounded_channel();

        let mut coordinator = Coordinator {
            host,
            index: Arc::clone(&index),
            normalizer,
            detector: ChangeDetector::new(),
            pending: HashMap::new(),
            debounce: Duration::from_millis(config.watch.debounce_ms),
            receiver,
        };
        if let Err(e) = coordinator.rebuild().await {
            tracing::error!("Initial build failed, starting with an empty index: {e}");
        }

        let task = tokio::spawn(coordinator.run());

        Self {
            index,
            sender,
            task: Mutex::new(Some(task)),
            max_lineage_depth: config.index.max_lineage_depth,
        }
    }

    // ── Notifications ───────────────────────────────────────────────────────

    /// A manifest's text changed. Re-indexed once the debounce period passes
    /// without further changes to the same manifest.
    pub fn notify_changed(&self, path: &str) -> Result<(), MxrefError> {
        self.send(Request::Changed(path.to_string()))
    }

    /// A manifest was created. Handled like a change.
    pub fn notify_created(&self, path: &str) -> Result<(), MxrefError> {
        self.notify_changed(path)
    }

    /// A manifest was deleted. Applied without debouncing.
    pub fn notify_deleted(&self, path: &str) -> Result<(), MxrefError> {
        self.send(Request::Deleted(path.to_string()))
    }

    /// Discard pending changes and rebuild from the host's current listing.
    pub async fn rebuild(&self) -> Result<IndexReport, MxrefError> {
        let (reply, response) = oneshot::channel();
        self.send(Request::Rebuild(reply))?;
        response.await.map_err(|_| MxrefError::Closed)?
    }

    /// Apply every pending change now and wait until all requests sent so far
    /// have been handled.
    pub async fn flush(&self) -> Result<(), MxrefError> {
        let (reply, response) = oneshot::channel();
        self.send(Request::Flush(reply))?;
        response.await.map_err(|_| MxrefError::Closed)
    }

    /// Stop the coordinator, dropping pending changes, and clear the index.
    pub async fn dispose(&self) -> Result<(), MxrefError> {
        let task = self
            .task
            .lock()
            .map_err(|e| MxrefError::LockPoisoned(e.to_string()))?
            .take();
        let Some(task) = task else {
            return Ok(());
        };

        // The coordinator may already be gone; the join below still applies.
        let _ = self.sender.send(Request::Shutdown);
        if let Err(e) = task.await {
            tracing::warn!("Coordinator task ended abnormally: {e}");
        }

        self.index
            .write()
            .map_err(|e| MxrefError::LockPoisoned(e.to_string()))?
            .clear();
        tracing::debug!("Manifest index disposed");
        Ok(())
    }

    /// Whether the coordinator has stopped accepting requests.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn send(&self, request: Request) -> Result<(), MxrefError> {
        self.sender.send(request).map_err(|_| MxrefError::Closed)
    }

    // ── Queries ─────────────────────────────────────────────────────────────

    fn read(&self) -> RwLockReadGuard<'_, CrossReferenceIndex> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn references_for_file(&self, path: &str) -> Vec<FileReference> {
        self.read().references_for_file(path)
    }

    pub fn references_for_artifact(&self, name: &str) -> Vec<ArtifactReference> {
        self.read().references_for_artifact(name)
    }

    pub fn supersession_chain(&self, path: &str) -> SupersessionChain {
        self.read().supersession_chain(path)
    }

    pub fn entry(&self, path: &str) -> Option<ManifestIndexEntry> {
        self.read().entry(path).cloned()
    }

    pub fn all_manifest_paths(&self) -> Vec<ManifestPath> {
        self.read().all_manifest_paths()
    }

    pub fn manifests_for_file(&self, path: &str) -> Vec<ManifestPath> {
        self.read().manifests_for_file(path)
    }

    pub fn artifact_names(&self) -> Vec<String> {
        self.read().artifact_names()
    }

    pub fn stats(&self) -> IndexStats {
        self.read().stats()
    }

    /// Transitive supersession walk bounded by the configured depth.
    pub fn lineage(&self, path: &str, direction: LineageDirection) -> Vec<ManifestPath> {
        self.read().lineage(path, direction, self.max_lineage_depth)
    }

    pub fn supersession_cycles(&self) -> Vec<Vec<ManifestPath>> {
        self.read().supersession_cycles()
    }
}

// ── Coordinator ─────────────────────────────────────────────────────────────

struct Coordinator {
    host: Arc<dyn ManifestHost>,
    index: SharedIndex,
    normalizer: PathNormalizer,
    detector: ChangeDetector,
    /// Manifests waiting for their debounce deadline.
    pending: HashMap<ManifestPath, Instant>,
    debounce: Duration,
    receiver: mpsc::UnboundedReceiver<Request>,
}

impl Coordinator {
    async fn run(mut self) {
        loop {
            let next_deadline = self.pending.values().min().copied();
            let deadline_passed = async {
                match next_deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                request = self.receiver.recv() => match request {
                    Some(Request::Shutdown) | None => break,
                    Some(request) => self.handle(request).await,
                },
                _ = deadline_passed => self.apply_due(Instant::now()).await,
            }
        }

        if !self.pending.is_empty() {
            tracing::debug!("Dropping {} pending manifest changes", self.pending.len());
        }
        self.receiver.close();
    }

    async fn handle(&mut self, request: Request) {
        match request {
            Request::Changed(path) => {
                let path = self.normalizer.resolve_query(&path);
                // Inserting over an existing deadline restarts that manifest's timer.
                self.pending.insert(path, Instant::now() + self.debounce);
            }
            Request::Deleted(path) => {
                let path = self.normalizer.resolve_query(&path);
                self.pending.remove(&path);
                if let Err(e) = self.apply_delete(&path) {
                    tracing::error!("Failed to remove {path}: {e}");
                }
            }
            Request::Rebuild(reply) => {
                let result = self.rebuild().await;
                if let Err(e) = &result {
                    tracing::error!("Rebuild failed, keeping previous index: {e}");
                }
                let _ = reply.send(result);
            }
            Request::Flush(reply) => {
                self.apply_due(Instant::now() + self.debounce).await;
                let _ = reply.send(());
            }
            Request::Shutdown => {}
        }
    }

    /// Apply every pending change whose deadline is at or before `cutoff`.
    async fn apply_due(&mut self, cutoff: Instant) {
        let mut due: Vec<ManifestPath> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= cutoff)
            .map(|(path, _)| path.clone())
            .collect();
        due.sort();

        for path in due {
            self.pending.remove(&path);
            if let Err(e) = self.apply_change(&path).await {
                tracing::error!("Failed to apply change to {path}: {e}");
            }
        }
    }

    async fn apply_change(&mut self, path: &str) -> Result<(), MxrefError> {
        let text = match self.host.read_document_text(path).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(manifest = %path, "Cannot read manifest, dropping it: {e}");
                return self.apply_delete(path);
            }
        };

        if !self.detector.is_changed(path, &text) && self.read_index().contains(path) {
            tracing::debug!(manifest = %path, "Content unchanged, skipping re-index");
            return Ok(());
        }

        match entry_from_text(path, &text, &self.normalizer) {
            Ok(entry) => {
                self.write_index()?.apply_entry(entry);
                self.detector.update_hash(path, &text);
                tracing::info!(manifest = %path, "Re-indexed manifest");
            }
            Err(e) => {
                self.detector.remove_hash(path);
                self.write_index()?.apply_delete(path);
                tracing::warn!(manifest = %path, "Dropping unparseable manifest: {e}");
            }
        }
        Ok(())
    }

    fn apply_delete(&mut self, path: &str) -> Result<(), MxrefError> {
        self.detector.remove_hash(path);
        if self.write_index()?.apply_delete(path) {
            tracing::info!(manifest = %path, "Removed manifest");
        }
        Ok(())
    }

    /// Read every manifest, build a fresh index off-lock, then swap it in.
    async fn rebuild(&mut self) -> Result<IndexReport, MxrefError> {
        self.pending.clear();

        let paths = self.host.list_manifest_documents().await?;
        let mut detector = ChangeDetector::new();
        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let text = self.host.read_document_text(&path).await;
            let key = self.normalizer.resolve_query(&path);
            if let Ok(text) = &text {
                detector.update_hash(&key, text);
            }
            documents.push((key, text));
        }

        let mut fresh = CrossReferenceIndex::new(self.normalizer.clone());
        let report = fresh.build_index(documents);
        detector.retain(|path| fresh.contains(path));

        *self.write_index()? = fresh;
        self.detector = detector;
        Ok(report)
    }

    fn read_index(&self) -> RwLockReadGuard<'_, CrossReferenceIndex> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_index(&self) -> Result<RwLockWriteGuard<'_, CrossReferenceIndex>, MxrefError> {
        self.index
            .write()
            .map_err(|e| MxrefError::LockPoisoned(e.to_string()))
    }
}
