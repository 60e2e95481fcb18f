//! File-system watcher for manifest documents.
//!
//! Uses `notify` with a short raw-event debounce and forwards manifest
//! creations, changes, and deletions. The longer per-manifest debounce lives in
//! the coordinator.

use crate::coordinator::ManifestIndexService;
use crate::host::scan_manifests;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use mxref_core::{IndexConfig, MxrefConfig, MxrefError};
use notify::Watcher;
use notify_debouncer_mini::{new_debouncer, DebouncedEvent};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Events emitted by the manifest watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Created(PathBuf),
    Changed(PathBuf),
    Deleted(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::Created(p) | WatchEvent::Changed(p) | WatchEvent::Deleted(p) => p,
        }
    }
}

/// Check if a path is inside an ignored directory.
pub fn should_ignore(path: &Path, config: &IndexConfig) -> bool {
    path.components().any(|component| match component {
        Component::Normal(name) => name.to_str().is_some_and(|n| config.is_ignored_dir(n)),
        _ => false,
    })
}

/// Check if a path names a manifest document.
pub fn is_manifest(path: &Path, config: &IndexConfig) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| config.is_manifest_name(name))
}

/// Turn one debounced path into an event, tracking which manifests exist.
fn classify(path: PathBuf, exists: bool, known: &mut HashSet<PathBuf>) -> WatchEvent {
    if !exists {
        known.remove(&path);
        WatchEvent::Deleted(path)
    } else if known.insert(path.clone()) {
        WatchEvent::Created(path)
    } else {
        WatchEvent::Changed(path)
    }
}

/// Watches workspace roots for manifest changes.
pub struct ManifestWatcher {
    _debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
    receiver: Receiver<WatchEvent>,
}

impl ManifestWatcher {
    /// Start watching every root recursively.
    pub fn new(roots: &[PathBuf], config: &MxrefConfig) -> Result<Self, MxrefError> {
        let (tx, rx) = crossbeam_channel::unbounded::<WatchEvent>();
        let index_config = config.index.clone();
        let watched_roots = roots.to_vec();

        let mut known: HashSet<PathBuf> = roots
            .iter()
            .flat_map(|root| scan_manifests(root, &index_config))
            .collect();

        let mut debouncer = new_debouncer(
            Duration::from_millis(config.watch.fs_debounce_ms),
            move |res: Result<Vec<DebouncedEvent>, notify::Error>| match res {
                Ok(events) => {
                    let mut seen = HashSet::new();
                    for event in events {
                        let path = event.path;
                        if !seen.insert(path.clone()) {
                            continue;
                        }
                        // Only directories below a root count toward ignores.
                        let relative = watched_roots
                            .iter()
                            .find_map(|root| path.strip_prefix(root).ok())
                            .unwrap_or(&path);
                        if should_ignore(relative, &index_config)
                            || !is_manifest(&path, &index_config)
                        {
                            continue;
                        }
                        let exists = path.is_file();
                        let _ = tx.send(classify(path, exists, &mut known));
                    }
                }
                Err(e) => {
                    tracing::error!("Watch error: {e}");
                }
            },
        )
        .map_err(|e| MxrefError::Watch(format!("Failed to create debouncer: {e}")))?;

        for root in roots {
            debouncer
                .watcher()
                .watch(root, notify::RecursiveMode::Recursive)
                .map_err(|e| MxrefError::Watch(format!("Failed to watch {}: {e}", root.display())))?;
            tracing::info!("Watching {} for manifest changes", root.display());
        }

        Ok(Self {
            _debouncer: debouncer,
            receiver: rx,
        })
    }

    /// Get the receiver for watch events.
    pub fn receiver(&self) -> &Receiver<WatchEvent> {
        &self.receiver
    }

    /// Feed every event into `service` on a blocking worker until the service
    /// is disposed or the watcher is dropped. The watcher must outlive the
    /// returned task.
    pub fn forward_to(&self, service: Arc<ManifestIndexService>) -> tokio::task::JoinHandle<()> {
        let receiver = self.receiver.clone();
        tokio::task::spawn_blocking(move || loop {
            let event = match receiver.recv_timeout(Duration::from_millis(250)) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) if !service.is_closed() => continue,
                Err(_) => break,
            };

            let path = event.path().to_string_lossy().into_owned();
            tracing::debug!("{event:?}");
            let result = match event {
                WatchEvent::Created(_) => service.notify_created(&path),
                WatchEvent::Changed(_) => service.notify_changed(&path),
                WatchEvent::Deleted(_) => service.notify_deleted(&path),
            };
            if result.is_err() {
                break;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_ignore() {
        let config = IndexConfig::default();
        assert!(should_ignore(
            Path::new("project/node_modules/pkg/a.manifest.json"),
            &config
        ));
        assert!(should_ignore(Path::new(".git/a.manifest.json"), &config));
        assert!(!should_ignore(Path::new("plans/a.manifest.json"), &config));
    }

    #[test]
    fn test_is_manifest() {
        let config = IndexConfig::default();
        assert!(is_manifest(Path::new("plans/task-1.manifest.json"), &config));
        assert!(!is_manifest(Path::new("plans/package.json"), &config));
        assert!(!is_manifest(Path::new("plans/.manifest.json"), &config));
    }

    #[test]
    fn classify_tracks_existence() {
        let mut known = HashSet::new();
        let path = PathBuf::from("/ws/a.manifest.json");

        assert_eq!(
            classify(path.clone(), true, &mut known),
            WatchEvent::Created(path.clone())
        );
        assert_eq!(
            classify(path.clone(), true, &mut known),
            WatchEvent::Changed(path.clone())
        );
        assert_eq!(
            classify(path.clone(), false, &mut known),
            WatchEvent::Deleted(path.clone())
        );
        assert_eq!(
            classify(path.clone(), true, &mut known),
            WatchEvent::Created(path)
        );
    }
}
