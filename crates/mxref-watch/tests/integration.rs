//! Integration tests for mxref-watch: the service over a real directory tree.

use mxref_core::{FileReferenceCategory, LineageDirection, ManifestHost, MxrefConfig};
use mxref_watch::{FsHost, ManifestIndexService, ManifestWatcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

// ── Helpers ────────────────────────────────────────────────────────────────

fn write(root: &Path, relative: &str, text: &str) -> String {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, text).unwrap();
    normalized(&path)
}

fn normalized(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

async fn start(root: &Path) -> ManifestIndexService {
    start_with(root, &MxrefConfig::default()).await
}

async fn start_with(root: &Path, config: &MxrefConfig) -> ManifestIndexService {
    let host: Arc<dyn ManifestHost> =
        Arc::new(FsHost::new(vec![root.to_path_buf()], config.index.clone()));
    ManifestIndexService::initialize(host, config).await
}

/// Poll `condition` until it holds or ten seconds pass.
async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    condition()
}

fn seed(dir: &TempDir) -> (String, String) {
    let a = write(
        dir.path(),
        "plans/a.manifest.json",
        r#"{
  "goal": "first pass",
  "editableFiles": ["src/lib.rs"],
  "expectedArtifacts": [{"file": "src/lib.rs", "contains": [{"name": "run"}]}]
}"#,
    );
    let b = write(
        dir.path(),
        "plans/b.manifest.json",
        r#"{"supersedes": ["plans/a.manifest.json"], "readonlyFiles": ["src/lib.rs"]}"#,
    );
    write(
        dir.path(),
        "node_modules/dep/c.manifest.json",
        r#"{"editableFiles": ["src/lib.rs"]}"#,
    );
    (a, b)
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn initial_build_indexes_workspace_from_disk() {
    let dir = TempDir::new().unwrap();
    let (a, b) = seed(&dir);
    let service = start(dir.path()).await;

    assert_eq!(service.all_manifest_paths(), vec![a.clone(), b.clone()]);

    let lib = normalized(&dir.path().join("src/lib.rs"));
    let refs = service.references_for_file(&lib);
    let categories: Vec<_> = refs.iter().map(|r| r.category).collect();
    assert_eq!(
        categories,
        vec![
            FileReferenceCategory::Editable,
            FileReferenceCategory::ExpectedArtifact,
            FileReferenceCategory::Readonly,
        ]
    );
    assert_eq!(service.supersession_chain(&a).parents, vec![b.clone()]);
    assert_eq!(service.references_for_artifact("run")[0].manifest, a);

    service.dispose().await.unwrap();
}

#[tokio::test]
async fn edits_and_deletes_on_disk_flow_through_notifications() {
    let dir = TempDir::new().unwrap();
    let (a, b) = seed(&dir);
    let service = start(dir.path()).await;

    write(
        dir.path(),
        "plans/a.manifest.json",
        r#"{"editableFiles": ["src/main.rs"]}"#,
    );
    service.notify_changed(&a).unwrap();
    service.flush().await.unwrap();

    let main = normalized(&dir.path().join("src/main.rs"));
    assert_eq!(service.manifests_for_file(&main), vec![a.clone()]);
    assert!(service.references_for_artifact("run").is_empty());
    assert_eq!(service.supersession_chain(&a).parents, vec![b.clone()]);

    fs::remove_file(dir.path().join("plans/a.manifest.json")).unwrap();
    service.notify_deleted(&a).unwrap();
    service.flush().await.unwrap();

    assert!(service.entry(&a).is_none());
    assert!(service.supersession_chain(&b).children.is_empty());
    assert!(service.lineage(&b, LineageDirection::Descendants).is_empty());

    service.dispose().await.unwrap();
}

#[tokio::test]
async fn new_manifest_is_picked_up_on_create() {
    let dir = TempDir::new().unwrap();
    let (_, b) = seed(&dir);
    let service = start(dir.path()).await;

    let c = write(
        dir.path(),
        "plans/c.manifest.json",
        r#"{"supersedes": ["plans/b.manifest.json"]}"#,
    );
    service.notify_created(&c).unwrap();
    service.flush().await.unwrap();

    assert_eq!(service.stats().manifests, 3);
    assert_eq!(
        service.lineage(&c, LineageDirection::Descendants).len(),
        2,
        "c -> b -> a"
    );
    assert_eq!(service.supersession_chain(&b).parents, vec![c]);

    service.dispose().await.unwrap();
}

#[tokio::test]
async fn rebuild_picks_up_unnotified_changes() {
    let dir = TempDir::new().unwrap();
    seed(&dir);
    let service = start(dir.path()).await;

    fs::remove_dir_all(dir.path().join("plans")).unwrap();
    write(dir.path(), "other/d.manifest.json", "{}");

    let report = service.rebuild().await.unwrap();
    assert_eq!(report.scanned, 1);
    assert_eq!(report.indexed, 1);
    assert_eq!(service.stats().file_references, 0);

    service.dispose().await.unwrap();
}

#[tokio::test]
async fn missing_root_starts_an_empty_service() {
    let dir = TempDir::new().unwrap();
    let service = start(&dir.path().join("not-there")).await;

    assert!(!service.is_closed());
    assert!(service.all_manifest_paths().is_empty());

    service.dispose().await.unwrap();
}

// ── Watcher ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn watcher_feeds_disk_changes_into_the_service() {
    let dir = TempDir::new().unwrap();
    let (a, b) = seed(&dir);

    let mut config = MxrefConfig::default();
    config.watch.debounce_ms = 50;
    let service = Arc::new(start_with(dir.path(), &config).await);
    assert_eq!(service.all_manifest_paths(), vec![a.clone(), b.clone()]);

    let watcher = ManifestWatcher::new(&[PathBuf::from(dir.path())], &config).unwrap();
    let forwarder = watcher.forward_to(Arc::clone(&service));

    // Created
    let c = write(
        dir.path(),
        "plans/c.manifest.json",
        r#"{"supersedes": ["plans/b.manifest.json"], "editableFiles": ["src/new.rs"]}"#,
    );
    assert!(
        eventually(|| service.entry(&c).is_some()).await,
        "created manifest was never indexed"
    );
    assert_eq!(service.supersession_chain(&b).parents, vec![c.clone()]);

    // Changed
    write(
        dir.path(),
        "plans/a.manifest.json",
        r#"{"editableFiles": ["src/main.rs"]}"#,
    );
    let main = normalized(&dir.path().join("src/main.rs"));
    assert!(
        eventually(|| service.manifests_for_file(&main) == vec![a.clone()]).await,
        "edited manifest was never re-indexed"
    );
    assert!(service.references_for_artifact("run").is_empty());

    // Manifests under ignored directories never reach the index.
    let ignored = write(
        dir.path(),
        "node_modules/dep/d.manifest.json",
        r#"{"editableFiles": ["src/ignored.rs"]}"#,
    );

    // Deleted
    fs::remove_file(dir.path().join("plans/c.manifest.json")).unwrap();
    assert!(
        eventually(|| service.entry(&c).is_none()).await,
        "deleted manifest was never removed"
    );
    assert!(service.supersession_chain(&b).parents.is_empty());

    service.flush().await.unwrap();
    assert!(service.entry(&ignored).is_none());
    let ignored_file = normalized(&dir.path().join("src/ignored.rs"));
    assert!(service.references_for_file(&ignored_file).is_empty());
    assert_eq!(service.all_manifest_paths(), vec![a, b]);

    service.dispose().await.unwrap();
    forwarder.await.unwrap();
    drop(watcher);
}
