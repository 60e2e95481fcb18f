//! Live re-indexing.

use mxref_watch::ManifestWatcher;
use std::path::Path;

pub(crate) async fn cmd_watch(root: &Path) -> anyhow::Result<()> {
    let (service, config) = crate::open_service(root).await?;
    let stats = service.stats();
    eprintln!(
        "Indexed {} manifests ({} file references, {} artifacts)",
        stats.manifests, stats.file_references, stats.artifact_references
    );

    let watcher = ManifestWatcher::new(&[root.to_path_buf()], &config)?;
    let forwarder = watcher.forward_to(service.clone());
    eprintln!("Watching {} for manifest changes (Ctrl+C to stop)", root.display());

    tokio::signal::ctrl_c().await?;

    service.dispose().await?;
    forwarder.await?;
    drop(watcher);
    Ok(())
}
