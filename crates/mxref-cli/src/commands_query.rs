//! One-shot index and query commands.

use mxref_core::{IndexStats, LineageDirection, ManifestPath, SupersessionChain};
use serde::Serialize;
use std::path::Path;

pub(crate) async fn cmd_index(root: &Path) -> anyhow::Result<()> {
    let (service, _) = crate::open_service(root).await?;
    let stats = service.stats();
    let cycles = service.supersession_cycles();
    for cycle in &cycles {
        tracing::warn!("Supersession cycle: {}", cycle.join(" -> "));
    }

    #[derive(Serialize)]
    struct IndexOutput {
        #[serde(flatten)]
        stats: IndexStats,
        cycles: Vec<Vec<ManifestPath>>,
    }
    crate::print_json(&IndexOutput { stats, cycles })?;

    service.dispose().await?;
    Ok(())
}

pub(crate) async fn cmd_file(root: &Path, file: &str) -> anyhow::Result<()> {
    let (service, _) = crate::open_service(root).await?;
    crate::print_json(&service.references_for_file(file))?;
    service.dispose().await?;
    Ok(())
}

pub(crate) async fn cmd_artifact(root: &Path, name: &str) -> anyhow::Result<()> {
    let (service, _) = crate::open_service(root).await?;
    crate::print_json(&service.references_for_artifact(name))?;
    service.dispose().await?;
    Ok(())
}

pub(crate) async fn cmd_chain(root: &Path, manifest: &str, transitive: bool) -> anyhow::Result<()> {
    let (service, _) = crate::open_service(root).await?;
    if service.entry(manifest).is_none() {
        tracing::warn!("{manifest} is not an indexed manifest");
    }

    if transitive {
        #[derive(Serialize)]
        struct LineageOutput {
            ancestors: Vec<ManifestPath>,
            descendants: Vec<ManifestPath>,
            cycles: Vec<Vec<ManifestPath>>,
        }
        let output = LineageOutput {
            ancestors: service.lineage(manifest, LineageDirection::Ancestors),
            descendants: service.lineage(manifest, LineageDirection::Descendants),
            cycles: service.supersession_cycles(),
        };
        crate::print_json(&output)?;
    } else {
        let chain: SupersessionChain = service.supersession_chain(manifest);
        crate::print_json(&chain)?;
    }

    service.dispose().await?;
    Ok(())
}

pub(crate) async fn cmd_manifest(root: &Path, manifest: &str) -> anyhow::Result<()> {
    let (service, _) = crate::open_service(root).await?;
    let entry = service.entry(manifest);
    service.dispose().await?;

    match entry {
        Some(entry) => crate::print_json(&entry),
        None => anyhow::bail!("Manifest not indexed: {manifest}"),
    }
}
