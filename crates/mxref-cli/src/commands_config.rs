//! `mxref init`: write a workspace config.

use mxref_core::{MxrefConfig, WORKSPACE_CONFIG_FILE};
use std::path::Path;

pub(crate) fn cmd_init(root: &Path, force: bool) -> anyhow::Result<()> {
    let config_path = root.join(WORKSPACE_CONFIG_FILE);
    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    // Start from whatever the workspace resolves to today.
    let config = MxrefConfig::load_for_workspace(root);
    config.save(&config_path)?;
    eprintln!("Wrote {}", config_path.display());
    Ok(())
}
