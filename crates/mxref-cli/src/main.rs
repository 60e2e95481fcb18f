//! mxref-cli: CLI entry point for the mxref manifest cross-reference index.

mod commands_config;
mod commands_query;
mod commands_watch;

use clap::{Parser, Subcommand};
use mxref_core::{ManifestHost, MxrefConfig};
use mxref_watch::{FsHost, ManifestIndexService};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "mxref",
    about = "Cross-reference index over JSON task manifests"
)]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a `.mxref.toml` with the effective settings to the workspace root
    Init {
        /// Workspace root (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing workspace config
        #[arg(short, long)]
        force: bool,
    },

    /// Index every manifest in a workspace and print statistics
    Index {
        /// Workspace root (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Show every manifest reference to a file
    File {
        /// File path, absolute or relative to the workspace root
        file: String,

        /// Workspace root (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Show every manifest declaring an artifact
    Artifact {
        /// Exact artifact name
        name: String,

        /// Workspace root (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Show what a manifest supersedes and what supersedes it
    Chain {
        /// Manifest path, absolute or relative to the workspace root
        manifest: String,

        /// Workspace root (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Follow supersession edges transitively and report cycles
        #[arg(short, long)]
        transitive: bool,
    },

    /// Show everything indexed for one manifest
    Manifest {
        /// Manifest path, absolute or relative to the workspace root
        manifest: String,

        /// Workspace root (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Index a workspace and keep the index live as manifests change
    Watch {
        /// Workspace root (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing to stderr (stdout reserved for JSON output)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mxref=info".parse().expect("valid tracing directive")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Init { path, force } => {
            let root = workspace_root(path)?;
            commands_config::cmd_init(&root, force)?;
        }
        Commands::Index { path } => {
            let root = workspace_root(path)?;
            rt.block_on(commands_query::cmd_index(&root))?;
        }
        Commands::File { file, path } => {
            let root = workspace_root(path)?;
            rt.block_on(commands_query::cmd_file(&root, &file))?;
        }
        Commands::Artifact { name, path } => {
            let root = workspace_root(path)?;
            rt.block_on(commands_query::cmd_artifact(&root, &name))?;
        }
        Commands::Chain {
            manifest,
            path,
            transitive,
        } => {
            let root = workspace_root(path)?;
            rt.block_on(commands_query::cmd_chain(&root, &manifest, transitive))?;
        }
        Commands::Manifest { manifest, path } => {
            let root = workspace_root(path)?;
            rt.block_on(commands_query::cmd_manifest(&root, &manifest))?;
        }
        Commands::Watch { path } => {
            let root = workspace_root(path)?;
            rt.block_on(commands_watch::cmd_watch(&root))?;
        }
    }

    Ok(())
}

// ── Helpers (shared across modules) ────────────────────────────────────────

/// Absolute workspace root from `--path`, or the current directory.
fn workspace_root(path: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    let root = match path {
        Some(p) => p,
        None => std::env::current_dir()?,
    };
    if !root.is_dir() {
        anyhow::bail!("Not a directory: {}", root.display());
    }
    Ok(std::path::absolute(root)?)
}

/// Load the workspace config and run the initial build.
pub(crate) async fn open_service(
    root: &Path,
) -> anyhow::Result<(Arc<ManifestIndexService>, MxrefConfig)> {
    let config = MxrefConfig::load_for_workspace(root);
    let host: Arc<dyn ManifestHost> =
        Arc::new(FsHost::new(vec![root.to_path_buf()], config.index.clone()));
    let service = ManifestIndexService::initialize(host, &config).await;
    Ok((Arc::new(service), config))
}

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_index_command() {
        let cli = Cli::try_parse_from(["mxref", "index"]).unwrap();
        match cli.command {
            Commands::Index { path } => assert!(path.is_none()),
            _ => panic!("Expected Index command"),
        }
    }

    #[test]
    fn parse_file_with_path() {
        let cli =
            Cli::try_parse_from(["mxref", "file", "src/x.ts", "--path", "/tmp/ws"]).unwrap();
        match cli.command {
            Commands::File { file, path } => {
                assert_eq!(file, "src/x.ts");
                assert_eq!(path, Some(PathBuf::from("/tmp/ws")));
            }
            _ => panic!("Expected File command"),
        }
    }

    #[test]
    fn parse_chain_transitive() {
        let cli = Cli::try_parse_from(["mxref", "chain", "plans/a.manifest.json", "-t"]).unwrap();
        match cli.command {
            Commands::Chain {
                manifest,
                transitive,
                ..
            } => {
                assert_eq!(manifest, "plans/a.manifest.json");
                assert!(transitive);
            }
            _ => panic!("Expected Chain command"),
        }
    }

    #[test]
    fn parse_init_force() {
        let cli = Cli::try_parse_from(["mxref", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Init {
                path: None,
                force: true
            }
        ));
    }

    #[test]
    fn parse_artifact_requires_name() {
        assert!(Cli::try_parse_from(["mxref", "artifact"]).is_err());
    }

    #[test]
    fn parse_watch_command() {
        let cli = Cli::try_parse_from(["mxref", "watch", "-p", "."]).unwrap();
        assert!(matches!(cli.command, Commands::Watch { path: Some(_) }));
    }

    #[test]
    fn workspace_root_rejects_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(workspace_root(Some(file)).is_err());
        assert!(workspace_root(Some(dir.path().to_path_buf())).unwrap().is_absolute());
    }
}
