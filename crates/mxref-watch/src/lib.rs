//! mxref-watch: keeps the manifest index live.
//!
//! - **coordinator**: debounced single-writer actor and the `ManifestIndexService` façade
//! - **host**: file-system `ManifestHost`
//! - **watcher**: `notify`-based manifest watcher feeding the service

pub mod coordinator;
pub mod host;
pub mod watcher;

pub use coordinator::ManifestIndexService;
pub use host::{scan_manifests, FsHost};
pub use watcher::{is_manifest, should_ignore, ManifestWatcher, WatchEvent};
