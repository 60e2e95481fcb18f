//! mxref-index: cross-reference index over JSON manifest documents.
//!
//! Parses manifests with the error-recovering tree-sitter JSON grammar,
//! resolves every referenced path to one canonical key, and maintains reverse
//! maps from files and artifact names back to the manifests that mention them,
//! together with the bidirectional supersession graph.
//!
//! # Architecture
//!
//! - **parser**: Tree-sitter parsing of one manifest into raw references
//! - **locator**: Byte offset to line/column conversion
//! - **paths**: Path normalization against workspace roots
//! - **entry**: Builds a per-manifest index entry from a parse result
//! - **index**: The cross-reference index: build, incremental update, queries
//! - **lineage**: Transitive supersession traversal and cycle detection
//! - **incremental**: SHA-256 based change detection

pub mod entry;
pub mod incremental;
pub mod index;
pub mod lineage;
pub mod locator;
pub mod parser;
pub mod paths;

pub use entry::{build_entry, entry_from_text};
pub use incremental::ChangeDetector;
pub use index::CrossReferenceIndex;
pub use locator::{LineIndex, Position};
pub use parser::{parse_manifest, ParseFailure, ParsedManifest, RawArtifact, RawFileReference};
pub use paths::PathNormalizer;
