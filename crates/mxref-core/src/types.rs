use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::MxrefError;

/// Normalized absolute path of a manifest document (forward slashes).
///
/// Used as the primary key for entries everywhere in the index.
pub type ManifestPath = String;

// ── File References ─────────────────────────────────────────────────────────

/// How a manifest refers to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileReferenceCategory {
    /// Listed in `creatableFiles`.
    Creatable,
    /// Listed in `editableFiles`.
    Editable,
    /// Listed in `readonlyFiles`.
    Readonly,
    /// Listed in `supersedes` (the referenced file is another manifest).
    Supersedes,
    /// The `file` of an `expectedArtifacts` element.
    ExpectedArtifact,
}

impl FileReferenceCategory {
    /// The manifest key holding a plain array of paths for this category.
    ///
    /// `ExpectedArtifact` has no such key; its paths live inside objects.
    pub fn array_key(&self) -> Option<&'static str> {
        match self {
            Self::Creatable => Some("creatableFiles"),
            Self::Editable => Some("editableFiles"),
            Self::Readonly => Some("readonlyFiles"),
            Self::Supersedes => Some("supersedes"),
            Self::ExpectedArtifact => None,
        }
    }
}

impl std::fmt::Display for FileReferenceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Creatable => write!(f, "creatable"),
            Self::Editable => write!(f, "editable"),
            Self::Readonly => write!(f, "readonly"),
            Self::Supersedes => write!(f, "supersedes"),
            Self::ExpectedArtifact => write!(f, "expectedArtifact"),
        }
    }
}

impl std::str::FromStr for FileReferenceCategory {
    type Err = MxrefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "creatable" => Ok(Self::Creatable),
            "editable" => Ok(Self::Editable),
            "readonly" => Ok(Self::Readonly),
            "supersedes" => Ok(Self::Supersedes),
            "expectedArtifact" => Ok(Self::ExpectedArtifact),
            _ => Err(MxrefError::Config(format!("unknown file reference category: {s}"))),
        }
    }
}

/// One reference from a manifest to a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReference {
    /// Manifest that declares the reference.
    pub manifest: ManifestPath,
    /// Resolved path of the referenced file.
    pub file: String,
    pub category: FileReferenceCategory,
    /// 0-based line of the path literal.
    pub line: u32,
    /// 0-based column of the path literal, in UTF-16 code units.
    pub column: u32,
}

// ── Artifact References ─────────────────────────────────────────────────────

/// The kind of code construct a manifest expects.
///
/// Unknown kinds are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ArtifactKind {
    Function,
    Class,
    Method,
    Attribute,
    Other(String),
}

impl Default for ArtifactKind {
    fn default() -> Self {
        Self::Function
    }
}

impl From<&str> for ArtifactKind {
    fn from(s: &str) -> Self {
        match s {
            "function" => Self::Function,
            "class" => Self::Class,
            "method" => Self::Method,
            "attribute" => Self::Attribute,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ArtifactKind {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<ArtifactKind> for String {
    fn from(kind: ArtifactKind) -> Self {
        kind.to_string()
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Function => write!(f, "function"),
            Self::Class => write!(f, "class"),
            Self::Method => write!(f, "method"),
            Self::Attribute => write!(f, "attribute"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// One artifact a manifest expects to exist in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactReference {
    /// Manifest that declares the expectation.
    pub manifest: ManifestPath,
    /// Resolved path of the file expected to contain the artifact.
    pub file: String,
    pub kind: ArtifactKind,
    pub name: String,
    /// 0-based line of the `name` literal.
    pub line: u32,
    /// 0-based column of the `name` literal, in UTF-16 code units.
    pub column: u32,
}

// ── Index Entries ───────────────────────────────────────────────────────────

/// Everything the index extracted from one manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestIndexEntry {
    pub path: ManifestPath,
    pub goal: Option<String>,
    /// Resolved file path -> references in document order.
    pub referenced_files: BTreeMap<String, Vec<FileReference>>,
    /// Artifact name -> declarations in document order.
    pub artifacts: BTreeMap<String, Vec<ArtifactReference>>,
    /// Resolved manifest paths this manifest replaces.
    pub supersedes: Vec<ManifestPath>,
    /// Manifests that replace this one. Derived by the index, never parsed.
    pub superseded_by: Vec<ManifestPath>,
}

impl ManifestIndexEntry {
    /// Create an empty entry for `path`.
    pub fn new(path: impl Into<ManifestPath>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Number of file references across all files.
    pub fn file_reference_count(&self) -> usize {
        self.referenced_files.values().map(Vec::len).sum()
    }

    /// Number of artifact declarations across all names.
    pub fn artifact_reference_count(&self) -> usize {
        self.artifacts.values().map(Vec::len).sum()
    }
}

/// One-hop supersession neighbourhood of a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupersessionChain {
    /// Manifests that supersede this one.
    pub parents: Vec<ManifestPath>,
    /// Manifests this one supersedes.
    pub children: Vec<ManifestPath>,
}

/// Direction of a transitive supersession walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineageDirection {
    /// Follow `superseded_by` edges (newer manifests).
    Ancestors,
    /// Follow `supersedes` edges (older manifests).
    Descendants,
}

/// Aggregate counts over the whole index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub manifests: usize,
    pub files: usize,
    pub artifact_names: usize,
    pub file_references: usize,
    pub artifact_references: usize,
    pub supersession_edges: usize,
}

/// Outcome of a full rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexReport {
    /// Documents handed to the build.
    pub scanned: usize,
    /// Documents that produced an entry.
    pub indexed: usize,
    /// Documents skipped because they could not be read or parsed.
    pub failed: usize,
    pub file_references: usize,
    pub artifact_references: usize,
}
