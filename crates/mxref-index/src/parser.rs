//! Tree-sitter parsing of manifest documents.
//!
//! Uses the error-recovering `tree-sitter-json` grammar, so hand-authored
//! manifests with comments, trailing commas, or trailing junk still yield
//! whatever well-formed fields they contain. Every extracted path and name
//! keeps the byte offset of its string literal.

use mxref_core::{ArtifactKind, FileReferenceCategory};
use tree_sitter::{Node, Parser};

/// A path literal found in one of the manifest's file lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFileReference {
    /// The path exactly as written (after JSON unescaping).
    pub raw_path: String,
    pub category: FileReferenceCategory,
    /// Byte offset of the opening quote.
    pub offset: usize,
}

/// An artifact declaration from `expectedArtifacts[].contains[]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawArtifact {
    /// The enclosing element's `file`, unresolved.
    pub raw_file: String,
    pub name: String,
    pub kind: ArtifactKind,
    /// Byte offset of the `name` value's opening quote.
    pub offset: usize,
}

/// Result of parsing a single manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedManifest {
    pub goal: Option<String>,
    /// File references in extraction order: creatable, editable, readonly,
    /// supersedes, then expected-artifact files.
    pub file_references: Vec<RawFileReference>,
    pub artifacts: Vec<RawArtifact>,
}

impl ParsedManifest {
    /// Raw paths of the `supersedes` list, in document order.
    pub fn supersedes(&self) -> impl Iterator<Item = &str> {
        self.file_references
            .iter()
            .filter(|r| r.category == FileReferenceCategory::Supersedes)
            .map(|r| r.raw_path.as_str())
    }
}

/// Why a document produced no structural tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    #[error("failed to load JSON grammar: {0}")]
    Grammar(String),
    #[error("parser produced no syntax tree")]
    NoTree,
    #[error("document contains no JSON value")]
    Empty,
    #[error("document does not start with a JSON value")]
    Unrecognized,
}

/// The plain path-list keys, in extraction order.
const PATH_LIST_CATEGORIES: [FileReferenceCategory; 4] = [
    FileReferenceCategory::Creatable,
    FileReferenceCategory::Editable,
    FileReferenceCategory::Readonly,
    FileReferenceCategory::Supersedes,
];

/// Parse manifest text.
///
/// Fails only when the text contains no JSON value at all. A top-level value
/// that is not an object yields an empty manifest; malformed fields and
/// elements are skipped one by one.
pub fn parse_manifest(text: &str) -> Result<ParsedManifest, ParseFailure> {
    let language: tree_sitter::Language = tree_sitter_json::LANGUAGE.into();
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| ParseFailure::Grammar(e.to_string()))?;

    let tree = parser.parse(text, None).ok_or(ParseFailure::NoTree)?;
    let root = tree.root_node();

    let top = {
        let mut cursor = root.walk();
        let first = root
            .named_children(&mut cursor)
            .find(|n| n.kind() != "comment");
        first
    };
    let top = top.ok_or(ParseFailure::Empty)?;
    if top.is_error() || (root.is_error() && top.kind() != "object") {
        return Err(ParseFailure::Unrecognized);
    }

    let mut parsed = ParsedManifest::default();
    if top.kind() != "object" {
        return Ok(parsed);
    }

    let source = text.as_bytes();

    parsed.goal = field(top, source, "goal").and_then(|n| string_value(n, source));

    for category in PATH_LIST_CATEGORIES {
        let Some(key) = category.array_key() else {
            continue;
        };
        let Some(list) = field(top, source, key) else {
            continue;
        };
        for element in array_elements(list) {
            if let Some(raw_path) = string_value(element, source) {
                parsed.file_references.push(RawFileReference {
                    raw_path,
                    category,
                    offset: element.start_byte(),
                });
            }
        }
    }

    if let Some(expected) = field(top, source, "expectedArtifacts") {
        extract_expected_artifacts(expected, source, &mut parsed);
    }

    Ok(parsed)
}

// ── Expected Artifacts ──────────────────────────────────────────────────────

fn extract_expected_artifacts(expected: Node, source: &[u8], parsed: &mut ParsedManifest) {
    for element in array_elements(expected) {
        if element.kind() != "object" {
            continue;
        }
        let Some(file_node) = field(element, source, "file") else {
            continue;
        };
        let Some(raw_file) = string_value(file_node, source) else {
            continue;
        };

        parsed.file_references.push(RawFileReference {
            raw_path: raw_file.clone(),
            category: FileReferenceCategory::ExpectedArtifact,
            offset: file_node.start_byte(),
        });

        let Some(contains) = field(element, source, "contains") else {
            continue;
        };
        for item in array_elements(contains) {
            if item.kind() != "object" {
                continue;
            }
            let Some(name_node) = field(item, source, "name") else {
                continue;
            };
            let Some(name) = string_value(name_node, source) else {
                continue;
            };
            let kind = field(item, source, "type")
                .and_then(|n| string_value(n, source))
                .map(ArtifactKind::from)
                .unwrap_or_default();

            parsed.artifacts.push(RawArtifact {
                raw_file: raw_file.clone(),
                name,
                kind,
                offset: name_node.start_byte(),
            });
        }
    }
}

// ── Tree Helpers ────────────────────────────────────────────────────────────

/// Value node of the first pair in `object` whose key is `key`.
fn field<'t>(object: Node<'t>, source: &[u8], key: &str) -> Option<Node<'t>> {
    if object.kind() != "object" {
        return None;
    }
    let mut cursor = object.walk();
    let pairs: Vec<Node<'t>> = object
        .named_children(&mut cursor)
        .filter(|n| n.kind() == "pair")
        .collect();

    pairs.into_iter().find_map(|pair| {
        let key_node = pair.child_by_field_name("key")?;
        if string_value(key_node, source).as_deref() != Some(key) {
            return None;
        }
        pair.child_by_field_name("value")
    })
}

/// Elements of an array node, excluding comments. Non-arrays have none.
///
/// Elements the grammar wrapped in an error node, as happens to `"a"` in
/// `["a" "b"]`, are kept.
fn array_elements(node: Node) -> Vec<Node> {
    let mut elements = Vec::new();
    if node.kind() == "array" {
        collect_elements(node, &mut elements);
    }
    elements
}

fn collect_elements<'t>(node: Node<'t>, elements: &mut Vec<Node<'t>>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.is_error() {
            collect_elements(child, elements);
        } else if child.kind() != "comment" {
            elements.push(child);
        }
    }
}

/// Unescaped contents of a well-formed string literal.
fn string_value(node: Node, source: &[u8]) -> Option<String> {
    if node.kind() != "string" || node.has_error() {
        return None;
    }
    let literal = node.utf8_text(source).ok()?;
    serde_json::from_str::<String>(literal).ok()
}
