//! Construction of per-manifest index entries.

use crate::locator::LineIndex;
use crate::parser::{parse_manifest, ParsedManifest};
use crate::paths::PathNormalizer;
use mxref_core::{ArtifactReference, FileReference, ManifestIndexEntry, MxrefError};

/// Parse `text` and build the entry for `path` (already normalized).
///
/// Touches no index, so callers can do the parsing work before taking any
/// lock and hand the result to
/// [`CrossReferenceIndex::apply_entry`](crate::CrossReferenceIndex::apply_entry).
pub fn entry_from_text(
    path: &str,
    text: &str,
    normalizer: &PathNormalizer,
) -> Result<ManifestIndexEntry, MxrefError> {
    let parsed = parse_manifest(text).map_err(|e| MxrefError::parse(path, e.to_string()))?;
    Ok(build_entry(path, text, &parsed, normalizer))
}

/// Build the entry for the manifest at `path` (already normalized).
///
/// Resolves every raw path, converts offsets to positions, and groups
/// references. `superseded_by` is left empty: only the index fills it, once it
/// can see every manifest.
pub fn build_entry(
    path: &str,
    text: &str,
    parsed: &ParsedManifest,
    normalizer: &PathNormalizer,
) -> ManifestIndexEntry {
    let lines = LineIndex::new(text);
    let mut entry = ManifestIndexEntry::new(path);
    entry.goal = parsed.goal.clone();

    for raw in &parsed.file_references {
        let file = normalizer.resolve(&raw.raw_path, path);
        let position = lines.position(raw.offset);
        entry
            .referenced_files
            .entry(file.clone())
            .or_default()
            .push(FileReference {
                manifest: path.to_string(),
                file,
                category: raw.category,
                line: position.line,
                column: position.column,
            });
    }

    for raw in &parsed.artifacts {
        let position = lines.position(raw.offset);
        entry
            .artifacts
            .entry(raw.name.clone())
            .or_default()
            .push(ArtifactReference {
                manifest: path.to_string(),
                file: normalizer.resolve(&raw.raw_file, path),
                kind: raw.kind.clone(),
                name: raw.name.clone(),
                line: position.line,
                column: position.column,
            });
    }

    for raw in parsed.supersedes() {
        let target = normalizer.resolve(raw, path);
        if !entry.supersedes.contains(&target) {
            entry.supersedes.push(target);
        }
    }

    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use mxref_core::{ArtifactKind, FileReferenceCategory};
    use std::path::PathBuf;

    const TEXT: &str = "{\n  \"goal\": \"g\",\n  \"editableFiles\": [\"src/x.ts\"],\n  \"supersedes\": [\"a.manifest.json\", \"./a.manifest.json\"],\n  \"expectedArtifacts\": [\n    {\"file\": \"./src/x.ts\", \"contains\": [{\"type\": \"function\", \"name\": \"foo\"}]}\n  ]\n}";

    fn build() -> ManifestIndexEntry {
        let normalizer = PathNormalizer::new([PathBuf::from("/ws")]);
        let parsed = parse_manifest(TEXT).unwrap();
        build_entry("/ws/plans/b.manifest.json", TEXT, &parsed, &normalizer)
    }

    #[test]
    fn groups_references_by_resolved_path() {
        let entry = build();
        let refs = &entry.referenced_files["/ws/src/x.ts"];
        let categories: Vec<_> = refs.iter().map(|r| r.category).collect();
        assert_eq!(
            categories,
            vec![
                FileReferenceCategory::Editable,
                FileReferenceCategory::ExpectedArtifact
            ]
        );
        assert!(refs.iter().all(|r| r.manifest == "/ws/plans/b.manifest.json"));
    }

    #[test]
    fn converts_offsets_to_positions() {
        let entry = build();
        let editable = &entry.referenced_files["/ws/src/x.ts"][0];
        assert_eq!((editable.line, editable.column), (2, 20));

        let foo = &entry.artifacts["foo"][0];
        assert_eq!(foo.line, 5);
        assert_eq!(foo.kind, ArtifactKind::Function);
        assert_eq!(foo.file, "/ws/src/x.ts");
    }

    #[test]
    fn supersedes_are_resolved_and_deduplicated() {
        let entry = build();
        assert_eq!(entry.supersedes, vec!["/ws/a.manifest.json".to_string()]);
        assert_eq!(entry.referenced_files["/ws/a.manifest.json"].len(), 2);
        assert!(entry.superseded_by.is_empty());
        assert_eq!(entry.goal.as_deref(), Some("g"));
    }

    #[test]
    fn entry_from_text_reports_unparseable_documents() {
        let normalizer = PathNormalizer::new([PathBuf::from("/ws")]);
        let entry = entry_from_text("/ws/plans/b.manifest.json", TEXT, &normalizer).unwrap();
        assert_eq!(entry, build());

        let result = entry_from_text("/ws/plans/b.manifest.json", "", &normalizer);
        assert!(matches!(result, Err(MxrefError::Parse { .. })));
    }
}
