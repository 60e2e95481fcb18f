//! Path normalization for map keys.
//!
//! Every file and manifest path is turned into one canonical spelling before it
//! touches an index map: forward slashes, absolute, lexically cleaned.

use std::path::PathBuf;

/// Canonicalizes paths relative to a set of workspace roots.
#[derive(Debug, Clone, Default)]
pub struct PathNormalizer {
    /// Normalized roots in the order the host supplied them.
    roots: Vec<String>,
}

impl PathNormalizer {
    /// Create a normalizer for the given workspace roots.
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut normalized: Vec<String> = Vec::new();
        for root in roots {
            let root = normalize_absolute(&root.to_string_lossy());
            if !normalized.contains(&root) {
                normalized.push(root);
            }
        }
        Self { roots: normalized }
    }

    /// Normalized workspace roots.
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// The innermost workspace root containing `path`, if any.
    pub fn workspace_root_for(&self, path: &str) -> Option<&str> {
        let path = normalize_absolute(path);
        self.roots
            .iter()
            .filter(|root| is_within(&path, root))
            .max_by_key(|root| root.len())
            .map(String::as_str)
    }

    /// Resolve `raw` as written inside the manifest at `referencing_manifest`.
    ///
    /// Relative paths resolve against the manifest's workspace root, falling
    /// back to the manifest's own directory.
    pub fn resolve(&self, raw: &str, referencing_manifest: &str) -> String {
        if is_absolute(raw) {
            return normalize_absolute(raw);
        }
        let manifest = normalize_absolute(referencing_manifest);
        let base = match self.workspace_root_for(&manifest) {
            Some(root) => root.to_string(),
            None => parent_dir(&manifest).to_string(),
        };
        normalize_absolute(&join(&base, raw))
    }

    /// Normalize a path handed to a query.
    ///
    /// Relative query paths resolve against the first workspace root.
    pub fn resolve_query(&self, raw: &str) -> String {
        if is_absolute(raw) {
            return normalize_absolute(raw);
        }
        match self.roots.first() {
            Some(root) => normalize_absolute(&join(root, raw)),
            None => normalize_absolute(raw),
        }
    }
}

/// Replace backslashes with forward slashes.
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Whether `path` is absolute in either POSIX or Windows drive-letter form.
pub fn is_absolute(path: &str) -> bool {
    let path = normalize_separators(path);
    if path.starts_with('/') {
        return true;
    }
    let bytes = path.as_bytes();
    bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/'
}

/// Clean `.`/`..` segments and duplicate separators. Idempotent.
pub fn normalize_absolute(path: &str) -> String {
    let unified = normalize_separators(path);
    let cleaned = path_clean::clean(&unified);
    normalize_separators(&cleaned.to_string_lossy())
}

fn join(base: &str, relative: &str) -> String {
    let relative = normalize_separators(relative);
    if base.ends_with('/') {
        format!("{base}{relative}")
    } else {
        format!("{base}/{relative}")
    }
}

fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(idx) => &path[..idx],
        None => ".",
    }
}

fn is_within(path: &str, root: &str) -> bool {
    if path == root {
        return true;
    }
    if root.ends_with('/') {
        return path.starts_with(root);
    }
    path.strip_prefix(root)
        .is_some_and(|rest| rest.starts_with('/'))
}
