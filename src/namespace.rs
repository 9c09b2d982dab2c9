// src/namespace.rs
use crate::errors::SecretError;

use std::fmt;
use std::path::{Path, PathBuf};

/// Extension of every encrypted artifact in the store
pub const ARTIFACT_EXT: &str = "gpg";

/// Logical, slash-separated name of a secret (e.g. `email/google`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretPath(String);

impl SecretPath {
    /// Strip one leading and one trailing `/` and validate the remainder.
    ///
    /// Interior separators are kept as typed. Segments that could walk out of
    /// the store (`..`, `.`) and paths that stay absolute after stripping are
    /// rejected.
    pub fn normalize(raw: &str) -> Result<Self, SecretError> {
        let mut path = raw;
        if let Some(stripped) = path.strip_prefix('/') {
            path = stripped;
        }
        if let Some(stripped) = path.strip_suffix('/') {
            path = stripped;
        }

        if path.is_empty() {
            return Err(SecretError::InvalidPath(format!(
                "'{}' is empty after normalization",
                raw
            )));
        }
        if path.contains('\0') {
            return Err(SecretError::InvalidPath(
                "path contains a NUL byte".to_string(),
            ));
        }
        if path.starts_with('/') {
            return Err(SecretError::InvalidPath(format!(
                "'{}' is an absolute path",
                raw
            )));
        }
        if path.ends_with('/') {
            return Err(SecretError::InvalidPath(format!(
                "'{}' has no secret name after the last separator",
                raw
            )));
        }
        if path.split('/').any(|segment| segment == ".." || segment == ".") {
            return Err(SecretError::InvalidPath(format!(
                "'{}' contains a relative segment",
                raw
            )));
        }

        Ok(Self(path.to_string()))
    }

    #[cfg(test)]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into (parent folder, leaf name); the parent is empty for
    /// top-level secrets.
    pub fn split_parent(&self) -> (&str, &str) {
        match self.0.rsplit_once('/') {
            Some((parent, leaf)) => (parent, leaf),
            None => ("", &self.0),
        }
    }

    /// `root/<path>.gpg`
    pub fn artifact(&self, root: &Path) -> PathBuf {
        root.join(format!("{}.{}", self.0, ARTIFACT_EXT))
    }

    /// Folder holding the artifact: root joined with all but the last segment
    pub fn folder(&self, root: &Path) -> PathBuf {
        match self.split_parent() {
            ("", _) => root.to_path_buf(),
            (parent, _) => root.join(parent),
        }
    }

    /// `root/<path>`, the subtree a recursive removal targets
    pub fn entry(&self, root: &Path) -> PathBuf {
        root.join(&self.0)
    }
}

impl fmt::Display for SecretPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fail unless `target` resolves strictly inside `root`.
///
/// Both sides are canonicalized, so symlinks pointing out of the store are
/// caught. `target` must exist.
pub fn ensure_contained(root: &Path, target: &Path) -> Result<(), SecretError> {
    let root = root.canonicalize()?;
    let resolved = target.canonicalize()?;

    if resolved != root && resolved.starts_with(&root) {
        Ok(())
    } else {
        Err(SecretError::OutsideStore(target.display().to_string()))
    }
}

/// Fail unless the deepest existing ancestor of `target` resolves inside
/// `root` (or is `root` itself).
///
/// Used before creating `target`, so missing folders are never created
/// through a link that leaves the store.
pub fn ensure_creatable(root: &Path, target: &Path) -> Result<(), SecretError> {
    let root_resolved = root.canonicalize()?;
    let anchor = target
        .ancestors()
        .find(|ancestor| ancestor.exists())
        .unwrap_or(root);
    let resolved = anchor.canonicalize()?;

    if resolved.starts_with(&root_resolved) {
        Ok(())
    } else {
        Err(SecretError::OutsideStore(target.display().to_string()))
    }
}
