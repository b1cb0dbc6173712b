//! # Identifiers and Paths
//!
//! Pages are addressed by an **identifier**: a slash separated, lowercase,
//! underscore-for-space logical path such as `team/roster`. On disk every page
//! lives at `<root>/<identifier><file_ext>`, so `team/roster` becomes
//! `<root>/team/roster.md`.
//!
//! ## Confinement
//!
//! Identifiers arrive from callers (form fields, URLs, cross references) and may
//! contain `..` segments. Every path the store touches goes through
//! [`PathResolver::resolve_confined`], which lexically normalizes both the root
//! and the target and rejects targets that do not live under the root with
//! [`WikiError::PathEscape`]. Normalization is purely lexical: symlinks inside
//! the content root are followed by the OS as usual.

use crate::error::{Result, WikiError};
use std::path::{Component, Path, PathBuf};

pub const DEFAULT_FILE_EXT: &str = ".md";

/// Clean up a user supplied page name into an identifier.
///
/// Collapses repeated spaces, trims, lowercases, turns spaces into underscores
/// and Windows style separators into forward slashes.
pub fn normalize_identifier(raw: &str) -> String {
    let mut collapsed = String::with_capacity(raw.len());
    let mut previous_space = false;
    for c in raw.chars() {
        if c == ' ' {
            if !previous_space {
                collapsed.push(' ');
            }
            previous_space = true;
        } else {
            previous_space = false;
            collapsed.push(c);
        }
    }

    collapsed
        .trim()
        .to_lowercase()
        .replace(' ', "_")
        .replace("\\\\", "/")
        .replace('\\', "/")
}

/// Lexically normalize a path: drop `.` segments and fold `..` into the
/// preceding component. Leading `..` segments of relative paths are kept.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

fn absolute_normalized(path: &Path) -> Result<PathBuf> {
    Ok(normalize_path(&std::path::absolute(path)?))
}

/// Check that `target` lives inside `root`, returning the normalized target.
///
/// Both paths are made absolute and normalized first, so a root configured as a
/// relative path or with `..` inside it compares correctly.
pub fn confine(root: &Path, target: &Path) -> Result<PathBuf> {
    let root = absolute_normalized(root)?;
    let normalized = absolute_normalized(target)?;
    // Component-wise: `/srv/content2` is not inside `/srv/content`.
    if !normalized.starts_with(&root) {
        return Err(WikiError::PathEscape {
            identifier: target.display().to_string(),
            path: normalized,
        });
    }
    Ok(normalized)
}

/// Maps identifiers to record files under a content root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    file_ext: String,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            file_ext: DEFAULT_FILE_EXT.to_string(),
        }
    }

    pub fn with_file_ext(mut self, ext: &str) -> Self {
        if ext.starts_with('.') {
            self.file_ext = ext.to_string();
        } else {
            self.file_ext = format!(".{}", ext);
        }
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file_ext(&self) -> &str {
        &self.file_ext
    }

    /// Record file path for `identifier`, joined to the root and normalized.
    /// Not confined; see [`PathResolver::resolve_confined`].
    pub fn resolve(&self, identifier: &str) -> PathBuf {
        let relative = format!("{}{}", identifier.trim_start_matches('/'), self.file_ext);
        normalize_path(&self.root.join(relative))
    }

    /// Like [`PathResolver::resolve`], failing with `PathEscape` when the
    /// result is outside the content root.
    pub fn resolve_confined(&self, identifier: &str) -> Result<PathBuf> {
        confine(&self.root, &self.resolve(identifier)).map_err(|e| match e {
            WikiError::PathEscape { path, .. } => WikiError::PathEscape {
                identifier: identifier.to_string(),
                path,
            },
            other => other,
        })
    }

    /// Path of the record for `identifier` relative to the root, with `/`
    /// separators. This is the form handed to the version control client.
    pub fn relative(&self, identifier: &str) -> Result<String> {
        let path = self.resolve_confined(identifier)?;
        let root = absolute_normalized(&self.root)?;
        let relative = path.strip_prefix(&root).unwrap_or(&path);
        Ok(components_to_identifier(relative))
    }

    /// Inverse of [`PathResolver::resolve`] for files found under the root.
    /// Returns `None` for files that are not records.
    pub fn identifier_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let joined = components_to_identifier(relative);
        joined
            .strip_suffix(self.file_ext.as_str())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }
}

fn components_to_identifier(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
