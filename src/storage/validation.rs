//! Path validation
//!
//! Resolves caller-supplied sub-paths against the root directory and
//! enforces containment. A [`ResolvedPath`] can only be produced here, so
//! every storage operation that takes one acts on a checked path.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::storage::root::RootDirectory;

/// An absolute path known to be the root or one of its descendants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    real: PathBuf,
    virtual_path: String,
}

impl ResolvedPath {
    /// Absolute filesystem path
    pub fn real_path(&self) -> &Path {
        &self.real
    }

    /// Path relative to the root, `/`-separated with a leading `/`.
    ///
    /// Used in messages and logs so host paths never reach clients.
    pub fn virtual_path(&self) -> &str {
        &self.virtual_path
    }

    /// True when this path is the root itself.
    pub fn is_root(&self) -> bool {
        self.virtual_path == "/"
    }

    /// Final component name
    pub fn name(&self) -> String {
        self.real
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "/".to_string())
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.virtual_path)
    }
}

/// Resolve `sub_path` against `root`.
///
/// An absent, empty or separator-only sub-path resolves to the root. Both
/// `/` and `\` act as separators, and leading separators are ignored so that
/// `/docs` and `docs` name the same directory. `.` and `..` are resolved
/// lexically against the root's own components, then the result must sit on
/// or below the root at a segment boundary: a root of `/data/foo` does not
/// admit `/data/foobar`. Symbolic links are not followed.
pub fn resolve_path(
    root: &RootDirectory,
    sub_path: Option<&str>,
) -> Result<ResolvedPath, StorageError> {
    let sub_path = sub_path.unwrap_or("");

    if sub_path.contains('\0') {
        return Err(StorageError::InvalidArgument(
            "Path contains a NUL byte".into(),
        ));
    }

    let mut normalized = root.path().to_path_buf();
    for segment in sub_path.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => {
                if !normalized.pop() {
                    return Err(StorageError::AccessDenied(sub_path.to_string()));
                }
            }
            name => normalized.push(name),
        }
    }

    contain(root, normalized, sub_path)
}

/// Resolve `file_name` as a direct child of `dir`.
///
/// The name is sanitized first, then the combined path is checked against
/// the root again rather than trusting `dir` alone.
pub fn resolve_child(
    root: &RootDirectory,
    dir: &ResolvedPath,
    file_name: &str,
) -> Result<ResolvedPath, StorageError> {
    let name = sanitize_file_name(file_name)?;
    contain(root, dir.real_path().join(&name), file_name)
}

/// Reduce an uploaded file name to a single safe path component.
///
/// Everything up to the last `/` or `\` is discarded, so
/// `../../etc/passwd` becomes `passwd`. Names that are empty, `.`, `..` or
/// contain NUL after that are rejected.
pub fn sanitize_file_name(file_name: &str) -> Result<String, StorageError> {
    let last = file_name.rsplit(['/', '\\']).next().unwrap_or("");

    if last.is_empty() || last == "." || last == ".." || last.contains('\0') {
        return Err(StorageError::InvalidArgument(format!(
            "Invalid file name: {file_name:?}"
        )));
    }

    Ok(last.to_string())
}

fn contain(
    root: &RootDirectory,
    candidate: PathBuf,
    requested: &str,
) -> Result<ResolvedPath, StorageError> {
    let relative = candidate
        .strip_prefix(root.path())
        .map_err(|_| StorageError::AccessDenied(requested.to_string()))?;

    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    Ok(ResolvedPath {
        virtual_path: format!("/{}", segments.join("/")),
        real: candidate,
    })
}
