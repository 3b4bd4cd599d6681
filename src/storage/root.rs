//! Root directory configuration
//!
//! The single directory every storage operation is confined to.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ServerError;

/// An absolute, existing directory that bounds all storage operations.
///
/// Validated once at construction and immutable afterwards. Components
/// receive it by reference rather than reading process-wide state, so tests
/// can run side by side against distinct temporary roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootDirectory {
    path: PathBuf,
}

impl RootDirectory {
    /// Validate `path` and make it absolute.
    ///
    /// The path is canonicalized here, once, so that later containment
    /// checks compare against a stable form.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, ServerError> {
        let path = path.as_ref();

        if path.as_os_str().is_empty() {
            return Err(ServerError::InvalidRoot {
                path: path.to_path_buf(),
                reason: "path is empty".into(),
            });
        }

        let canonical = fs::canonicalize(path).map_err(|e| ServerError::InvalidRoot {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if !canonical.is_dir() {
            return Err(ServerError::InvalidRoot {
                path: path.to_path_buf(),
                reason: "not a directory".into(),
            });
        }

        Ok(Self { path: canonical })
    }

    /// Absolute path of the root
    pub fn path(&self) -> &Path {
        &self.path
    }
}
