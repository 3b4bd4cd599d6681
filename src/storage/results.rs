//! Storage result types
//!
//! Defines result structures returned by storage operations.

use serde::Serialize;

use crate::storage::validation::ResolvedPath;

/// A single child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSystemEntry {
    pub name: String,
    /// Byte length for files, always 0 for directories.
    pub size: u64,
    pub is_directory: bool,
}

/// Immediate children of a directory with summary totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryListing {
    pub items: Vec<FileSystemEntry>,
    pub total_count: usize,
    pub total_size: u64,
}

impl DirectoryListing {
    /// Build a listing, deriving the totals from `items`.
    pub fn from_entries(items: Vec<FileSystemEntry>) -> Self {
        let total_size = items.iter().map(|entry| entry.size).sum();
        Self {
            total_count: items.len(),
            total_size,
            items,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A regular file ready to be sent to a client.
#[derive(Debug, Clone)]
pub struct DownloadTarget {
    pub path: ResolvedPath,
    pub file_name: String,
    pub content_type: &'static str,
    pub size: u64,
}
