//! File system storage management
//!
//! Handles path containment, directory listing, search, and file
//! resolution for download, upload and deletion.

pub mod listing;
pub mod mime;
pub mod operations;
pub mod results;
pub mod root;
pub mod validation;

pub use listing::{list_directory, search_directory};
pub use operations::{delete_file, prepare_file_retrieval, prepare_file_storage};
pub use results::{DirectoryListing, DownloadTarget, FileSystemEntry};
pub use root::RootDirectory;
pub use validation::{ResolvedPath, resolve_child, resolve_path, sanitize_file_name};
