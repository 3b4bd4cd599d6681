//! Storage operations
//!
//! Resolves files for download, upload and deletion. Every operation runs
//! its input through path validation first and acts only on the resulting
//! [`ResolvedPath`].

use log::info;
use std::fs;
use std::io::ErrorKind;

use crate::error::StorageError;
use crate::storage::mime::content_type_for;
use crate::storage::results::DownloadTarget;
use crate::storage::root::RootDirectory;
use crate::storage::validation::{ResolvedPath, resolve_child, resolve_path};

/// Prepares for file retrieval
///
/// Succeeds only for an existing regular file. Missing paths and
/// directories are both reported as not found.
pub fn prepare_file_retrieval(
    root: &RootDirectory,
    path: Option<&str>,
) -> Result<DownloadTarget, StorageError> {
    let resolved = resolve_path(root, path)?;

    let metadata = match fs::metadata(resolved.real_path()) {
        Ok(metadata) => metadata,
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
            return Err(StorageError::NotFound(resolved.virtual_path().to_string()));
        }
        Err(e) => return Err(StorageError::Io(e)),
    };

    if !metadata.is_file() {
        return Err(StorageError::NotFound(resolved.virtual_path().to_string()));
    }

    let target = DownloadTarget {
        file_name: resolved.name(),
        content_type: content_type_for(resolved.real_path()),
        size: metadata.len(),
        path: resolved,
    };

    info!(
        "Prepared file retrieval for {} ({}, {} bytes)",
        target.path, target.content_type, target.size
    );

    Ok(target)
}

/// Prepares for file storage
///
/// Resolves the destination for `file_name` inside `sub_path`. The file
/// name is reduced to a single component and the combined path is checked
/// against the root again. Missing intermediate directories are created so
/// the caller can write straight away.
pub fn prepare_file_storage(
    root: &RootDirectory,
    sub_path: Option<&str>,
    file_name: &str,
) -> Result<ResolvedPath, StorageError> {
    let dir = resolve_path(root, sub_path)?;
    let target = resolve_child(root, &dir, file_name)?;

    if dir.real_path().exists() && !dir.real_path().is_dir() {
        return Err(StorageError::NotADirectory(dir.virtual_path().to_string()));
    }

    if target.real_path().is_dir() {
        return Err(StorageError::IsADirectory(target.virtual_path().to_string()));
    }

    // A file somewhere along the directory chain
    fs::create_dir_all(dir.real_path()).map_err(|e| match e.kind() {
        ErrorKind::NotADirectory => StorageError::NotADirectory(dir.virtual_path().to_string()),
        _ => StorageError::Io(e),
    })?;

    info!("Prepared file storage for {target}");

    Ok(target)
}

/// Deletes a file
///
/// Directories are refused rather than removed recursively.
pub fn delete_file(root: &RootDirectory, path: Option<&str>) -> Result<ResolvedPath, StorageError> {
    let resolved = resolve_path(root, path)?;

    let metadata = match fs::metadata(resolved.real_path()) {
        Ok(metadata) => metadata,
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
            return Err(StorageError::NotFound(resolved.virtual_path().to_string()));
        }
        Err(e) => return Err(StorageError::Io(e)),
    };

    if metadata.is_dir() {
        return Err(StorageError::IsADirectory(resolved.virtual_path().to_string()));
    }

    match fs::remove_file(resolved.real_path()) {
        Ok(()) => {
            info!("Deleted file {resolved}");
            Ok(resolved)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(StorageError::NotFound(resolved.virtual_path().to_string()))
        }
        Err(e) => Err(StorageError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::listing::list_directory;
    use tempfile::TempDir;

    fn setup() -> (TempDir, RootDirectory) {
        let temp_dir = TempDir::new().unwrap();
        let root = RootDirectory::new(temp_dir.path()).unwrap();
        (temp_dir, root)
    }

    #[test]
    fn test_retrieval_of_existing_file() {
        let (tmp, root) = setup();
        fs::create_dir(tmp.path().join("docs")).unwrap();
        fs::write(tmp.path().join("docs/report.PDF"), b"%PDF-1.7").unwrap();

        let target = prepare_file_retrieval(&root, Some("docs/report.PDF")).unwrap();
        assert_eq!(target.file_name, "report.PDF");
        assert_eq!(target.content_type, "application/pdf");
        assert_eq!(target.size, 8);
        assert_eq!(target.path.real_path(), root.path().join("docs/report.PDF"));
    }

    #[test]
    fn test_retrieval_unknown_extension() {
        let (tmp, root) = setup();
        fs::write(tmp.path().join("blob.qqq"), b"x").unwrap();

        let target = prepare_file_retrieval(&root, Some("blob.qqq")).unwrap();
        assert_eq!(target.content_type, "application/octet-stream");
    }

    #[test]
    fn test_retrieval_missing_or_directory() {
        let (tmp, root) = setup();
        fs::create_dir(tmp.path().join("docs")).unwrap();

        assert!(matches!(
            prepare_file_retrieval(&root, Some("nope.txt")),
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            prepare_file_retrieval(&root, Some("docs")),
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            prepare_file_retrieval(&root, None),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_retrieval_outside_root() {
        let (_tmp, root) = setup();

        assert!(matches!(
            prepare_file_retrieval(&root, Some("../../etc/passwd")),
            Err(StorageError::AccessDenied(_))
        ));
    }

    #[test]
    fn test_storage_at_root() {
        let (_tmp, root) = setup();

        for sub_path in [None, Some(""), Some("/")] {
            let target = prepare_file_storage(&root, sub_path, "a.txt").unwrap();
            assert_eq!(target.real_path(), root.path().join("a.txt"));
        }
    }

    #[test]
    fn test_storage_creates_missing_directories() {
        let (_tmp, root) = setup();

        let target = prepare_file_storage(&root, Some("x/y/z"), "a.txt").unwrap();
        assert_eq!(target.real_path(), root.path().join("x/y/z/a.txt"));
        assert!(root.path().join("x/y/z").is_dir());
    }

    #[test]
    fn test_storage_strips_traversal_from_file_name() {
        let (_tmp, root) = setup();

        let target = prepare_file_storage(&root, None, "../../evil.txt").unwrap();
        assert_eq!(target.real_path(), root.path().join("evil.txt"));
    }

    #[test]
    fn test_storage_rejects_unsafe_input() {
        let (_tmp, root) = setup();

        assert!(matches!(
            prepare_file_storage(&root, Some("../outside"), "a.txt"),
            Err(StorageError::AccessDenied(_))
        ));
        assert!(matches!(
            prepare_file_storage(&root, None, ".."),
            Err(StorageError::InvalidArgument(_))
        ));
        assert!(matches!(
            prepare_file_storage(&root, None, ""),
            Err(StorageError::InvalidArgument(_))
        ));
        assert!(!root.path().join("outside").exists());
    }

    #[test]
    fn test_storage_type_conflicts() {
        let (tmp, root) = setup();
        fs::write(tmp.path().join("file.txt"), "x").unwrap();
        fs::create_dir(tmp.path().join("taken")).unwrap();

        assert!(matches!(
            prepare_file_storage(&root, Some("file.txt"), "a.txt"),
            Err(StorageError::NotADirectory(_))
        ));
        assert!(matches!(
            prepare_file_storage(&root, None, "taken"),
            Err(StorageError::IsADirectory(_))
        ));
    }

    #[test]
    fn test_file_in_place_of_parent_directory() {
        let (tmp, root) = setup();
        fs::write(tmp.path().join("f.txt"), "x").unwrap();

        assert!(matches!(
            prepare_file_storage(&root, Some("f.txt/sub"), "a.txt"),
            Err(StorageError::NotADirectory(_))
        ));
        assert!(matches!(
            prepare_file_retrieval(&root, Some("f.txt/a.txt")),
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            delete_file(&root, Some("f.txt/a.txt")),
            Err(StorageError::NotFound(_))
        ));
        assert_eq!(fs::read(tmp.path().join("f.txt")).unwrap(), b"x");
    }

    #[test]
    fn test_delete_then_list() {
        let (tmp, root) = setup();
        fs::write(tmp.path().join("gone.txt"), "bye").unwrap();
        fs::write(tmp.path().join("kept.txt"), "hi").unwrap();

        let deleted = delete_file(&root, Some("gone.txt")).unwrap();
        assert_eq!(deleted.virtual_path(), "/gone.txt");

        let dir = resolve_path(&root, None).unwrap();
        let listing = list_directory(&dir).unwrap();
        assert_eq!(listing.total_count, 1);
        assert_eq!(listing.items[0].name, "kept.txt");
    }

    #[test]
    fn test_delete_missing_file() {
        let (_tmp, root) = setup();

        assert!(matches!(
            delete_file(&root, Some("missing.txt")),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_directory_refused() {
        let (tmp, root) = setup();
        fs::create_dir(tmp.path().join("docs")).unwrap();

        assert!(matches!(
            delete_file(&root, Some("docs")),
            Err(StorageError::IsADirectory(_))
        ));
        assert!(matches!(
            delete_file(&root, None),
            Err(StorageError::IsADirectory(_))
        ));
        assert!(tmp.path().join("docs").is_dir());
    }

    #[test]
    fn test_delete_outside_root() {
        let (_tmp, root) = setup();

        assert!(matches!(
            delete_file(&root, Some("../victim.txt")),
            Err(StorageError::AccessDenied(_))
        ));
    }
}
