//! Directory listing and search
//!
//! Enumerates the immediate children of a resolved directory. Neither
//! operation recurses into subdirectories.

use log::{debug, info};
use std::fs;
use std::io::ErrorKind;

use crate::error::StorageError;
use crate::storage::results::{DirectoryListing, FileSystemEntry};
use crate::storage::validation::ResolvedPath;

/// Lists the contents of a directory
///
/// Directories come first, then files, each in the order the OS enumerates
/// them. Entries that disappear while the directory is being read are
/// skipped.
pub fn list_directory(dir: &ResolvedPath) -> Result<DirectoryListing, StorageError> {
    let items = read_children(dir, |_| true)?;
    let listing = DirectoryListing::from_entries(items);

    info!(
        "Listed directory {} - {} entries, {} bytes",
        dir, listing.total_count, listing.total_size
    );

    Ok(listing)
}

/// Lists the children of `dir` whose names contain `search_term`,
/// ignoring case.
///
/// An empty or whitespace-only term is rejected rather than treated as a
/// wildcard.
pub fn search_directory(
    dir: &ResolvedPath,
    search_term: &str,
) -> Result<DirectoryListing, StorageError> {
    if search_term.trim().is_empty() {
        return Err(StorageError::InvalidArgument(
            "Search term must not be empty".into(),
        ));
    }

    let needle = search_term.to_lowercase();
    let items = read_children(dir, |name| name.to_lowercase().contains(&needle))?;
    let listing = DirectoryListing::from_entries(items);

    info!(
        "Searched directory {} for {:?} - {} matches",
        dir, search_term, listing.total_count
    );

    Ok(listing)
}

fn read_children<F>(dir: &ResolvedPath, matches: F) -> Result<Vec<FileSystemEntry>, StorageError>
where
    F: Fn(&str) -> bool,
{
    let path = dir.real_path();

    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => StorageError::NotFound(dir.virtual_path().to_string()),
        ErrorKind::NotADirectory => StorageError::NotADirectory(dir.virtual_path().to_string()),
        _ => StorageError::Io(e),
    })?;

    if !metadata.is_dir() {
        return Err(StorageError::NotADirectory(dir.virtual_path().to_string()));
    }

    let mut directories = Vec::new();
    let mut files = Vec::new();

    for entry in fs::read_dir(path)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry in {dir}: {e}");
                continue;
            }
        };

        let name = entry.file_name().to_string_lossy().into_owned();
        if !matches(&name) {
            continue;
        }

        // Follows symlinks, so a link reports its target's type and size.
        let metadata = match fs::metadata(entry.path()) {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!("Skipping {name} in {dir}: {e}");
                continue;
            }
        };

        if metadata.is_dir() {
            directories.push(FileSystemEntry {
                name,
                size: 0,
                is_directory: true,
            });
        } else {
            files.push(FileSystemEntry {
                name,
                size: metadata.len(),
                is_directory: false,
            });
        }
    }

    directories.extend(files);
    Ok(directories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::root::RootDirectory;
    use crate::storage::validation::resolve_path;
    use tempfile::TempDir;

    fn setup() -> (TempDir, RootDirectory) {
        let temp_dir = TempDir::new().unwrap();
        let root = RootDirectory::new(temp_dir.path()).unwrap();
        (temp_dir, root)
    }

    fn names(listing: &DirectoryListing) -> Vec<&str> {
        listing.items.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_empty_directory() {
        let (_tmp, root) = setup();
        let dir = resolve_path(&root, None).unwrap();

        let listing = list_directory(&dir).unwrap();
        assert_eq!(listing.total_count, 0);
        assert_eq!(listing.total_size, 0);
        assert!(listing.items.is_empty());
    }

    #[test]
    fn test_lists_files_and_directories() {
        let (tmp, root) = setup();
        fs::write(tmp.path().join("a.txt"), "hello").unwrap();
        fs::write(tmp.path().join("b.bin"), [0u8; 20]).unwrap();
        fs::create_dir(tmp.path().join("docs")).unwrap();
        fs::write(tmp.path().join("docs/inner.txt"), "not listed").unwrap();

        let dir = resolve_path(&root, None).unwrap();
        let listing = list_directory(&dir).unwrap();

        assert_eq!(listing.total_count, 3);
        assert_eq!(listing.total_size, 25);
        assert_eq!(
            listing.items[0],
            FileSystemEntry {
                name: "docs".into(),
                size: 0,
                is_directory: true
            }
        );

        let a = listing.items.iter().find(|e| e.name == "a.txt").unwrap();
        assert_eq!(a.size, 5);
        assert!(!a.is_directory);
        assert!(!names(&listing).contains(&"inner.txt"));
    }

    #[test]
    fn test_directories_listed_first() {
        let (tmp, root) = setup();
        fs::write(tmp.path().join("zz.txt"), "z").unwrap();
        fs::create_dir(tmp.path().join("one")).unwrap();
        fs::write(tmp.path().join("aa.txt"), "a").unwrap();
        fs::create_dir(tmp.path().join("two")).unwrap();

        let dir = resolve_path(&root, None).unwrap();
        let listing = list_directory(&dir).unwrap();

        assert!(listing.items[0].is_directory);
        assert!(listing.items[1].is_directory);
        assert!(!listing.items[2].is_directory);
        assert!(!listing.items[3].is_directory);
    }

    #[test]
    fn test_missing_directory() {
        let (_tmp, root) = setup();
        let dir = resolve_path(&root, Some("missing")).unwrap();

        assert!(matches!(list_directory(&dir), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_listing_a_file() {
        let (tmp, root) = setup();
        fs::write(tmp.path().join("a.txt"), "hello").unwrap();
        let dir = resolve_path(&root, Some("a.txt")).unwrap();

        assert!(matches!(
            list_directory(&dir),
            Err(StorageError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_listing_below_a_file() {
        let (tmp, root) = setup();
        fs::write(tmp.path().join("f.txt"), "hello").unwrap();
        let dir = resolve_path(&root, Some("f.txt/sub")).unwrap();

        assert!(matches!(
            list_directory(&dir),
            Err(StorageError::NotADirectory(_))
        ));
        assert!(matches!(
            search_directory(&dir, "a"),
            Err(StorageError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let (tmp, root) = setup();
        fs::write(tmp.path().join("readme.txt"), "docs").unwrap();
        fs::write(tmp.path().join("main.rs"), "fn main() {}").unwrap();
        fs::create_dir(tmp.path().join("Resources")).unwrap();

        let dir = resolve_path(&root, None).unwrap();
        let listing = search_directory(&dir, "RE").unwrap();

        let mut found = names(&listing);
        found.sort();
        assert_eq!(found, vec!["Resources", "readme.txt"]);
        assert_eq!(listing.total_count, 2);
        assert_eq!(listing.total_size, 4);
    }

    #[test]
    fn test_search_is_not_recursive() {
        let (tmp, root) = setup();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub/report.txt"), "x").unwrap();

        let dir = resolve_path(&root, None).unwrap();
        let listing = search_directory(&dir, "report").unwrap();
        assert!(listing.is_empty());
    }

    #[test]
    fn test_search_without_matches() {
        let (tmp, root) = setup();
        fs::write(tmp.path().join("a.txt"), "hello").unwrap();

        let dir = resolve_path(&root, None).unwrap();
        let listing = search_directory(&dir, "zzz").unwrap();
        assert_eq!(listing.total_count, 0);
        assert_eq!(listing.total_size, 0);
    }

    #[test]
    fn test_empty_search_term_rejected() {
        let (_tmp, root) = setup();
        let dir = resolve_path(&root, None).unwrap();

        for term in ["", "   "] {
            assert!(matches!(
                search_directory(&dir, term),
                Err(StorageError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_search_in_missing_directory() {
        let (_tmp, root) = setup();
        let dir = resolve_path(&root, Some("nope")).unwrap();

        assert!(matches!(
            search_directory(&dir, "a"),
            Err(StorageError::NotFound(_))
        ));
    }
}
