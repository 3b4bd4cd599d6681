//! Module `file_ops`
//!
//! Writes uploaded content to disk and reads files back for download.
//! File handles are scoped to each call and closed on every exit path,
//! including failures part-way through a transfer.

use log::{error, info};
use std::io;
use std::path::Path;
use tempfile::{Builder, NamedTempFile};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::StorageError;
use crate::storage::{DownloadTarget, ResolvedPath};

/// Stores uploaded bytes at `target`, replacing any existing file.
///
/// Data goes to a uniquely named hidden file in the destination directory
/// and is renamed over the destination once fully written and flushed, so
/// readers never see a half-written file. The staging file is created
/// exclusively, so it never clobbers an existing file, and it is removed if
/// anything fails.
pub async fn store_upload(
    target: &ResolvedPath,
    data: &[u8],
    max_bytes: u64,
) -> Result<u64, StorageError> {
    let size = data.len() as u64;
    if size > max_bytes {
        return Err(StorageError::PayloadTooLarge {
            size,
            limit: max_bytes,
        });
    }

    info!("Starting file upload: {target} ({size} bytes)");

    if let Err(e) = write_then_persist(target.real_path(), data).await {
        error!("Failed to store upload {target}: {e}");
        return Err(StorageError::Io(e));
    }

    info!("File upload completed successfully: {target} ({size} bytes)");
    Ok(size)
}

/// Reads the whole of a download target into memory.
pub async fn read_download(target: &DownloadTarget) -> Result<Vec<u8>, StorageError> {
    let mut file = match File::open(target.path.real_path()).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(StorageError::NotFound(target.path.virtual_path().to_string()));
        }
        Err(e) => {
            error!("Failed to open file {}: {e}", target.path);
            return Err(StorageError::Io(e));
        }
    };

    let mut buffer = Vec::with_capacity(target.size as usize);
    file.read_to_end(&mut buffer).await?;

    info!(
        "File download prepared: {} ({} bytes)",
        target.path,
        buffer.len()
    );

    Ok(buffer)
}

async fn write_then_persist(final_path: &Path, data: &[u8]) -> io::Result<()> {
    let staged = staging_file_for(final_path)?;
    {
        let mut file = File::from_std(staged.as_file().try_clone()?);
        file.write_all(data).await?;
        file.flush().await?;
        file.sync_all().await?;
    }
    // Dropping the staging file on error deletes it
    staged.persist(final_path)?;
    Ok(())
}

fn staging_file_for(final_path: &Path) -> io::Result<NamedTempFile> {
    let parent = final_path.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "upload target has no parent")
    })?;
    let name = final_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(".upload")
        .tempfile_in(parent)
}
