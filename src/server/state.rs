//! Shared request state
//!
//! Immutable values built once at startup and shared by every connection.

use log::info;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::storage::RootDirectory;

/// Read-only state handed to every request handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Directory all file operations are confined to
    pub root: RootDirectory,
    /// Directory static front-end assets are served from, if any
    pub web_root: Option<RootDirectory>,
    /// Largest single file an upload may store
    pub max_upload_bytes: u64,
}

impl AppState {
    pub fn new(root: RootDirectory, web_root: Option<RootDirectory>, max_upload_bytes: u64) -> Self {
        Self {
            root,
            web_root,
            max_upload_bytes,
        }
    }

    /// Validate the configured directories and build the state.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        let root = RootDirectory::new(config.root_path())?;
        info!("Root directory: {}", root.path().display());

        let web_root = match config.web_root_path() {
            Some(path) => {
                let web_root = RootDirectory::new(path)?;
                info!("Serving static assets from {}", web_root.path().display());
                Some(web_root)
            }
            None => None,
        };

        Ok(Self::new(root, web_root, config.max_upload_size_bytes()))
    }
}
