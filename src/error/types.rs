//! Error types
//!
//! Defines domain-specific error types for storage, the HTTP protocol layer,
//! and server startup.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Storage module errors
///
/// Raised by path resolution, listing, search and the file gateway. The
/// protocol layer maps each variant to an HTTP status.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The resolved path escapes the configured root.
    #[error("Access to the specified path is denied: {0}")]
    AccessDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Is a directory: {0}")]
    IsADirectory(String),

    /// Malformed or unsafe caller input.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Payload too large: {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: u64, limit: u64 },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// HTTP protocol errors
///
/// Raised while reading and parsing a request before it reaches a handler.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Request headers exceed {0} bytes")]
    HeadersTooLarge(usize),

    #[error("Request body of {size} bytes exceeds limit of {limit} bytes")]
    BodyTooLarge { size: u64, limit: u64 },

    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("Connection closed before a full request was received")]
    ConnectionClosed,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Server startup errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid root directory {path}: {reason}")]
    InvalidRoot { path: PathBuf, reason: String },

    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
