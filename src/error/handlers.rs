//! Error handlers
//!
//! Maps domain errors onto HTTP status codes and client-facing messages.

use crate::error::types::{ProtocolError, StorageError};
use log::{error, warn};

/// Convert a storage error to an HTTP status code
pub fn error_to_status(err: &StorageError) -> u16 {
    match err {
        StorageError::AccessDenied(_) => 403,
        StorageError::NotFound(_) => 404,
        StorageError::NotADirectory(_) => 400,
        StorageError::IsADirectory(_) => 400,
        StorageError::InvalidArgument(_) => 400,
        StorageError::PayloadTooLarge { .. } => 413,
        StorageError::Io(_) => 500,
    }
}

/// Convert a protocol error to an HTTP status code
pub fn protocol_error_to_status(err: &ProtocolError) -> u16 {
    match err {
        ProtocolError::MalformedRequest(_) => 400,
        ProtocolError::HeadersTooLarge(_) => 431,
        ProtocolError::BodyTooLarge { .. } => 413,
        ProtocolError::UnsupportedContentType(_) => 415,
        ProtocolError::ConnectionClosed => 400,
        ProtocolError::Io(_) => 500,
    }
}

/// Message safe to return to the client.
///
/// I/O failures are logged in full and reported generically so host paths
/// and OS error text never reach the response body.
pub fn client_message(err: &StorageError, context: &str) -> String {
    match err {
        StorageError::Io(e) => {
            error!("{context}: {e}");
            format!("An error occurred while {context}.")
        }
        other => {
            warn!("{context}: {other}");
            other.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_storage_status_mapping() {
        assert_eq!(error_to_status(&StorageError::AccessDenied("x".into())), 403);
        assert_eq!(error_to_status(&StorageError::NotFound("x".into())), 404);
        assert_eq!(error_to_status(&StorageError::NotADirectory("x".into())), 400);
        assert_eq!(error_to_status(&StorageError::IsADirectory("x".into())), 400);
        assert_eq!(error_to_status(&StorageError::InvalidArgument("x".into())), 400);
        assert_eq!(
            error_to_status(&StorageError::PayloadTooLarge { size: 2, limit: 1 }),
            413
        );
        assert_eq!(
            error_to_status(&StorageError::Io(io::Error::other("disk"))),
            500
        );
    }

    #[test]
    fn test_protocol_status_mapping() {
        assert_eq!(
            protocol_error_to_status(&ProtocolError::MalformedRequest("x".into())),
            400
        );
        assert_eq!(protocol_error_to_status(&ProtocolError::HeadersTooLarge(10)), 431);
        assert_eq!(
            protocol_error_to_status(&ProtocolError::BodyTooLarge { size: 2, limit: 1 }),
            413
        );
    }

    #[test]
    fn test_io_errors_are_reported_generically() {
        let err = StorageError::Io(io::Error::other("/secret/host/path"));
        let msg = client_message(&err, "browsing the directory");
        assert_eq!(msg, "An error occurred while browsing the directory.");
        assert!(!msg.contains("/secret"));
    }
}
