//! File transfer
//!
//! Moves file content between HTTP bodies and disk.

pub mod file_ops;

pub use file_ops::{read_download, store_upload};
