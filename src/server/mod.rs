//! Server core functionality
//!
//! This module contains the HTTP listener, per-connection handling,
//! and the shared state handed to request handlers.

pub mod core;
pub mod state;

pub use self::core::{ConnectionLimits, Server};
pub use state::AppState;
