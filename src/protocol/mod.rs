//! HTTP protocol implementation
//!
//! Handles request parsing, routing, form decoding and response generation.

pub mod handlers;
pub mod multipart;
pub mod request;
pub mod responses;

pub use handlers::{Route, handle_request, protocol_error_response};
pub use request::{HttpRequest, Method, read_request};
pub use responses::HttpResponse;
