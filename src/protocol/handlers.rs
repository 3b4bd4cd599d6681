//! Request handlers module for the RAX file browser.
//!
//! This module routes parsed HTTP requests to the storage layer and turns
//! the results, or their errors, into responses.

use log::info;

use crate::error::handlers::{client_message, error_to_status, protocol_error_to_status};
use crate::error::{ProtocolError, StorageError};
use crate::protocol::multipart::{FormPart, boundary_from_content_type, parse_multipart};
use crate::protocol::request::{HttpRequest, Method};
use crate::protocol::responses::{
    BAD_REQUEST, HttpResponse, METHOD_NOT_ALLOWED, NOT_FOUND, OK,
};
use crate::server::AppState;
use crate::storage::{
    delete_file, list_directory, prepare_file_retrieval, prepare_file_storage, resolve_path,
    search_directory,
};
use crate::transfer::{read_download, store_upload};

const INDEX_FILE: &str = "index.html";

/// The API endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Browse,
    Search,
    Upload,
    Download,
    Delete,
}

impl Route {
    /// Match a request path against the API endpoints.
    pub fn parse(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            "/api/directory/browse" => Some(Route::Browse),
            "/api/directory/search" => Some(Route::Search),
            "/api/directory/upload" => Some(Route::Upload),
            "/api/directory/download" => Some(Route::Download),
            "/api/directory/delete" => Some(Route::Delete),
            _ => None,
        }
    }

    /// The single method each endpoint accepts.
    pub fn method(&self) -> Method {
        match self {
            Route::Browse | Route::Search | Route::Download => Method::Get,
            Route::Upload => Method::Post,
            Route::Delete => Method::Delete,
        }
    }
}

/// Dispatches a request to its handler.
pub async fn handle_request(request: &HttpRequest, state: &AppState) -> HttpResponse {
    match Route::parse(&request.path) {
        Some(route) if route.method() != request.method => method_not_allowed(route.method()),
        Some(Route::Browse) => handle_browse(request, state),
        Some(Route::Search) => handle_search(request, state),
        Some(Route::Upload) => handle_upload(request, state).await,
        Some(Route::Download) => handle_download(request, state).await,
        Some(Route::Delete) => handle_delete(request, state),
        None if request.path.starts_with("/api/") => {
            HttpResponse::error(NOT_FOUND, "Unknown API endpoint.")
        }
        None if request.method != Method::Get => method_not_allowed(Method::Get),
        None => handle_static(request, state).await,
    }
}

/// Response for a request that failed before reaching a handler.
pub fn protocol_error_response(err: &ProtocolError) -> HttpResponse {
    HttpResponse::error(protocol_error_to_status(err), &err.to_string())
}

fn storage_error_response(err: &StorageError, context: &str) -> HttpResponse {
    HttpResponse::error(error_to_status(err), &client_message(err, context))
}

fn method_not_allowed(allowed: Method) -> HttpResponse {
    HttpResponse::error(METHOD_NOT_ALLOWED, "Method not allowed.")
        .with_header("Allow", allowed.as_str())
}

/// Handles `GET /api/directory/browse?path=`.
fn handle_browse(request: &HttpRequest, state: &AppState) -> HttpResponse {
    let result = resolve_path(&state.root, request.query_param("path"))
        .and_then(|dir| list_directory(&dir));

    match result {
        Ok(listing) => HttpResponse::json(OK, &listing),
        Err(e) => storage_error_response(&e, "accessing the directory"),
    }
}

/// Handles `GET /api/directory/search?path=&searchTerm=`.
fn handle_search(request: &HttpRequest, state: &AppState) -> HttpResponse {
    let search_term = request.query_param("searchTerm").unwrap_or("");

    let result = resolve_path(&state.root, request.query_param("path"))
        .and_then(|dir| search_directory(&dir, search_term));

    match result {
        Ok(listing) => HttpResponse::json(OK, &listing),
        Err(e) => storage_error_response(&e, "searching the directory"),
    }
}

/// Handles `POST /api/directory/upload`.
///
/// Every `file` part is stored under the directory named by the `path`
/// field. Storing stops at the first failure.
async fn handle_upload(request: &HttpRequest, state: &AppState) -> HttpResponse {
    let parts = match request
        .header("content-type")
        .ok_or_else(|| ProtocolError::UnsupportedContentType("none".into()))
        .and_then(boundary_from_content_type)
        .and_then(|boundary| parse_multipart(&request.body, &boundary))
    {
        Ok(parts) => parts,
        Err(e) => return protocol_error_response(&e),
    };

    let sub_path = parts
        .iter()
        .find(|part| part.name == "path" && part.file_name.is_none())
        .map(FormPart::text);

    let files: Vec<&FormPart> = parts
        .iter()
        .filter(|part| part.name == "file" && part.file_name.is_some())
        .collect();

    if files.is_empty() || files.iter().any(|file| file.data.is_empty()) {
        return HttpResponse::error(BAD_REQUEST, "No file was uploaded.");
    }

    for file in files {
        let file_name = file.file_name.as_deref().unwrap_or_default();

        let target = match prepare_file_storage(&state.root, sub_path.as_deref(), file_name) {
            Ok(target) => target,
            Err(e) => return storage_error_response(&e, "uploading the file"),
        };

        if let Err(e) = store_upload(&target, &file.data, state.max_upload_bytes).await {
            return storage_error_response(&e, "uploading the file");
        }

        info!("Uploaded {} ({} bytes)", target, file.data.len());
    }

    HttpResponse::message(OK, "File uploaded successfully.")
}

/// Handles `GET /api/directory/download?path=`.
async fn handle_download(request: &HttpRequest, state: &AppState) -> HttpResponse {
    let target = match prepare_file_retrieval(&state.root, request.query_param("path")) {
        Ok(target) => target,
        Err(e) => return storage_error_response(&e, "downloading the file"),
    };

    match read_download(&target).await {
        Ok(bytes) => HttpResponse::attachment(target.content_type, &target.file_name, bytes),
        Err(e) => storage_error_response(&e, "downloading the file"),
    }
}

/// Handles `DELETE /api/directory/delete?path=`.
fn handle_delete(request: &HttpRequest, state: &AppState) -> HttpResponse {
    match delete_file(&state.root, request.query_param("path")) {
        Ok(_) => HttpResponse::message(OK, "File deleted successfully."),
        Err(e) => storage_error_response(&e, "deleting the file"),
    }
}

/// Serves front-end assets from the web root, confined the same way as
/// the file API.
async fn handle_static(request: &HttpRequest, state: &AppState) -> HttpResponse {
    let Some(web_root) = &state.web_root else {
        return HttpResponse::error(NOT_FOUND, "Not found.");
    };

    let mut path = match request.decoded_path() {
        Ok(path) => path,
        Err(e) => return protocol_error_response(&e),
    };
    if path.ends_with('/') {
        path.push_str(INDEX_FILE);
    }

    let target = match prepare_file_retrieval(web_root, Some(&path)) {
        Ok(target) => target,
        Err(e) => return storage_error_response(&e, "serving the asset"),
    };

    match read_download(&target).await {
        Ok(bytes) => HttpResponse::new(OK, target.content_type, bytes),
        Err(e) => storage_error_response(&e, "serving the asset"),
    }
}
