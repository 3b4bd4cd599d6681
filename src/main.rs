//! RAX File Browser - Entry Point
//!
//! Serves a web interface for browsing, searching, uploading, downloading
//! and deleting files inside a single sandboxed root directory.

use log::{error, info};
use std::process::ExitCode;

use rax_file_browser::{Server, ServerConfig};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize the logger (env_logger picks up RUST_LOG environment variable)
    env_logger::init();

    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!("Launching file browser...");

    let server = match Server::bind(&config).await {
        Ok(server) => server,
        Err(e) => {
            error!("Server startup failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    tokio::select! {
        _ = server.run() => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for shutdown signal: {e}");
            }
            info!("Shutting down");
        }
    }

    ExitCode::SUCCESS
}
