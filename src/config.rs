//! Configuration management for the RAX file browser
//!
//! All values are startup configuration: they are read once, validated, and
//! then shared read-only for the lifetime of the process.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "RAX_BROWSER_CONFIG";

/// Prefix for environment overrides, e.g. `RAX_BROWSER_ROOT_DIRECTORY`
pub const ENV_PREFIX: &str = "RAX_BROWSER";

const DEFAULT_CONFIG_PATH: &str = "config";

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Allowance on top of the upload limit for multipart headers and fields.
pub const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Complete server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// IP address to bind the HTTP listener
    pub bind_address: String,

    /// Port for the HTTP listener
    pub port: u16,

    /// Directory every browse/search/upload/download/delete is confined to
    pub root_directory: String,

    /// Directory holding the web front-end. Static serving is off when unset.
    #[serde(default)]
    pub web_root: Option<String>,

    /// Maximum size of a single uploaded file in MB
    pub max_upload_size_mb: u64,

    /// Maximum concurrent connections before new ones get 503
    pub max_connections: usize,

    /// Maximum size of the request line plus headers
    pub max_header_bytes: usize,
}

impl ServerConfig {
    /// Load configuration from `config.toml` (or the file named by
    /// `RAX_BROWSER_CONFIG`) with environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        Self::load_from(&path)
    }

    /// Load configuration from `path` with defaults and environment
    /// overrides. The file is optional.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("bind_address", "127.0.0.1")?
            .set_default("port", 8080)?
            .set_default("root_directory", "")?
            .set_default("max_upload_size_mb", 100)?
            .set_default("max_connections", 64)?
            .set_default("max_header_bytes", 16 * 1024)?
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Message("port cannot be 0".into()));
        }

        if self.root_directory.trim().is_empty() {
            return Err(ConfigError::Message(
                "root_directory must be set".into(),
            ));
        }

        if matches!(&self.web_root, Some(web_root) if web_root.trim().is_empty()) {
            return Err(ConfigError::Message(
                "web_root cannot be empty when set".into(),
            ));
        }

        if self.max_upload_size_mb == 0 {
            return Err(ConfigError::Message(
                "max_upload_size_mb must be greater than 0".into(),
            ));
        }

        let body_limit = self
            .max_upload_size_mb
            .checked_mul(BYTES_PER_MB)
            .and_then(|bytes| bytes.checked_add(MULTIPART_OVERHEAD));
        if body_limit.is_none() {
            return Err(ConfigError::Message(format!(
                "max_upload_size_mb is too large: {}",
                self.max_upload_size_mb
            )));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::Message(
                "max_connections must be greater than 0".into(),
            ));
        }

        if self.max_header_bytes < 1024 {
            return Err(ConfigError::Message(
                "max_header_bytes must be at least 1024".into(),
            ));
        }

        Ok(())
    }

    /// Get bind address and port as a socket address string
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn root_path(&self) -> PathBuf {
        PathBuf::from(&self.root_directory)
    }

    pub fn web_root_path(&self) -> Option<PathBuf> {
        self.web_root.as_ref().map(PathBuf::from)
    }

    /// Get maximum upload size in bytes
    pub fn max_upload_size_bytes(&self) -> u64 {
        self.max_upload_size_mb.saturating_mul(BYTES_PER_MB)
    }

    /// Maximum request body: one upload plus multipart framing
    pub fn max_request_body_bytes(&self) -> u64 {
        self.max_upload_size_bytes().saturating_add(MULTIPART_OVERHEAD)
    }
}
