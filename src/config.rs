//! Configuration module for dropshare.

use serde::Deserialize;
use std::path::Path;

use crate::{Result, ShareError};

/// MIME type for Word (.docx) documents.
pub const DOCX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins (empty = any origin).
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/dropshare.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Upload and blob storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Directory where uploaded blobs are stored.
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    /// Maximum upload size in bytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_bytes: u64,
    /// How long an upload is kept before the reaper removes it.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,
    /// Declared MIME types accepted for upload.
    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,
    /// Length of generated short identifiers.
    #[serde(default = "default_short_id_length")]
    pub short_id_length: usize,
    /// Check the leading bytes of each upload against its declared type.
    #[serde(default)]
    pub verify_content: bool,
}

fn default_storage_path() -> String {
    "uploads".to_string()
}

fn default_max_upload_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_retention_hours() -> u64 {
    24
}

fn default_allowed_mime_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "application/pdf".to_string(),
        "text/plain".to_string(),
        DOCX_MIME_TYPE.to_string(),
    ]
}

fn default_short_id_length() -> usize {
    10
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            max_upload_size_bytes: default_max_upload_size(),
            retention_hours: default_retention_hours(),
            allowed_mime_types: default_allowed_mime_types(),
            short_id_length: default_short_id_length(),
            verify_content: false,
        }
    }
}

/// Expiry reaper configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReaperConfig {
    /// Whether the background reaper runs.
    #[serde(default = "default_reaper_enabled")]
    pub enabled: bool,
    /// Seconds between sweeps.
    #[serde(default = "default_reaper_interval")]
    pub interval_secs: u64,
}

fn default_reaper_enabled() -> bool {
    true
}

fn default_reaper_interval() -> u64 {
    3600 // 1 hour
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            enabled: default_reaper_enabled(),
            interval_secs: default_reaper_interval(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/dropshare.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Upload and storage configuration.
    #[serde(default)]
    pub files: FilesConfig,
    /// Expiry reaper configuration.
    #[serde(default)]
    pub reaper: ReaperConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ShareError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ShareError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `DROPSHARE_PORT`: HTTP port
    /// - `DROPSHARE_DATABASE_PATH`: SQLite database file
    /// - `DROPSHARE_STORAGE_PATH`: blob directory
    pub fn apply_env_overrides(&mut self) {
        if let Some(port) = non_empty_env("DROPSHARE_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid DROPSHARE_PORT value: {}", port),
            }
        }
        if let Some(path) = non_empty_env("DROPSHARE_DATABASE_PATH") {
            self.database.path = path;
        }
        if let Some(path) = non_empty_env("DROPSHARE_STORAGE_PATH") {
            self.files.storage_path = path;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.files.max_upload_size_bytes == 0 {
            return Err(ShareError::Config(
                "files.max_upload_size_bytes must be greater than 0".to_string(),
            ));
        }
        if self.files.allowed_mime_types.is_empty() {
            return Err(ShareError::Config(
                "files.allowed_mime_types must not be empty".to_string(),
            ));
        }
        if self.files.retention_hours == 0 {
            return Err(ShareError::Config(
                "files.retention_hours must be greater than 0".to_string(),
            ));
        }
        if !(6..=32).contains(&self.files.short_id_length) {
            return Err(ShareError::Config(
                "files.short_id_length must be between 6 and 32".to_string(),
            ));
        }
        if self.reaper.interval_secs == 0 {
            return Err(ShareError::Config(
                "reaper.interval_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
