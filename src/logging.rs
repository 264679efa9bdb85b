//! Logging setup for dropshare.
//!
//! `RUST_LOG` takes precedence when set; otherwise the configured level
//! applies to everything except sqlx, whose per-query statements are held
//! at `warn` so sweeps do not flood the log.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::Result;

/// Parse a configured level, falling back to `info`.
fn parse_level(level: &str) -> Level {
    match level.trim().to_lowercase().as_str() {
        "warning" => Level::WARN,
        other => other.parse().unwrap_or(Level::INFO),
    }
}

/// Filter directives used when `RUST_LOG` is not set.
fn default_directives(level: Level) -> String {
    let sqlx = level.min(Level::WARN);
    format!("{level},sqlx={sqlx}").to_lowercase()
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(parse_level(level))))
}

/// Open the log file for appending, creating its directory if needed.
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    Ok(File::options().create(true).append(true).open(path)?)
}

/// Initialize logging to stdout and the configured log file.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let log_file = Arc::new(open_log_file(Path::new(&config.file))?);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout.and(log_file))
                .with_ansi(false)
                .with_target(true),
        )
        .with(build_filter(&config.level))
        .init();

    tracing::debug!(file = %config.file, level = %config.level, "Logging initialized");
    Ok(())
}

/// Initialize stdout-only logging, used when the log file cannot be opened.
pub fn init_console_only(level: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(build_filter(level))
        .init();
}
