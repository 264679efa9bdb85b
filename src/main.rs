use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};

use dropshare::{start_reaper, Config, Database, FileService, WebServer};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    // Load configuration
    let mut config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    // Initialize logging
    if let Err(e) = dropshare::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        dropshare::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    info!("dropshare - temporary file sharing");

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Fatal error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let db = Arc::new(Database::open(&config.database.path).await?);
    let service = Arc::new(FileService::from_config(db.clone(), &config.files)?);
    info!(
        storage = %config.files.storage_path,
        max_upload_size = config.files.max_upload_size_bytes,
        retention_hours = config.files.retention_hours,
        "File storage ready"
    );

    let reaper = if config.reaper.enabled {
        Some(start_reaper(service.clone(), config.reaper.interval_secs))
    } else {
        info!("Expiry reaper disabled");
        None
    };

    let server = WebServer::new(&config.server, service)?;
    let result = server.run().await;

    if let Some(handle) = reaper {
        handle.abort();
    }
    db.close().await;

    result?;
    Ok(())
}
