//! Expiry reaper for dropshare.
//!
//! This module provides the background task that periodically removes
//! files past their retention period.

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

use super::service::{FileService, SweepReport};

/// Default sweep interval in seconds (1 hour).
pub const DEFAULT_REAPER_INTERVAL_SECS: u64 = 3600;

/// Background remover of expired files.
///
/// Sweeps run back to back on a single task, so they never overlap. The
/// first sweep happens immediately on start.
pub struct ExpiryReaper {
    service: Arc<FileService>,
    sweep_interval: Duration,
}

impl ExpiryReaper {
    /// Create a new ExpiryReaper with the default interval.
    pub fn new(service: Arc<FileService>) -> Self {
        Self {
            service,
            sweep_interval: Duration::from_secs(DEFAULT_REAPER_INTERVAL_SECS),
        }
    }

    /// Create a new ExpiryReaper with a custom interval.
    pub fn with_interval(service: Arc<FileService>, interval_secs: u64) -> Self {
        Self {
            service,
            sweep_interval: Duration::from_secs(interval_secs.max(1)),
        }
    }

    /// Run the reaper loop.
    ///
    /// This method runs indefinitely.
    pub async fn run(&self) {
        info!(
            "Expiry reaper started (interval: {} seconds)",
            self.sweep_interval.as_secs()
        );

        let mut timer = interval(self.sweep_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            timer.tick().await;
            self.sweep_once().await;
        }
    }

    /// Run a single sweep and log its outcome.
    ///
    /// Returns `None` if expired files could not be listed.
    pub async fn sweep_once(&self) -> Option<SweepReport> {
        debug!("Sweeping expired files");

        let report = match self.service.purge_expired(Utc::now()).await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "Failed to list expired files");
                return None;
            }
        };

        if report.expired > 0 || report.stale_partials > 0 {
            info!(
                expired = report.expired,
                purged = report.purged,
                failed = report.failed,
                stale_partials = report.stale_partials,
                "Expiry sweep complete"
            );
        } else {
            debug!("No expired files");
        }

        Some(report)
    }
}

/// Start the expiry reaper on the current runtime.
pub fn start_reaper(service: Arc<FileService>, interval_secs: u64) -> JoinHandle<()> {
    let reaper = ExpiryReaper::with_interval(service, interval_secs);
    tokio::spawn(async move {
        reaper.run().await;
    })
}
