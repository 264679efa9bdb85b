//! dropshare - temporary file sharing service
//!
//! Upload a file, get a short identifier back, and share it. Files are
//! removed automatically once their retention period has passed.

pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use config::Config;
pub use db::Database;
pub use error::{Result, ShareError};
pub use file::{
    start_reaper, BlobStore, DownloadResult, ExpiryReaper, FileRecord, FileService, MimePolicy,
    SweepReport, UploadRequest,
};
pub use web::WebServer;
