//! File management module for dropshare.
//!
//! This module provides the temporary file sharing core:
//! - Short identifier generation
//! - Upload type policy
//! - Blob storage with partial-write commit
//! - File record persistence
//! - Upload/download/delete service and the expiry reaper

mod mime;
mod reaper;
mod record;
mod service;
mod short_id;
mod storage;

pub use mime::{normalize_mime, MimePolicy, FALLBACK_MIME_TYPE, SNIFF_LEN};
pub use reaper::{start_reaper, ExpiryReaper, DEFAULT_REAPER_INTERVAL_SECS};
pub use record::{FileRecord, FileRepository, NewFileRecord};
pub use service::{DownloadResult, FileService, SweepReport, UploadRequest};
pub use short_id::{generate_short_id, is_valid_short_id, DEFAULT_SHORT_ID_LENGTH};
pub use storage::{BlobStore, BlobWriter};

/// Maximum length for an original filename (in characters).
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Default maximum upload size (5MB).
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 5 * 1024 * 1024;

/// Default retention period in hours.
pub const DEFAULT_RETENTION_HOURS: i64 = 24;
