//! File service for dropshare.
//!
//! This module ties the metadata store and the blob store together:
//! - Upload with type and size checks, blob first then record
//! - Lookup, listing and download
//! - Deletion, blob first then record
//! - Purging of expired files

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use futures::{Stream, StreamExt};
use tracing::{debug, error, info, warn};

use crate::config::FilesConfig;
use crate::db::Database;
use crate::{Result, ShareError};

use super::mime::{normalize_mime, MimePolicy, FALLBACK_MIME_TYPE, SNIFF_LEN};
use super::record::{FileRecord, FileRepository, NewFileRecord};
use super::short_id::{generate_short_id, is_valid_short_id, DEFAULT_SHORT_ID_LENGTH};
use super::storage::{BlobStore, BlobWriter};
use super::{DEFAULT_MAX_UPLOAD_SIZE, DEFAULT_RETENTION_HOURS, MAX_FILENAME_LENGTH};

/// Attempts at drawing an unused short identifier before giving up.
const MAX_SHORT_ID_ATTEMPTS: usize = 5;

/// Request data for file upload. The content is passed separately as a stream.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Original filename.
    pub original_name: String,
    /// Client-declared MIME type.
    pub declared_type: Option<String>,
}

impl UploadRequest {
    /// Create a new upload request.
    pub fn new(original_name: impl Into<String>, declared_type: Option<&str>) -> Self {
        Self {
            original_name: original_name.into(),
            declared_type: declared_type.map(str::to_string),
        }
    }
}

/// Result of a file download.
#[derive(Debug)]
pub struct DownloadResult {
    /// File record.
    pub record: FileRecord,
    /// File content.
    pub content: Vec<u8>,
}

/// Outcome of one expiry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Records found past their expiry.
    pub expired: usize,
    /// Records removed together with their blob.
    pub purged: usize,
    /// Records left in place for the next sweep.
    pub failed: usize,
    /// Abandoned partial uploads removed.
    pub stale_partials: usize,
}

/// File service shared by all request handlers and the reaper.
pub struct FileService {
    db: Arc<Database>,
    store: BlobStore,
    policy: MimePolicy,
    max_upload_size: u64,
    retention: Duration,
    short_id_length: usize,
}

impl FileService {
    /// Create a new FileService with default limits.
    pub fn new(db: Arc<Database>, store: BlobStore, policy: MimePolicy) -> Self {
        Self {
            db,
            store,
            policy,
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            retention: Duration::hours(DEFAULT_RETENTION_HOURS),
            short_id_length: DEFAULT_SHORT_ID_LENGTH,
        }
    }

    /// Create a FileService from the `[files]` configuration section.
    ///
    /// The storage directory is created if needed.
    pub fn from_config(db: Arc<Database>, config: &FilesConfig) -> Result<Self> {
        let store = BlobStore::new(&config.storage_path)?;
        let policy = MimePolicy::new(&config.allowed_mime_types)
            .with_content_verification(config.verify_content);
        let retention_hours = i64::try_from(config.retention_hours)
            .map_err(|_| ShareError::Config("retention_hours out of range".to_string()))?;

        Ok(Self::new(db, store, policy)
            .with_max_upload_size(config.max_upload_size_bytes)
            .with_retention(Duration::hours(retention_hours))
            .with_short_id_length(config.short_id_length))
    }

    /// Set the maximum upload size in bytes.
    pub fn with_max_upload_size(mut self, max_size: u64) -> Self {
        self.max_upload_size = max_size;
        self
    }

    /// Set how long uploads are kept.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Set the length of issued short identifiers.
    pub fn with_short_id_length(mut self, length: usize) -> Self {
        self.short_id_length = length;
        self
    }

    /// Upload a file.
    ///
    /// The declared type is checked before anything is written. The content
    /// is streamed into a partial blob, size-checked chunk by chunk, and only
    /// committed once complete. The record is inserted last; if that fails the
    /// blob is removed again.
    ///
    /// # Returns
    /// The short identifier of the new file.
    pub async fn upload<S>(&self, request: &UploadRequest, content: S) -> Result<String>
    where
        S: Stream<Item = Result<Bytes>>,
    {
        let original_name = request.original_name.trim();
        if original_name.is_empty() {
            return Err(ShareError::Validation("missing filename".to_string()));
        }
        if original_name.chars().count() > MAX_FILENAME_LENGTH {
            return Err(ShareError::Validation(format!(
                "filename longer than {MAX_FILENAME_LENGTH} characters"
            )));
        }

        // Clients that send no type, or only the generic binary type, get one
        // guessed from the filename extension
        let declared = request
            .declared_type
            .as_deref()
            .filter(|t| normalize_mime(t) != FALLBACK_MIME_TYPE)
            .or_else(|| mime_guess::from_path(original_name).first_raw());

        let mime_type = match self.policy.check_declared(declared) {
            Ok(mime_type) => mime_type,
            Err(e) => {
                info!(original_name, error = %e, "Upload rejected");
                return Err(e);
            }
        };

        let storage_name = BlobStore::generate_storage_name(original_name);
        let mut writer = self.store.create(&storage_name).await?;

        if let Err(e) = self.receive(&mut writer, &mime_type, content).await {
            let received = writer.written();
            writer.abort().await;
            info!(original_name, received, error = %e, "Upload rejected");
            return Err(e);
        }

        let size = writer.commit().await?;

        match self
            .insert_record(&storage_name, original_name, &mime_type, size)
            .await
        {
            Ok(record) => {
                info!(
                    short_id = %record.short_id,
                    mime_type = %record.mime_type,
                    size,
                    "File uploaded"
                );
                Ok(record.short_id)
            }
            Err(e) => {
                error!(original_name, error = %e, "Failed to record upload, removing blob");
                if let Err(cleanup) = self.store.delete(&storage_name).await {
                    warn!(error = %cleanup, "Failed to remove orphaned blob");
                }
                Err(e)
            }
        }
    }

    /// Drain the content stream into the writer, enforcing the size limit
    /// and, when enabled, content verification.
    async fn receive<S>(&self, writer: &mut BlobWriter, mime_type: &str, content: S) -> Result<()>
    where
        S: Stream<Item = Result<Bytes>>,
    {
        let verify = self.policy.verifies_content();
        let mut head: Vec<u8> = Vec::new();
        let mut verified = !verify;

        let mut content = std::pin::pin!(content);
        while let Some(chunk) = content.next().await {
            let chunk = chunk?;

            if writer.written() + chunk.len() as u64 > self.max_upload_size {
                return Err(ShareError::FileTooLarge {
                    limit: self.max_upload_size,
                });
            }

            if !verified {
                let take = (SNIFF_LEN - head.len()).min(chunk.len());
                head.extend_from_slice(&chunk[..take]);
                if head.len() >= SNIFF_LEN {
                    self.policy.check_content(mime_type, &head)?;
                    verified = true;
                }
            }

            writer.write(&chunk).await?;
        }

        if !verified {
            self.policy.check_content(mime_type, &head)?;
        }

        Ok(())
    }

    async fn insert_record(
        &self,
        storage_name: &str,
        original_name: &str,
        mime_type: &str,
        size: u64,
    ) -> Result<FileRecord> {
        let short_id = self.issue_short_id().await?;
        let record = NewFileRecord::new(
            short_id,
            storage_name,
            original_name,
            mime_type,
            size,
            Utc::now(),
            self.retention,
        );

        FileRepository::new(self.db.pool()).create(&record).await
    }

    /// Draw a short identifier not used by any live record.
    async fn issue_short_id(&self) -> Result<String> {
        let repo = FileRepository::new(self.db.pool());
        for _ in 0..MAX_SHORT_ID_ATTEMPTS {
            let candidate = generate_short_id(self.short_id_length);
            if !repo.short_id_exists(&candidate).await? {
                return Ok(candidate);
            }
            debug!(short_id = %candidate, "Short id collision, retrying");
        }

        Err(ShareError::Storage(
            "could not allocate a unique short id".to_string(),
        ))
    }

    /// Get a file record by short identifier.
    pub async fn get(&self, short_id: &str) -> Result<FileRecord> {
        if !is_valid_short_id(short_id) {
            return Err(ShareError::NotFound("file".to_string()));
        }

        FileRepository::new(self.db.pool())
            .get_by_short_id(short_id)
            .await?
            .ok_or_else(|| ShareError::NotFound("file".to_string()))
    }

    /// List all files, newest first.
    pub async fn list(&self) -> Result<Vec<FileRecord>> {
        FileRepository::new(self.db.pool()).list_all().await
    }

    /// Download a file.
    ///
    /// A record whose blob has vanished is reported as a consistency error.
    pub async fn download(&self, short_id: &str) -> Result<DownloadResult> {
        let record = self.get(short_id).await?;

        match self.store.load(&record.storage_name).await {
            Ok(content) => {
                debug!(short_id, size = content.len(), "File downloaded");
                Ok(DownloadResult { record, content })
            }
            Err(ShareError::NotFound(_)) => {
                error!(short_id, "Blob missing for existing record");
                Err(ShareError::Consistency(format!(
                    "content missing for file {short_id}"
                )))
            }
            Err(e) => Err(e),
        }
    }

    /// Delete a file.
    ///
    /// The blob goes first. If it cannot be removed the record is kept and a
    /// storage error is returned; a blob that is already gone does not block
    /// removal of the record.
    pub async fn delete(&self, short_id: &str) -> Result<()> {
        let record = self.get(short_id).await?;

        match self.store.delete(&record.storage_name).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(short_id, "Blob already missing, removing record only");
            }
            Err(e) => {
                error!(short_id, error = %e, "Failed to delete blob");
                return Err(ShareError::Storage(format!(
                    "failed to delete content of file {short_id}"
                )));
            }
        }

        // A concurrent delete may have removed the record in between
        if !FileRepository::new(self.db.pool())
            .delete_by_short_id(short_id)
            .await?
        {
            return Err(ShareError::NotFound("file".to_string()));
        }

        info!(short_id, "File deleted");
        Ok(())
    }

    /// Remove every file expired at `now`, plus stale partial uploads.
    ///
    /// A failure on one file is logged and counted; the rest of the sweep
    /// continues. Only a failure to list expired records is returned.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let repo = FileRepository::new(self.db.pool());
        let expired = repo.list_expired(now).await?;

        let mut report = SweepReport {
            expired: expired.len(),
            ..SweepReport::default()
        };

        for record in &expired {
            match self.store.delete(&record.storage_name).await {
                Ok(true) => {}
                Ok(false) => {
                    warn!(short_id = %record.short_id, "Expired file had no blob");
                }
                Err(e) => {
                    warn!(
                        short_id = %record.short_id,
                        error = %e,
                        "Failed to delete expired blob, will retry"
                    );
                    report.failed += 1;
                    continue;
                }
            }

            match repo.delete_by_short_id(&record.short_id).await {
                Ok(_) => {
                    debug!(short_id = %record.short_id, "Expired file purged");
                    report.purged += 1;
                }
                Err(e) => {
                    warn!(
                        short_id = %record.short_id,
                        error = %e,
                        "Failed to delete expired record"
                    );
                    report.failed += 1;
                }
            }
        }

        let partial_age = self
            .retention
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);
        match self.store.remove_stale_partials(partial_age).await {
            Ok(removed) => report.stale_partials = removed,
            Err(e) => warn!(error = %e, "Failed to scan for stale partial uploads"),
        }

        Ok(report)
    }

    /// Get the blob store.
    pub fn store(&self) -> &BlobStore {
        &self.store
    }

    /// Get the maximum upload size in bytes.
    pub fn max_upload_size(&self) -> u64 {
        self.max_upload_size
    }

    /// Get the retention period.
    pub fn retention(&self) -> Duration {
        self.retention
    }
}

impl std::fmt::Debug for FileService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileService")
            .field("store", &self.store)
            .field("max_upload_size", &self.max_upload_size)
            .field("retention", &self.retention)
            .finish()
    }
}
