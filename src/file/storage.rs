//! Blob storage for dropshare.
//!
//! Uploaded bytes live in a single flat directory:
//! ```text
//! {base_path}/
//! ├── 1718000000000-3f2a9c1e-report.pdf
//! ├── 1718000000450-b71d04aa-notes.txt
//! └── 1718000001200-0c9e55d2-photo.png.part   (upload in progress)
//! ```
//! Names are `{unix millis}-{8 hex chars of a v4 UUID}-{sanitized original name}`,
//! so two uploads of the same file in the same millisecond still differ.
//! Writes go to a `.part` file that is renamed into place on commit.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::Utc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::{Result, ShareError};

/// Suffix of blobs still being written.
const PARTIAL_SUFFIX: &str = ".part";

/// Longest sanitized original-name component kept in a storage name.
const MAX_NAME_COMPONENT: usize = 100;

/// Filesystem-backed blob store.
#[derive(Debug, Clone)]
pub struct BlobStore {
    /// Base directory for blobs.
    base_path: PathBuf,
}

impl BlobStore {
    /// Create a new BlobStore with the given base path.
    ///
    /// The base directory will be created if it doesn't exist.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;

        Ok(Self { base_path })
    }

    /// Get the base path of this store.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Generate a new unique storage name for an upload.
    pub fn generate_storage_name(original_name: &str) -> String {
        let millis = Utc::now().timestamp_millis();
        let uuid = Uuid::new_v4().simple().to_string();
        format!(
            "{millis}-{}-{}",
            &uuid[..8],
            Self::sanitize_name(original_name)
        )
    }

    /// Reduce a client-supplied filename to a safe path component.
    fn sanitize_name(original_name: &str) -> String {
        // Only the last path segment, whichever separator the client used
        let base = original_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default();

        let cleaned: String = base
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .take(MAX_NAME_COMPONENT)
            .collect();

        let cleaned = cleaned.trim_start_matches('.');
        if cleaned.is_empty() {
            return "file".to_string();
        }

        // Committed names must never look like partial uploads
        match cleaned.strip_suffix(PARTIAL_SUFFIX) {
            Some(stem) => format!("{stem}_part"),
            None => cleaned.to_string(),
        }
    }

    /// Get the full path for a storage name.
    pub fn blob_path(&self, storage_name: &str) -> PathBuf {
        self.base_path.join(storage_name)
    }

    fn partial_path(&self, storage_name: &str) -> PathBuf {
        self.base_path
            .join(format!("{storage_name}{PARTIAL_SUFFIX}"))
    }

    /// Start writing a new blob.
    ///
    /// Fails if a blob or partial upload with this name already exists.
    pub async fn create(&self, storage_name: &str) -> Result<BlobWriter> {
        if storage_name.contains(['/', '\\']) || storage_name.starts_with('.') {
            return Err(ShareError::Storage(format!(
                "invalid storage name: {storage_name}"
            )));
        }

        let final_path = self.blob_path(storage_name);
        if fs::try_exists(&final_path).await? {
            return Err(ShareError::Storage(format!(
                "blob already exists: {storage_name}"
            )));
        }

        let partial_path = self.partial_path(storage_name);
        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&partial_path)
            .await?;

        Ok(BlobWriter {
            file,
            partial_path,
            final_path,
            written: 0,
        })
    }

    /// Save an in-memory blob under a freshly generated storage name.
    ///
    /// Returns the storage name.
    #[cfg(test)]
    pub async fn save(&self, content: &[u8], original_name: &str) -> Result<String> {
        let storage_name = Self::generate_storage_name(original_name);
        let mut writer = self.create(&storage_name).await?;
        if let Err(e) = writer.write(content).await {
            writer.abort().await;
            return Err(e);
        }
        writer.commit().await?;
        Ok(storage_name)
    }

    /// Load a blob into memory.
    pub async fn load(&self, storage_name: &str) -> Result<Vec<u8>> {
        match fs::read(self.blob_path(storage_name)).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(ShareError::NotFound(format!("blob {storage_name}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a blob.
    ///
    /// Returns `true` if the blob was deleted, `false` if it didn't exist.
    pub async fn delete(&self, storage_name: &str) -> Result<bool> {
        match fs::remove_file(self.blob_path(storage_name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Check if a blob exists.
    pub async fn exists(&self, storage_name: &str) -> bool {
        fs::try_exists(self.blob_path(storage_name))
            .await
            .unwrap_or(false)
    }

    /// Get the size of a stored blob.
    #[cfg(test)]
    pub async fn size(&self, storage_name: &str) -> Result<u64> {
        match fs::metadata(self.blob_path(storage_name)).await {
            Ok(m) => Ok(m.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(ShareError::NotFound(format!("blob {storage_name}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove partial uploads last modified more than `max_age` ago.
    ///
    /// These are left behind when the process dies mid-upload.
    pub async fn remove_stale_partials(&self, max_age: Duration) -> Result<usize> {
        let cutoff = SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let mut removed = 0;

        let mut entries = fs::read_dir(&self.base_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if !name.to_string_lossy().ends_with(PARTIAL_SUFFIX) {
                continue;
            }

            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(_) => continue,
            };

            if modified <= cutoff && fs::remove_file(entry.path()).await.is_ok() {
                removed += 1;
            }
        }

        Ok(removed)
    }

    /// List committed blob names (partial uploads excluded).
    #[cfg(test)]
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.base_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(PARTIAL_SUFFIX) && entry.file_type().await?.is_file() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

/// A blob being written.
///
/// Nothing is visible under the final name until [`BlobWriter::commit`].
/// Dropping the writer without committing leaves a `.part` file that
/// [`BlobStore::remove_stale_partials`] eventually collects; call
/// [`BlobWriter::abort`] to remove it immediately.
#[derive(Debug)]
pub struct BlobWriter {
    file: fs::File,
    partial_path: PathBuf,
    final_path: PathBuf,
    written: u64,
}

impl BlobWriter {
    /// Append a chunk.
    pub async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        self.file.write_all(chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush and move the blob to its final name. Returns the blob size.
    pub async fn commit(mut self) -> Result<u64> {
        let result = async {
            self.file.flush().await?;
            self.file.sync_all().await?;
            fs::rename(&self.partial_path, &self.final_path).await?;
            Ok::<_, ShareError>(())
        }
        .await;

        match result {
            Ok(()) => Ok(self.written),
            Err(e) => {
                self.abort().await;
                Err(e)
            }
        }
    }

    /// Discard the partial blob.
    pub async fn abort(self) {
        drop(self.file);
        if let Err(e) = fs::remove_file(&self.partial_path).await {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %self.partial_path.display(),
                    error = %e,
                    "Failed to remove partial upload"
                );
            }
        }
    }
}
