//! File record types and repository.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::DbPool;
use crate::Result;

/// Metadata for an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Row ID.
    #[serde(skip)]
    pub id: i64,
    /// Public identifier.
    pub short_id: String,
    /// Blob name under the storage directory.
    #[serde(skip)]
    pub storage_name: String,
    /// Filename as sent by the client.
    pub original_name: String,
    /// Normalized declared MIME type.
    pub mime_type: String,
    /// Stored size in bytes.
    pub size_bytes: i64,
    /// When the file was uploaded.
    pub uploaded_at: DateTime<Utc>,
    /// When the file becomes eligible for removal.
    pub expires_at: DateTime<Utc>,
}

impl FileRecord {
    /// Whether the record has expired at `now`.
    #[cfg(test)]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Data for creating a new file record.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub short_id: String,
    pub storage_name: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl NewFileRecord {
    /// Create a new record uploaded at `now` and expiring `retention` later.
    pub fn new(
        short_id: impl Into<String>,
        storage_name: impl Into<String>,
        original_name: impl Into<String>,
        mime_type: impl Into<String>,
        size_bytes: u64,
        now: DateTime<Utc>,
        retention: Duration,
    ) -> Self {
        Self {
            short_id: short_id.into(),
            storage_name: storage_name.into(),
            original_name: original_name.into(),
            mime_type: mime_type.into(),
            size_bytes: i64::try_from(size_bytes).unwrap_or(i64::MAX),
            uploaded_at: now,
            expires_at: now + retention,
        }
    }
}

const SELECT_COLUMNS: &str =
    "id, short_id, storage_name, original_name, mime_type, size_bytes, uploaded_at, expires_at";

/// Repository for file record operations.
pub struct FileRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FileRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a new record.
    pub async fn create(&self, record: &NewFileRecord) -> Result<FileRecord> {
        let created = sqlx::query_as::<_, FileRecord>(&format!(
            "INSERT INTO files (short_id, storage_name, original_name, mime_type, size_bytes, uploaded_at, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(&record.short_id)
        .bind(&record.storage_name)
        .bind(&record.original_name)
        .bind(&record.mime_type)
        .bind(record.size_bytes)
        .bind(record.uploaded_at)
        .bind(record.expires_at)
        .fetch_one(self.pool)
        .await?;

        Ok(created)
    }

    /// Get a record by its short identifier.
    pub async fn get_by_short_id(&self, short_id: &str) -> Result<Option<FileRecord>> {
        let record = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {SELECT_COLUMNS} FROM files WHERE short_id = $1"
        ))
        .bind(short_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }

    /// Check whether a short identifier is taken.
    pub async fn short_id_exists(&self, short_id: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM files WHERE short_id = $1)")
                .bind(short_id)
                .fetch_one(self.pool)
                .await?;

        Ok(exists)
    }

    /// List all records, newest first.
    pub async fn list_all(&self) -> Result<Vec<FileRecord>> {
        let records = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {SELECT_COLUMNS} FROM files ORDER BY uploaded_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(records)
    }

    /// List records whose expiry is at or before `now`, oldest expiry first.
    pub async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<FileRecord>> {
        let records = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {SELECT_COLUMNS} FROM files WHERE expires_at <= $1 ORDER BY expires_at, id"
        ))
        .bind(now)
        .fetch_all(self.pool)
        .await?;

        Ok(records)
    }

    /// Delete a record by short identifier.
    ///
    /// Returns `true` if a row was removed.
    pub async fn delete_by_short_id(&self, short_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE short_id = $1")
            .bind(short_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count all records.
    #[cfg(test)]
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }
}
