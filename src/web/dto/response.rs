//! Response DTOs for the HTTP API.

use serde::Serialize;
use utoipa::ToSchema;

use crate::file::FileRecord;

/// Response carrying only a status message.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    /// Status message.
    pub message: String,
}

impl MessageResponse {
    /// Create a new message response.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Upload response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Status message.
    pub message: String,
    /// Identifier to fetch the file with.
    pub short_id: String,
}

/// Single file response.
#[derive(Debug, Serialize, ToSchema)]
pub struct FileResponse {
    /// Status message.
    pub message: String,
    /// File record.
    pub data: FileRecord,
}

/// File list response.
#[derive(Debug, Serialize, ToSchema)]
pub struct FileListResponse {
    /// Status message.
    pub message: String,
    /// File records, newest first.
    pub data: Vec<FileRecord>,
}
