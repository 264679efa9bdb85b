//! Error types for dropshare.

use thiserror::Error;

/// Common error type for dropshare.
#[derive(Error, Debug)]
pub enum ShareError {
    /// Database error.
    ///
    /// Database errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// Database connection error.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Upload exceeded the configured size limit.
    #[error("file too large (max {limit} bytes)")]
    FileTooLarge {
        /// The configured limit in bytes.
        limit: u64,
    },

    /// Upload type is not in the allow-list.
    #[error("invalid file type: {0}")]
    InvalidFileType(String),

    /// Validation error for client input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Blob store failure that is not a plain I/O error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Metadata and blob store disagree.
    #[error("consistency error: {0}")]
    Consistency(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ShareError {
    /// Whether this error was caused by the client rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ShareError::FileTooLarge { .. }
                | ShareError::InvalidFileType(_)
                | ShareError::Validation(_)
                | ShareError::NotFound(_)
        )
    }
}

// Conversion from sqlx errors
impl From<sqlx::Error> for ShareError {
    fn from(e: sqlx::Error) -> Self {
        ShareError::Database(e.to_string())
    }
}

/// Result type alias for dropshare operations.
pub type Result<T> = std::result::Result<T, ShareError>;
