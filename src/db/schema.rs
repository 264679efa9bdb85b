//! Database schema and migrations for dropshare.
//!
//! Migrations are applied sequentially when the database is first opened or
//! upgraded; the `schema_version` table records which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: uploaded file records
    r#"
CREATE TABLE files (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    short_id        TEXT NOT NULL UNIQUE,   -- public identifier
    storage_name    TEXT NOT NULL UNIQUE,   -- blob name under the storage dir
    original_name   TEXT NOT NULL,
    mime_type       TEXT NOT NULL,
    size_bytes      INTEGER NOT NULL,
    uploaded_at     TEXT NOT NULL,
    expires_at      TEXT NOT NULL
);

CREATE INDEX idx_files_expires_at ON files(expires_at);
"#,
];
