//! API handlers for the HTTP API.

pub mod file;

pub use file::*;

use std::sync::Arc;

use crate::file::FileService;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// File service.
    pub service: Arc<FileService>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(service: Arc<FileService>) -> Self {
        Self { service }
    }
}
