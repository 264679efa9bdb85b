//! HTTP API module for dropshare.
//!
//! This module provides the REST interface for uploading, inspecting,
//! downloading and deleting shared files.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::create_router;
pub use server::WebServer;
