//! Request DTOs for the HTTP API.

use utoipa::ToSchema;

/// Multipart form accepted by the upload endpoint.
///
/// The handler reads the form field by field; this type only describes it.
#[allow(dead_code)]
#[derive(Debug, ToSchema)]
pub struct UploadForm {
    /// File content. Its part filename and content type are stored with it.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}
