//! File handlers for the HTTP API.

use axum::{
    body::Body,
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use futures::StreamExt;
use std::sync::Arc;

use crate::file::UploadRequest;
use crate::web::dto::{
    FileListResponse, FileResponse, MessageResponse, UploadForm, UploadResponse,
};
use crate::web::error::{ApiError, ErrorBody};
use crate::web::handlers::AppState;
use crate::ShareError;

/// Multipart field carrying the upload.
pub const UPLOAD_FIELD: &str = "file";

/// Generate a safe Content-Disposition header value for file downloads.
///
/// Control characters are removed, quotes and backslashes replaced, and
/// non-ASCII names get an RFC 5987 `filename*` parameter next to an ASCII
/// fallback.
fn content_disposition_header(filename: &str) -> String {
    let cleaned: String = filename.chars().filter(|c| !c.is_control()).collect();

    if cleaned.is_ascii() && !cleaned.contains(['"', '\\']) {
        return format!("attachment; filename=\"{cleaned}\"");
    }

    let fallback: String = cleaned
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if !c.is_ascii() => '_',
            c => c,
        })
        .collect();
    let encoded = urlencoding::encode(&cleaned);

    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

/// Translate a multipart read failure.
///
/// Hitting the request body limit means the upload was too large.
fn multipart_error(err: MultipartError, limit: u64) -> ShareError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ShareError::FileTooLarge { limit }
    } else {
        ShareError::Validation(format!("invalid multipart data: {}", err.body_text()))
    }
}

/// POST /files/upload - Upload a file.
///
/// Request body: multipart/form-data with a "file" field.
#[utoipa::path(
    post,
    path = "/files/upload",
    tag = "files",
    request_body(
        content = UploadForm,
        content_type = "multipart/form-data",
        description = "Form with a `file` field"
    ),
    responses(
        (status = 200, description = "File uploaded", body = UploadResponse),
        (status = 400, description = "Invalid type, too large, or no file", body = ErrorBody),
        (status = 500, description = "Storage failure", body = ErrorBody)
    )
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let limit = state.service.max_upload_size();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let request = UploadRequest::new(
            field.file_name().unwrap_or_default(),
            field.content_type(),
        );
        let content = field.map(move |chunk| chunk.map_err(|e| multipart_error(e, limit)));

        let short_id = state.service.upload(&request, content).await?;

        return Ok(Json(UploadResponse {
            message: "File successfully uploaded".to_string(),
            short_id,
        }));
    }

    Err(ApiError::bad_request("No file provided"))
}

/// GET /files/ - List all files.
#[utoipa::path(
    get,
    path = "/files/",
    tag = "files",
    responses(
        (status = 200, description = "All live files, newest first", body = FileListResponse),
        (status = 500, description = "Database failure", body = ErrorBody)
    )
)]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FileListResponse>, ApiError> {
    let data = state.service.list().await?;

    Ok(Json(FileListResponse {
        message: "Fetched all files".to_string(),
        data,
    }))
}

/// GET /files/:shortId - Get file metadata.
#[utoipa::path(
    get,
    path = "/files/{shortId}",
    tag = "files",
    params(
        ("shortId" = String, Path, description = "File short identifier")
    ),
    responses(
        (status = 200, description = "File metadata", body = FileResponse),
        (status = 404, description = "File not found", body = ErrorBody)
    )
)]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(short_id): Path<String>,
) -> Result<Json<FileResponse>, ApiError> {
    let data = state.service.get(&short_id).await?;

    Ok(Json(FileResponse {
        message: "Fetched file successfully".to_string(),
        data,
    }))
}

/// GET /files/download/:shortId - Download a file.
#[utoipa::path(
    get,
    path = "/files/download/{shortId}",
    tag = "files",
    params(
        ("shortId" = String, Path, description = "File short identifier")
    ),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 404, description = "File not found", body = ErrorBody),
        (status = 500, description = "Content missing or unreadable", body = ErrorBody)
    )
)]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(short_id): Path<String>,
) -> Result<Response<Body>, ApiError> {
    let download = state.service.download(&short_id).await?;
    let record = download.record;

    let response = Response::builder()
        .header(header::CONTENT_TYPE, &record.mime_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&record.original_name),
        )
        .header(header::CONTENT_LENGTH, download.content.len())
        .body(Body::from(download.content))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })?;

    Ok(response)
}

/// DELETE /files/delete/:shortId - Delete a file.
#[utoipa::path(
    delete,
    path = "/files/delete/{shortId}",
    tag = "files",
    params(
        ("shortId" = String, Path, description = "File short identifier")
    ),
    responses(
        (status = 200, description = "File deleted", body = MessageResponse),
        (status = 404, description = "File not found", body = ErrorBody),
        (status = 500, description = "Storage failure", body = ErrorBody)
    )
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(short_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.service.delete(&short_id).await?;

    Ok(Json(MessageResponse::new("File successfully deleted")))
}
