//! OpenAPI document for the HTTP API.

use utoipa::OpenApi;

use crate::file::FileRecord;
use crate::web::dto::{
    FileListResponse, FileResponse, MessageResponse, UploadForm, UploadResponse,
};
use crate::web::error::{ErrorBody, ErrorCode};
use crate::web::handlers::file;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "dropshare API",
        description = "Temporary file sharing: upload a file, share its short id, and it expires after the retention period.",
        license(name = "MIT")
    ),
    paths(
        file::upload_file,
        file::list_files,
        file::get_file,
        file::download_file,
        file::delete_file
    ),
    components(schemas(
        FileRecord,
        UploadForm,
        UploadResponse,
        FileResponse,
        FileListResponse,
        MessageResponse,
        ErrorBody,
        ErrorCode
    )),
    tags(
        (name = "files", description = "File upload, lookup, download and deletion")
    )
)]
pub struct ApiDoc;
