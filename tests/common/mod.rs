//! Test helpers for HTTP API tests.
//!
//! Provides a TestApp bundling an axum-test server with the service and
//! temporary storage behind it.

#![allow(dead_code)]

use std::sync::Arc;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use tempfile::TempDir;

use dropshare::config::FilesConfig;
use dropshare::web::handlers::AppState;
use dropshare::web::router::{create_health_router, create_openapi_router, create_router};
use dropshare::{Database, FileService};

/// A running test application.
pub struct TestApp {
    pub server: TestServer,
    pub service: Arc<FileService>,
    /// Keeps the blob directory alive for the duration of the test.
    pub storage_dir: TempDir,
}

impl TestApp {
    /// Number of committed and partial blobs on disk.
    pub fn blob_count(&self) -> usize {
        std::fs::read_dir(self.storage_dir.path())
            .expect("storage dir readable")
            .count()
    }
}

/// Create a test app with default file settings.
pub async fn create_test_app() -> TestApp {
    create_test_app_with(|_| {}).await
}

/// Create a test app after adjusting the `[files]` settings.
pub async fn create_test_app_with(adjust: impl FnOnce(&mut FilesConfig)) -> TestApp {
    let storage_dir = TempDir::new().expect("Failed to create storage dir");

    let mut files = FilesConfig {
        storage_path: storage_dir.path().to_string_lossy().into_owned(),
        ..FilesConfig::default()
    };
    adjust(&mut files);

    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");
    let service = Arc::new(
        FileService::from_config(Arc::new(db), &files).expect("Failed to create file service"),
    );

    let router = create_router(Arc::new(AppState::new(service.clone())), &[])
        .merge(create_health_router())
        .merge(create_openapi_router());
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        service,
        storage_dir,
    }
}

/// Build a single-file upload form.
pub fn upload_form(content: Vec<u8>, file_name: &str, mime_type: &str) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(content)
            .file_name(file_name)
            .mime_type(mime_type),
    )
}
