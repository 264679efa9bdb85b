//! Web API File Tests
//!
//! Integration tests for the upload, lookup, download, delete and expiry flow.

mod common;

use axum::http::StatusCode;
use axum_test::multipart::MultipartForm;
use chrono::Duration;
use serde_json::Value;

use common::{create_test_app, create_test_app_with, upload_form};
use dropshare::file::is_valid_short_id;

/// Upload a file and return its short id.
async fn upload(app: &common::TestApp, content: &[u8], name: &str, mime: &str) -> String {
    let response = app
        .server
        .post("/files/upload")
        .multipart(upload_form(content.to_vec(), name, mime))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    body["shortId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_text_file_lifecycle() {
    let app = create_test_app().await;

    // Upload
    let response = app
        .server
        .post("/files/upload")
        .multipart(upload_form(b"0123456789".to_vec(), "hello.txt", "text/plain"))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "File successfully uploaded");
    let short_id = body["shortId"].as_str().unwrap().to_string();
    assert!(is_valid_short_id(&short_id));

    // Lookup
    let response = app.server.get(&format!("/files/{short_id}")).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "Fetched file successfully");
    assert_eq!(body["data"]["shortId"], short_id.as_str());
    assert_eq!(body["data"]["originalName"], "hello.txt");
    assert_eq!(body["data"]["mimeType"], "text/plain");
    assert_eq!(body["data"]["sizeBytes"], 10);
    assert!(body["data"]["uploadedAt"].is_string());
    assert!(body["data"]["expiresAt"].is_string());
    assert!(body["data"].get("storageName").is_none());

    // Download
    let response = app.server.get(&format!("/files/download/{short_id}")).await;
    response.assert_status_ok();
    assert_eq!(response.as_bytes().as_ref(), b"0123456789");
    assert_eq!(response.header("content-type"), "text/plain");
    assert_eq!(response.header("content-length"), "10");
    assert_eq!(
        response.header("content-disposition"),
        "attachment; filename=\"hello.txt\""
    );

    // Delete
    let response = app.server.delete(&format!("/files/delete/{short_id}")).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "File successfully deleted");

    // Gone
    let response = app.server.get(&format!("/files/{short_id}")).await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["message"], "File not found");
    assert_eq!(body["code"], "NOT_FOUND");

    assert_eq!(app.blob_count(), 0);
}

#[tokio::test]
async fn test_upload_disallowed_type() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/files/upload")
        .multipart(upload_form(
            b"PK\x03\x04fake zip".to_vec(),
            "archive.zip",
            "application/zip",
        ))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "BAD_REQUEST");
    assert!(body["message"].as_str().unwrap().contains("application/zip"));

    assert_eq!(app.blob_count(), 0);
    assert!(app.service.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_too_large() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/files/upload")
        .multipart(upload_form(
            vec![0u8; 6 * 1024 * 1024],
            "huge.pdf",
            "application/pdf",
        ))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "BAD_REQUEST");
    assert!(body["message"].as_str().unwrap().contains("too large"));

    assert_eq!(app.blob_count(), 0);
    assert!(app.service.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_small_limit() {
    let app = create_test_app_with(|files| files.max_upload_size_bytes = 100).await;

    let response = app
        .server
        .post("/files/upload")
        .multipart(upload_form(vec![b'x'; 101], "big.txt", "text/plain"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    upload(&app, &[b'x'; 100], "fits.txt", "text/plain").await;
    assert_eq!(app.blob_count(), 1);
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/files/upload")
        .multipart(MultipartForm::new().add_text("description", "no file here"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["message"], "No file provided");
}

#[tokio::test]
async fn test_upload_each_allowed_type() {
    let app = create_test_app().await;

    for (name, mime) in [
        ("photo.jpg", "image/jpeg"),
        ("image.png", "image/png"),
        ("paper.pdf", "application/pdf"),
        ("notes.txt", "text/plain"),
        (
            "letter.docx",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ),
    ] {
        upload(&app, b"content", name, mime).await;
    }

    assert_eq!(app.service.list().await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_upload_with_content_verification() {
    let app = create_test_app_with(|files| files.verify_content = true).await;
    let png = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

    upload(&app, &png, "image.png", "image/png").await;

    let response = app
        .server
        .post("/files/upload")
        .multipart(upload_form(png, "disguised.txt", "text/plain"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    assert_eq!(app.blob_count(), 1);
}

#[tokio::test]
async fn test_list_files() {
    let app = create_test_app().await;

    let response = app.server.get("/files/").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "Fetched all files");
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let first = upload(&app, b"first", "first.txt", "text/plain").await;
    let second = upload(&app, b"second", "second.txt", "text/plain").await;

    let body: Value = app.server.get("/files/").await.json();
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["shortId"], second.as_str());
    assert_eq!(data[1]["shortId"], first.as_str());
    assert!(data.iter().all(|r| r.get("storageName").is_none()));
}

#[tokio::test]
async fn test_round_trip_binary_and_unicode_name() {
    let app = create_test_app().await;
    let content: Vec<u8> = (0..=255u8).cycle().take(100_000).collect();

    let short_id = upload(&app, &content, "résumé.pdf", "application/pdf").await;

    let response = app.server.get(&format!("/files/download/{short_id}")).await;
    response.assert_status_ok();
    assert_eq!(response.as_bytes().as_ref(), content.as_slice());
    assert_eq!(response.header("content-type"), "application/pdf");

    let disposition = response.header("content-disposition");
    let disposition = disposition.to_str().unwrap();
    assert!(disposition.contains("filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"));
}

#[tokio::test]
async fn test_unknown_and_malformed_ids() {
    let app = create_test_app().await;

    for path in [
        "/files/abcdefghij",
        "/files/abc",
        "/files/download/abcdefghij",
        "/files/download/bad!id",
    ] {
        let response = app.server.get(path).await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    let response = app.server.delete("/files/delete/abcdefghij").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_delete_twice() {
    let app = create_test_app().await;
    let short_id = upload(&app, b"once", "once.txt", "text/plain").await;

    app.server
        .delete(&format!("/files/delete/{short_id}"))
        .await
        .assert_status_ok();
    app.server
        .delete(&format!("/files/delete/{short_id}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_missing_blob() {
    let app = create_test_app().await;
    let short_id = upload(&app, b"vanishing", "vanish.txt", "text/plain").await;

    let record = app.service.get(&short_id).await.unwrap();
    std::fs::remove_file(app.service.store().blob_path(&record.storage_name)).unwrap();

    let response = app.server.get(&format!("/files/download/{short_id}")).await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["code"], "INTERNAL_ERROR");
    assert_eq!(body["message"], "An internal error occurred");
}

#[tokio::test]
async fn test_delete_blob_failure_returns_500_and_keeps_file() {
    let app = create_test_app().await;
    let short_id = upload(&app, b"stuck", "stuck.txt", "text/plain").await;

    // A non-empty directory in place of the blob cannot be unlinked
    let record = app.service.get(&short_id).await.unwrap();
    let path = app.service.store().blob_path(&record.storage_name);
    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir(&path).unwrap();
    std::fs::write(path.join("pinned"), b"x").unwrap();

    let response = app.server.delete(&format!("/files/delete/{short_id}")).await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["code"], "INTERNAL_ERROR");

    app.server
        .get(&format!("/files/{short_id}"))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_expired_file_removed_by_sweep() {
    let app = create_test_app().await;
    let short_id = upload(&app, b"temporary", "temp.txt", "text/plain").await;
    let record = app.service.get(&short_id).await.unwrap();

    // Still served until a sweep runs past its expiry
    app.server
        .get(&format!("/files/{short_id}"))
        .await
        .assert_status_ok();

    let report = app
        .service
        .purge_expired(record.expires_at + Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(report.purged, 1);

    app.server
        .get(&format!("/files/{short_id}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    assert_eq!(app.blob_count(), 0);
}

#[tokio::test]
async fn test_short_ids_unique() {
    let app = create_test_app().await;

    let mut ids = std::collections::HashSet::new();
    for i in 0..10 {
        ids.insert(upload(&app, b"dup", &format!("{i}.txt"), "text/plain").await);
    }
    assert_eq!(ids.len(), 10);
}

#[tokio::test]
async fn test_health_and_openapi() {
    let app = create_test_app().await;

    let response = app.server.get("/health").await;
    response.assert_status_ok();
    response.assert_text("OK");

    let response = app.server.get("/api-docs/openapi.json").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["openapi"].is_string());
    assert!(body["paths"]["/files/upload"].is_object());
}
