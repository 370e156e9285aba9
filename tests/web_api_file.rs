//! Web API File/Folder Tests
//!
//! Integration tests for upload, listing, folder creation, search and
//! download endpoints.

use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_METHOD, CONTENT_DISPOSITION,
    CONTENT_LENGTH, CONTENT_TYPE, ORIGIN,
};
use axum::http::{Method, StatusCode};
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use filebox::web::router::WELCOME_MESSAGE;
use filebox::{create_router, AppState, FileStorage};
use serde_json::{json, Value};
use tempfile::TempDir;

/// Create a test server over a fresh temporary storage root.
fn create_test_server() -> (TestServer, TempDir) {
    create_test_server_with_limit(10 * 1024 * 1024)
}

/// Create a test server with a custom upload limit in bytes.
fn create_test_server_with_limit(max_upload_size: usize) -> (TestServer, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let storage = FileStorage::new(temp_dir.path().join("uploads"));
    let app_state = Arc::new(AppState::new(storage).with_max_upload_size(max_upload_size));

    let router = create_router(app_state, &[]);
    let server = TestServer::new(router).expect("Failed to create test server");

    (server, temp_dir)
}

/// Storage root inside the temp dir.
fn storage_root(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("uploads")
}

/// Build a multipart `file` part.
fn file_part(filename: &str, content: &[u8]) -> Part {
    Part::bytes(content.to_vec())
        .file_name(filename)
        .mime_type("application/octet-stream")
}

/// Upload a file, optionally naming a folder in the form.
async fn upload(
    server: &TestServer,
    folder: Option<&str>,
    filename: &str,
    content: &[u8],
) -> TestResponse {
    let mut form = MultipartForm::new();
    if let Some(folder) = folder {
        form = form.add_text("folder", folder);
    }
    form = form.add_part("file", file_part(filename, content));

    server.post("/upload").multipart(form).await
}

fn names(body: &Value) -> Vec<String> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap().to_string())
        .collect()
}

// ============================================================================
// Welcome / Health
// ============================================================================

#[tokio::test]
async fn test_welcome() {
    let (server, _temp_dir) = create_test_server();

    let response = server.get("/").await;
    response.assert_status_ok();
    assert_eq!(response.text(), WELCOME_MESSAGE);
}

#[tokio::test]
async fn test_health() {
    let (server, _temp_dir) = create_test_server();

    let response = server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "OK");
}

// ============================================================================
// Upload Tests
// ============================================================================

#[tokio::test]
async fn test_upload_defaults_to_misc() {
    let (server, temp_dir) = create_test_server();

    let response = upload(&server, None, "report.txt", b"quarterly numbers").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "File uploaded successfully");

    let stored = storage_root(&temp_dir).join("misc").join("report.txt");
    assert_eq!(fs::read(stored).unwrap(), b"quarterly numbers");

    let response = server.get("/files/misc").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body
        .as_array()
        .unwrap()
        .contains(&json!({"name": "report.txt", "type": "file"})));
}

#[tokio::test]
async fn test_upload_undefined_folder_goes_to_misc() {
    let (server, temp_dir) = create_test_server();

    upload(&server, Some("undefined"), "a.txt", b"a")
        .await
        .assert_status_ok();

    assert!(storage_root(&temp_dir).join("misc").join("a.txt").is_file());
    assert!(!storage_root(&temp_dir).join("undefined").exists());
}

#[tokio::test]
async fn test_upload_to_named_folder() {
    let (server, temp_dir) = create_test_server();

    upload(&server, Some("projects/2024"), "plan.md", b"# plan")
        .await
        .assert_status_ok();

    let stored = storage_root(&temp_dir).join("projects/2024/plan.md");
    assert_eq!(fs::read(stored).unwrap(), b"# plan");
}

#[tokio::test]
async fn test_upload_folder_from_url() {
    let (server, temp_dir) = create_test_server();

    let form = MultipartForm::new().add_part("file", file_part("a.txt", b"url"));
    server
        .post("/upload/from-url")
        .multipart(form)
        .await
        .assert_status_ok();
    assert!(storage_root(&temp_dir).join("from-url/a.txt").is_file());

    // The form field takes precedence over the URL segment
    let form = MultipartForm::new()
        .add_text("folder", "from-form")
        .add_part("file", file_part("b.txt", b"form"));
    server
        .post("/upload/from-url")
        .multipart(form)
        .await
        .assert_status_ok();
    assert!(storage_root(&temp_dir).join("from-form/b.txt").is_file());
    assert!(!storage_root(&temp_dir).join("from-url/b.txt").exists());
}

#[tokio::test]
async fn test_upload_without_file_part() {
    let (server, temp_dir) = create_test_server();

    let form = MultipartForm::new().add_text("folder", "docs");
    let response = server.post("/upload").multipart(form).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(!storage_root(&temp_dir).exists());
}

#[tokio::test]
async fn test_upload_not_multipart() {
    let (server, temp_dir) = create_test_server();

    let response = server.post("/upload").text("just text").await;

    assert!(response.status_code().is_client_error());
    assert!(!storage_root(&temp_dir).exists());
}

#[tokio::test]
async fn test_upload_too_large() {
    let (server, temp_dir) = create_test_server_with_limit(1024);

    let response = upload(&server, None, "big.bin", &[0u8; 8 * 1024]).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(!storage_root(&temp_dir).join("misc/big.bin").exists());
}

#[tokio::test]
async fn test_upload_folder_traversal_rejected() {
    let (server, temp_dir) = create_test_server();

    let response = upload(&server, Some("../escape"), "evil.txt", b"x").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(!temp_dir.path().join("escape").exists());
}

#[tokio::test]
async fn test_upload_filename_traversal_rejected() {
    let (server, temp_dir) = create_test_server();

    let response = upload(&server, Some("docs"), "../../evil.txt", b"x").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(!temp_dir.path().join("evil.txt").exists());
    assert!(!storage_root(&temp_dir).exists());
}

#[tokio::test]
async fn test_upload_reserved_partial_name_rejected() {
    let (server, temp_dir) = create_test_server();

    let response = upload(&server, None, ".upload-x.part", b"x").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(!storage_root(&temp_dir).join("misc/.upload-x.part").exists());
}

#[tokio::test]
async fn test_upload_folder_blocked_by_file_returns_500() {
    let (server, temp_dir) = create_test_server();
    let root = storage_root(&temp_dir);
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("blocker"), b"not a folder").unwrap();

    let response = upload(&server, Some("blocker/sub"), "a.txt", b"a").await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text(), "Unable to create upload directory");
    assert_eq!(fs::read(root.join("blocker")).unwrap(), b"not a folder");
}

#[tokio::test]
async fn test_upload_overwrites_and_download_returns_latest() {
    let (server, _temp_dir) = create_test_server();

    upload(&server, Some("docs"), "notes.txt", b"first draft, rather long")
        .await
        .assert_status_ok();
    upload(&server, Some("docs"), "notes.txt", b"final")
        .await
        .assert_status_ok();

    let response = server.get("/download/docs/notes.txt").await;
    response.assert_status_ok();
    assert_eq!(response.as_bytes().as_ref(), b"final");
    assert_eq!(response.header(CONTENT_LENGTH), "5");

    let body: Value = server.get("/files/docs").await.json();
    assert_eq!(names(&body), ["notes.txt"]);
}

// ============================================================================
// Download Tests
// ============================================================================

#[tokio::test]
async fn test_download_round_trip_binary() {
    let (server, _temp_dir) = create_test_server();
    let content: Vec<u8> = (0..=255u8).cycle().take(70_000).collect();

    upload(&server, Some("bin"), "blob.bin", &content)
        .await
        .assert_status_ok();

    let response = server.get("/download/bin/blob.bin").await;
    response.assert_status_ok();
    assert_eq!(response.as_bytes().as_ref(), content.as_slice());
    assert_eq!(response.header(CONTENT_LENGTH), content.len().to_string());
}

#[tokio::test]
async fn test_download_root_level_file() {
    let (server, temp_dir) = create_test_server();
    let root = storage_root(&temp_dir);
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("readme.txt"), b"hello").unwrap();

    let response = server.get("/download/readme.txt").await;

    response.assert_status_ok();
    assert_eq!(response.text(), "hello");
    assert_eq!(response.header(CONTENT_TYPE), "application/octet-stream");
    assert_eq!(
        response.header(CONTENT_DISPOSITION),
        "attachment; filename=\"readme.txt\""
    );
    assert_eq!(response.header(CONTENT_LENGTH), "5");
}

#[tokio::test]
async fn test_download_missing_file() {
    let (server, _temp_dir) = create_test_server();

    server
        .get("/download/nothing.txt")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .get("/download/misc/nothing.txt")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_directory_is_not_found() {
    let (server, _temp_dir) = create_test_server();

    server
        .post("/createFolder/archive")
        .await
        .assert_status_ok();

    let response = server.get("/download/archive").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_traversal_rejected() {
    let (server, temp_dir) = create_test_server();
    fs::write(temp_dir.path().join("secret.txt"), b"secret").unwrap();
    fs::create_dir_all(storage_root(&temp_dir)).unwrap();

    let response = server.get("/download/..%2Fsecret.txt").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

// ============================================================================
// Listing Tests
// ============================================================================

#[tokio::test]
async fn test_list_root_before_any_upload() {
    let (server, _temp_dir) = create_test_server();

    let response = server.get("/files").await;

    response.assert_status_ok();
    assert_eq!(response.text(), "[]");
}

#[tokio::test]
async fn test_list_root_entries() {
    let (server, _temp_dir) = create_test_server();

    upload(&server, Some("zeta"), "z.txt", b"z").await.assert_status_ok();
    server.post("/createFolder/alpha").await.assert_status_ok();

    let body: Value = server.get("/files").await.json();
    assert_eq!(
        body,
        json!([
            {"name": "alpha", "type": "folder"},
            {"name": "zeta", "type": "folder"}
        ])
    );
}

#[tokio::test]
async fn test_list_missing_folder() {
    let (server, _temp_dir) = create_test_server();

    server
        .get("/files/does-not-exist")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_empty_folder() {
    let (server, _temp_dir) = create_test_server();

    server.post("/createFolder/empty").await.assert_status_ok();

    let response = server.get("/files/empty").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "[]");
}

#[tokio::test]
async fn test_list_folder_sorted_by_date() {
    let (server, temp_dir) = create_test_server();

    for name in ["a.txt", "b.txt", "c.txt"] {
        upload(&server, Some("docs"), name, name.as_bytes())
            .await
            .assert_status_ok();
    }

    // c oldest, a newest
    let folder = storage_root(&temp_dir).join("docs");
    let epoch = SystemTime::UNIX_EPOCH;
    for (name, secs) in [("c.txt", 100), ("b.txt", 200), ("a.txt", 300)] {
        File::options()
            .write(true)
            .open(folder.join(name))
            .unwrap()
            .set_modified(epoch + Duration::from_secs(secs))
            .unwrap();
    }

    let body: Value = server
        .get("/files/docs")
        .add_query_param("sortByDate", "true")
        .await
        .json();
    assert_eq!(names(&body), ["c.txt", "b.txt", "a.txt"]);

    let body: Value = server.get("/files/docs").await.json();
    assert_eq!(names(&body), ["a.txt", "b.txt", "c.txt"]);
}

// ============================================================================
// Create Folder Tests
// ============================================================================

#[tokio::test]
async fn test_create_folder_idempotent() {
    let (server, temp_dir) = create_test_server();

    let response = server.post("/createFolder/archive").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "Folder 'archive' created successfully");

    let response = server.post("/createFolder/archive").await;
    response.assert_status_ok();

    assert!(storage_root(&temp_dir).join("archive").is_dir());
}

#[tokio::test]
async fn test_create_folder_traversal_rejected() {
    let (server, temp_dir) = create_test_server();

    let response = server.post("/createFolder/..%2Fescape").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(!temp_dir.path().join("escape").exists());
}

#[tokio::test]
async fn test_create_folder_over_file_returns_500() {
    let (server, temp_dir) = create_test_server();
    let root = storage_root(&temp_dir);
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("blocker"), b"not a folder").unwrap();

    let response = server.post("/createFolder/blocker").await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text(), "Unable to create the folder");
}

#[cfg(unix)]
#[tokio::test]
async fn test_create_folder_through_dangling_symlink_rejected() {
    let (server, temp_dir) = create_test_server();
    let root = storage_root(&temp_dir);
    fs::create_dir_all(&root).unwrap();
    std::os::unix::fs::symlink(temp_dir.path().join("gone"), root.join("dangling")).unwrap();

    let response = server.post("/createFolder/dangling%2Fx").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(!temp_dir.path().join("gone").exists());
}

// ============================================================================
// Search Tests
// ============================================================================

#[tokio::test]
async fn test_search_case_insensitive() {
    let (server, _temp_dir) = create_test_server();

    upload(&server, None, "Report.txt", b"r").await.assert_status_ok();
    upload(&server, None, "notes.md", b"n").await.assert_status_ok();

    let response = server.get("/search").add_query_param("q", "rep").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body, json!([{"name": "Report.txt", "type": "file"}]));
}

#[tokio::test]
async fn test_search_matches_folders_recursively() {
    let (server, _temp_dir) = create_test_server();

    upload(&server, Some("photos/summer"), "beach.jpg", b"jpg")
        .await
        .assert_status_ok();
    upload(&server, Some("docs"), "summer-plan.txt", b"plan")
        .await
        .assert_status_ok();

    let body: Value = server
        .get("/search")
        .add_query_param("q", "SUMMER")
        .await
        .json();
    assert_eq!(
        body,
        json!([
            {"name": "summer-plan.txt", "type": "file"},
            {"name": "summer", "type": "folder"}
        ])
    );
}

#[tokio::test]
async fn test_search_no_matches() {
    let (server, _temp_dir) = create_test_server();

    upload(&server, None, "a.txt", b"a").await.assert_status_ok();

    let response = server.get("/search").add_query_param("q", "zzz").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "[]");
}

#[tokio::test]
async fn test_search_requires_query() {
    let (server, _temp_dir) = create_test_server();

    server
        .get("/search")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    server
        .get("/search")
        .add_query_param("q", "")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

// ============================================================================
// CORS Tests
// ============================================================================

#[tokio::test]
async fn test_cors_preflight_allowed_origin() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileStorage::new(temp_dir.path().join("uploads"));
    let router = create_router(
        Arc::new(AppState::new(storage)),
        &["http://localhost:5173".to_string()],
    );
    let server = TestServer::new(router).unwrap();

    let response = server
        .method(Method::OPTIONS, "/files")
        .add_header(ORIGIN, "http://localhost:5173")
        .add_header(ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.header(ACCESS_CONTROL_ALLOW_ORIGIN),
        "http://localhost:5173"
    );
}
