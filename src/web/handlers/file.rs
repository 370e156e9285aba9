//! File and folder handlers.

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::header,
    response::Response,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::file::{validate_file_name, DirEntry, SortOrder};
use crate::web::error::ApiError;
use crate::web::handlers::{run_blocking, AppState};

/// Query parameters for folder listings.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// `true` sorts oldest-modified first.
    #[serde(rename = "sortByDate")]
    pub sort_by_date: Option<String>,
}

impl ListQuery {
    fn order(&self) -> SortOrder {
        SortOrder::from_sort_by_date(self.sort_by_date.as_deref() == Some("true"))
    }
}

/// Query parameters for search.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// Generate a safe Content-Disposition header value for file downloads.
///
/// Control characters are dropped (no header injection), quotes and
/// backslashes are replaced in the plain `filename`, and names that needed
/// any of that, or are non-ASCII, also get an RFC 5987 `filename*`.
fn content_disposition_header(filename: &str) -> String {
    let needs_encoding = !filename.is_ascii()
        || filename
            .chars()
            .any(|c| c.is_control() || c == '"' || c == '\\');

    if !needs_encoding {
        return format!("attachment; filename=\"{}\"", filename);
    }

    let fallback: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if c == '"' || c == '\\' { '_' } else { c })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(filename)
    )
}

/// POST /upload and POST /upload/:folder_name - Upload a file.
///
/// Request body: multipart/form-data with a `file` part and an optional
/// `folder` text field. The form field wins over the URL segment; with
/// neither the file goes to the default folder. Every field is read before
/// anything touches the disk.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    folder_param: Option<Path<String>>,
    mut multipart: Multipart,
) -> Result<&'static str, ApiError> {
    let mut folder: Option<String> = None;
    let mut upload: Option<(String, axum::body::Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Failed to read multipart field: {}", e);
        ApiError::bad_request("Unable to parse form data")
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .ok_or_else(|| ApiError::bad_request("Unable to retrieve file from form"))?;
                let content = field.bytes().await.map_err(|e| {
                    tracing::warn!("Failed to read file content: {}", e);
                    ApiError::bad_request("Unable to parse form data")
                })?;
                upload = Some((filename, content));
            }
            "folder" => {
                folder = Some(field.text().await.map_err(|e| {
                    tracing::warn!("Failed to read folder field: {}", e);
                    ApiError::bad_request("Unable to parse form data")
                })?);
            }
            _ => {}
        }
    }

    let (filename, content) =
        upload.ok_or_else(|| ApiError::bad_request("Unable to retrieve file from form"))?;
    validate_file_name(&filename).map_err(|_| ApiError::bad_request("Invalid file name"))?;

    let folder = folder
        .filter(|f| !f.is_empty())
        .or_else(|| folder_param.map(|Path(p)| p))
        .unwrap_or_default();

    let storage = state.storage.clone();
    let (path, size) = run_blocking(move || {
        let dir = storage
            .ensure_folder(&folder)
            .map_err(|e| ApiError::from_storage(e, "Unable to create upload directory"))?;
        let size = storage
            .save_file(&dir, &filename, content.as_ref())
            .map_err(|e| ApiError::from_storage(e, "Unable to save the file"))?;
        Ok((dir.join(&filename), size))
    })
    .await?;

    tracing::info!(path = %path.display(), size, "File uploaded");

    Ok("File uploaded successfully")
}

/// GET /files - List the storage root.
pub async fn list_root(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<DirEntry>>, ApiError> {
    let storage = state.storage.clone();
    let order = query.order();

    let entries = run_blocking(move || {
        storage
            .list_root(order)
            .map_err(|e| ApiError::from_storage(e, "Unable to read files in the directory"))
    })
    .await?;

    Ok(Json(entries))
}

/// GET /files/:folder_name - List a folder.
pub async fn list_folder(
    State(state): State<Arc<AppState>>,
    Path(folder_name): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<DirEntry>>, ApiError> {
    let storage = state.storage.clone();
    let order = query.order();

    let entries = run_blocking(move || {
        storage
            .list_folder(&folder_name, order)
            .map_err(|e| ApiError::from_storage(e, "Unable to read files in the folder"))
    })
    .await?;

    Ok(Json(entries))
}

/// POST /createFolder/:folder_name - Create a folder.
pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    Path(folder_name): Path<String>,
) -> Result<String, ApiError> {
    let storage = state.storage.clone();
    let name = folder_name.clone();

    let path = run_blocking(move || {
        storage
            .create_folder(&name)
            .map_err(|e| ApiError::from_storage(e, "Unable to create the folder"))
    })
    .await?;

    tracing::info!(folder = %path.display(), "Folder created");

    Ok(format!("Folder '{}' created successfully", folder_name))
}

/// GET /search?q= - Search every file and folder name under the root.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<DirEntry>>, ApiError> {
    let q = query
        .q
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::bad_request("Query parameter is required"))?;

    let storage = state.storage.clone();
    let results = run_blocking(move || {
        storage
            .search(&q)
            .map_err(|e| ApiError::from_storage(e, "Error searching for files"))
    })
    .await?;

    Ok(Json(results))
}

/// GET /download/{file} - Download a root-level file.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(file_name): Path<String>,
) -> Result<Response<Body>, ApiError> {
    let storage = state.storage.clone();
    let name = file_name.clone();

    let (file, size) = run_blocking(move || {
        storage
            .open_file(&name)
            .map_err(|e| ApiError::from_storage(e, "Unable to open the file"))
    })
    .await?;

    attachment_response(file, size, &file_name)
}

/// GET /download/{folder}/{file} - Download a file inside a folder.
pub async fn download_file_in_folder(
    State(state): State<Arc<AppState>>,
    Path((folder_name, file_name)): Path<(String, String)>,
) -> Result<Response<Body>, ApiError> {
    let storage = state.storage.clone();
    let name = file_name.clone();

    let (file, size) = run_blocking(move || {
        storage
            .open_file_in(&folder_name, &name)
            .map_err(|e| ApiError::from_storage(e, "Unable to open the file"))
    })
    .await?;

    attachment_response(file, size, &file_name)
}

/// Stream an opened file back as an attachment with an exact length.
fn attachment_response(
    file: std::fs::File,
    size: u64,
    file_name: &str,
) -> Result<Response<Body>, ApiError> {
    tracing::debug!(file = %file_name, size, "Serving download");

    let stream = ReaderStream::new(tokio::fs::File::from_std(file));

    Response::builder()
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(file_name),
        )
        .header(header::CONTENT_LENGTH, size)
        .body(Body::from_stream(stream))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Error serving the file")
        })
}
