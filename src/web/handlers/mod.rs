//! Request handlers.

pub mod file;

pub use file::*;

use crate::file::{FileStorage, DEFAULT_MAX_UPLOAD_SIZE};
use crate::web::error::ApiError;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Storage all handlers read from and write to.
    pub storage: FileStorage,
    /// Maximum upload request body size in bytes.
    pub max_upload_size: usize,
}

impl AppState {
    /// Create application state over the given storage.
    pub fn new(storage: FileStorage) -> Self {
        Self {
            storage,
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
        }
    }

    /// Set the upload limit in bytes.
    pub fn with_max_upload_size(mut self, bytes: usize) -> Self {
        self.max_upload_size = bytes;
        self
    }
}

/// Run blocking filesystem work off the async executor.
///
/// A panic inside `f` is resumed on the request task so the panic
/// recovery layer answers it like any other handler panic.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => {
            tracing::error!("Blocking task failed: {}", e);
            Err(ApiError::internal("An internal error occurred"))
        }
    }
}
