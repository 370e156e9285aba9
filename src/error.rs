//! Error types for filebox.

use std::path::PathBuf;

use thiserror::Error;

/// Common error type for filebox.
#[derive(Error, Debug)]
pub enum FileboxError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// A client-supplied name that would resolve outside the storage root,
    /// or is otherwise unusable as a path.
    #[error("invalid path: {}", .0.display())]
    InvalidPath(PathBuf),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<walkdir::Error> for FileboxError {
    fn from(e: walkdir::Error) -> Self {
        FileboxError::Io(e.into())
    }
}

/// Result type alias for filebox operations.
pub type Result<T> = std::result::Result<T, FileboxError>;
