//! filebox - a minimal HTTP file storage server.
//!
//! Clients upload files into folders, list folder contents, search by name
//! and download files. Everything is stored as plain files under a single
//! storage root.

pub mod config;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use config::Config;
pub use error::{FileboxError, Result};
pub use file::{DirEntry, EntryKind, FileStorage, SortOrder};
pub use web::{create_router, AppState, WebServer};
