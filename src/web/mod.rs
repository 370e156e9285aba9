//! HTTP API for filebox.
//!
//! Upload, list, search and download over plain HTTP, backed by
//! [`FileStorage`](crate::file::FileStorage).

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
