//! File storage for filebox.
//!
//! This module owns everything that touches the disk:
//! - Folder creation and listing under a single storage root
//! - Atomic file saves and streaming reads
//! - Recursive name search
//! - Path validation keeping client names inside the root

mod entry;
pub mod path;
mod storage;

pub use entry::{DirEntry, EntryKind, SortOrder};
pub use path::{validate_file_name, validate_relative};
pub use storage::FileStorage;

/// Folder uploads land in when the client names none.
pub const DEFAULT_FOLDER: &str = "misc";

/// Default maximum upload size (10MB).
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;
