//! Path validation for client-supplied folder and file names.
//!
//! Folder names and filenames arrive straight from HTTP requests and are
//! joined onto the storage root. Everything here works lexically, so it also
//! covers paths that do not exist yet; [`FileStorage`](super::FileStorage)
//! adds a canonicalization check for paths that do.

use std::path::{Component, Path, PathBuf};

use crate::{FileboxError, Result};

/// Normalize a relative path and make sure it never leaves its base.
///
/// `.` segments and repeated separators are dropped, `..` segments are
/// resolved against earlier segments. Absolute paths, Windows prefixes, NUL
/// bytes and anything that resolves to nothing are rejected with
/// [`FileboxError::InvalidPath`].
///
/// ```
/// use std::path::Path;
/// use filebox::file::validate_relative;
///
/// assert_eq!(validate_relative("docs/2024").unwrap(), Path::new("docs/2024"));
/// assert_eq!(validate_relative("a/../b/./c/").unwrap(), Path::new("b/c"));
/// assert!(validate_relative("../etc").is_err());
/// assert!(validate_relative("a/../../b").is_err());
/// assert!(validate_relative("/etc/passwd").is_err());
/// assert!(validate_relative("").is_err());
/// ```
pub fn validate_relative(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let invalid = || FileboxError::InvalidPath(path.to_path_buf());

    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(s) => {
                // NUL passes through Path::components() on Unix but truncates in syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    return Err(invalid());
                }
                components.push(s);
            }
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => return Err(invalid()),
            Component::ParentDir => {
                if components.pop().is_none() {
                    return Err(invalid());
                }
            }
        }
    }

    if components.is_empty() {
        return Err(invalid());
    }
    Ok(components.into_iter().collect())
}

/// Check that `name` is a single plain path component, usable as a filename
/// directly under a folder.
pub fn validate_file_name(name: &str) -> Result<&str> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(s)), None)
            if s == name && !s.as_encoded_bytes().contains(&0) =>
        {
            Ok(name)
        }
        _ => Err(FileboxError::InvalidPath(PathBuf::from(name))),
    }
}
