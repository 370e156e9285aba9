//! Filesystem access for filebox.
//!
//! [`FileStorage`] is the only code that touches the storage root. Layout on
//! disk is exactly what clients ask for:
//! ```text
//! {root}/
//! ├── misc/
//! │   └── report.txt
//! ├── archive/
//! │   └── 2024/
//! │       └── notes.md
//! └── readme.txt
//! ```

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use uuid::Uuid;
use walkdir::WalkDir;

use super::entry::{DirEntry, EntryKind, SortOrder};
use super::path::{validate_file_name, validate_relative};
use super::DEFAULT_FOLDER;
use crate::{FileboxError, Result};

/// Name prefix of in-flight uploads. Such files are hidden from listings and
/// search, so clients may not upload under a matching name.
const PARTIAL_PREFIX: &str = ".upload-";
const PARTIAL_SUFFIX: &str = ".part";

fn is_partial_upload(name: &str) -> bool {
    name.starts_with(PARTIAL_PREFIX) && name.ends_with(PARTIAL_SUFFIX)
}

/// File storage rooted at a single directory.
///
/// The root is not created up front; the first write creates it.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
    default_folder: String,
}

impl FileStorage {
    /// Create a storage handle for the given root directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            default_folder: DEFAULT_FOLDER.to_string(),
        }
    }

    /// Use a different folder for uploads that name none.
    pub fn with_default_folder(mut self, name: impl Into<String>) -> Self {
        self.default_folder = name.into();
        self
    }

    /// Get the root path of this storage.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folder used for uploads that name none.
    pub fn default_folder(&self) -> &str {
        &self.default_folder
    }

    /// Resolve a client-supplied relative path to a path under the root.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let relative = validate_relative(relative)?;
        let path = self.root.join(relative);
        self.check_contained(&path)?;
        Ok(path)
    }

    /// Make sure the nearest existing ancestor of `path` is still inside the
    /// root once symlinks are resolved.
    fn check_contained(&self, path: &Path) -> Result<()> {
        let Ok(root) = self.root.canonicalize() else {
            // Nothing exists under a missing root, lexical validation is enough.
            return Ok(());
        };

        let existing = path
            .ancestors()
            .find(|p| p.symlink_metadata().is_ok())
            .unwrap_or(self.root.as_path());
        let resolved = match existing.canonicalize() {
            Ok(resolved) => resolved,
            // Dangling symlink: its target is unknown, treat like an escape.
            Err(_) if existing.is_symlink() => {
                tracing::warn!(path = %path.display(), "Rejected path through dangling symlink");
                return Err(FileboxError::InvalidPath(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        if resolved.starts_with(&root) {
            Ok(())
        } else {
            tracing::warn!(path = %path.display(), "Rejected path resolving outside storage root");
            Err(FileboxError::InvalidPath(path.to_path_buf()))
        }
    }

    /// Resolve an upload folder and create it (and any parents).
    ///
    /// An empty name or the literal `undefined` (what browser clients send for
    /// an unset field) maps to the default folder.
    pub fn ensure_folder(&self, name: &str) -> Result<PathBuf> {
        let name = if name.trim().is_empty() || name == "undefined" {
            self.default_folder.as_str()
        } else {
            name
        };

        let path = self.resolve(name)?;
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Create a named folder (and any parents). Existing folders are fine.
    pub fn create_folder(&self, name: &str) -> Result<PathBuf> {
        if name.trim().is_empty() {
            return Err(FileboxError::Validation(
                "folder name is required".to_string(),
            ));
        }

        let path = self.resolve(name)?;
        fs::create_dir_all(&path)?;
        tracing::debug!(folder = %path.display(), "Folder ready");
        Ok(path)
    }

    /// Write `content` to `folder/filename`, replacing any existing file.
    ///
    /// Content goes to a temporary file in the same folder which is then
    /// renamed over the target, so readers see either the old or the new
    /// file in full. Returns the number of bytes written.
    pub fn save_file(&self, folder: &Path, filename: &str, mut content: impl Read) -> Result<u64> {
        let filename = validate_file_name(filename)?;
        let target = folder.join(filename);
        if is_partial_upload(filename) || target.is_dir() {
            return Err(FileboxError::InvalidPath(target));
        }

        let temp = folder.join(format!("{PARTIAL_PREFIX}{}{PARTIAL_SUFFIX}", Uuid::new_v4()));
        let written = File::create(&temp)
            .and_then(|mut file| {
                let written = io::copy(&mut content, &mut file)?;
                file.sync_all()?;
                Ok(written)
            })
            .and_then(|written| fs::rename(&temp, &target).map(|_| written));

        match written {
            Ok(written) => Ok(written),
            Err(e) => {
                let _ = fs::remove_file(&temp);
                Err(e.into())
            }
        }
    }

    /// List the immediate children of `dir`.
    pub fn list_entries(&self, dir: &Path, order: SortOrder) -> Result<Vec<DirEntry>> {
        let mut entries = Vec::new();

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_partial_upload(&name) {
                continue;
            }

            let metadata = entry.metadata()?;
            entries.push(
                DirEntry::new(name, EntryKind::from_is_dir(metadata.is_dir()))
                    .with_modified(metadata.modified().ok()),
            );
        }

        order.sort(&mut entries);
        Ok(entries)
    }

    /// List the root. A root that does not exist yet lists as empty.
    pub fn list_root(&self, order: SortOrder) -> Result<Vec<DirEntry>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        self.list_entries(&self.root, order)
    }

    /// List a named folder.
    pub fn list_folder(&self, name: &str, order: SortOrder) -> Result<Vec<DirEntry>> {
        if name.trim().is_empty() {
            return Err(FileboxError::Validation(
                "folder name is required".to_string(),
            ));
        }

        let path = self.resolve(name)?;
        if !path.is_dir() {
            return Err(FileboxError::NotFound(format!("Folder: {name}")));
        }
        self.list_entries(&path, order)
    }

    /// Find every entry below the root whose name contains `query`,
    /// ignoring case.
    ///
    /// Results come in depth-first pre-order with siblings visited by name.
    /// The first unreadable entry aborts the whole search.
    pub fn search(&self, query: &str) -> Result<Vec<DirEntry>> {
        if query.is_empty() {
            return Err(FileboxError::Validation(
                "search query is required".to_string(),
            ));
        }
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let needle = query.to_lowercase();
        let mut matches = Vec::new();

        for entry in WalkDir::new(&self.root).min_depth(1).sort_by_file_name() {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy();
            if is_partial_upload(&name) {
                continue;
            }
            if name.to_lowercase().contains(&needle) {
                matches.push(DirEntry::new(
                    name.into_owned(),
                    EntryKind::from_is_dir(entry.file_type().is_dir()),
                ));
            }
        }

        Ok(matches)
    }

    /// Open a root-level file for reading, returning it with its size.
    pub fn open_file(&self, name: &str) -> Result<(File, u64)> {
        self.open_in(&self.root, name)
    }

    /// Open a file inside a named folder for reading.
    pub fn open_file_in(&self, folder: &str, name: &str) -> Result<(File, u64)> {
        let dir = self.resolve(folder)?;
        self.open_in(&dir, name)
    }

    fn open_in(&self, dir: &Path, name: &str) -> Result<(File, u64)> {
        let name = validate_file_name(name)?;
        let path = dir.join(name);
        let not_found = || FileboxError::NotFound(format!("File: {name}"));

        match fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => return Err(not_found()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(e.into()),
        }
        self.check_contained(&path)?;

        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(e.into()),
        };
        let len = file.metadata()?.len();

        Ok((file, len))
    }
}
