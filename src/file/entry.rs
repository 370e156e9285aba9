//! Directory listing items.

use std::cmp::Ordering;
use std::time::SystemTime;

use serde::Serialize;

/// Whether a listed entry is a file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

impl EntryKind {
    pub fn from_is_dir(is_dir: bool) -> Self {
        if is_dir {
            EntryKind::Folder
        } else {
            EntryKind::File
        }
    }
}

/// A single item of a folder listing or search result.
///
/// Serializes as `{"name": "...", "type": "file" | "folder"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(skip)]
    pub modified: Option<SystemTime>,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
            modified: None,
        }
    }

    pub fn with_modified(mut self, modified: Option<SystemTime>) -> Self {
        self.modified = modified;
        self
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}

/// Ordering applied to folder listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Lexicographic by name.
    #[default]
    Name,
    /// Oldest modification time first. Ties keep name order.
    ModifiedAsc,
}

impl SortOrder {
    pub fn from_sort_by_date(sort_by_date: bool) -> Self {
        if sort_by_date {
            SortOrder::ModifiedAsc
        } else {
            SortOrder::Name
        }
    }

    pub(crate) fn sort(self, entries: &mut [DirEntry]) {
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        if self == SortOrder::ModifiedAsc {
            // Stable sort, so equal timestamps stay in name order.
            entries.sort_by(|a, b| match (a.modified, b.modified) {
                (Some(a), Some(b)) => a.cmp(&b),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            });
        }
    }
}
