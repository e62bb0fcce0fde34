//! Entry classification and view records.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Classification of a filesystem entry discovered during a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Directory.
    Directory,
    /// Regular file.
    File,
    /// Symbolic link (recorded, never followed).
    Link,
}

impl EntryKind {
    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }

    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, EntryKind::File)
    }

    /// Check if this is a symbolic link.
    pub fn is_link(&self) -> bool {
        matches!(self, EntryKind::Link)
    }
}

/// Payload for registering one entry into an [`AggregateTree`].
///
/// [`AggregateTree`]: crate::AggregateTree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryInsert {
    /// A directory; starts empty with size 0.
    Dir,
    /// A regular file with its byte size.
    File {
        /// Size in bytes.
        size: u64,
    },
    /// A symbolic link with its raw, unresolved target. Contributes zero
    /// size to ancestors.
    Link {
        /// Raw link target string.
        target: String,
    },
}

impl EntryInsert {
    /// The kind this insert registers.
    pub fn kind(&self) -> EntryKind {
        match self {
            EntryInsert::Dir => EntryKind::Directory,
            EntryInsert::File { .. } => EntryKind::File,
            EntryInsert::Link { .. } => EntryKind::Link,
        }
    }

    /// Size contributed to ancestor directories.
    pub fn size(&self) -> u64 {
        match self {
            EntryInsert::File { size } => *size,
            EntryInsert::Dir | EntryInsert::Link { .. } => 0,
        }
    }
}

/// One row of a flat, one-level tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryView {
    /// Absolute path of the entry.
    pub path: PathBuf,
    /// Size in bytes (aggregate for directories, 0 for links).
    pub size: u64,
    /// Entry classification.
    pub kind: EntryKind,
}

impl EntryView {
    /// Create a new view record.
    pub fn new(path: impl Into<PathBuf>, size: u64, kind: EntryKind) -> Self {
        Self {
            path: path.into(),
            size,
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_kind_predicates() {
        assert!(EntryKind::Directory.is_dir());
        assert!(EntryKind::File.is_file());
        assert!(EntryKind::Link.is_link());
        assert!(!EntryKind::Link.is_file());
    }

    #[test]
    fn test_insert_size() {
        assert_eq!(EntryInsert::Dir.size(), 0);
        assert_eq!(EntryInsert::File { size: 42 }.size(), 42);
        assert_eq!(
            EntryInsert::Link {
                target: "/tmp".into()
            }
            .size(),
            0
        );
    }

    #[test]
    fn test_insert_kind() {
        assert_eq!(EntryInsert::Dir.kind(), EntryKind::Directory);
        assert_eq!(EntryInsert::File { size: 1 }.kind(), EntryKind::File);
    }
}
