//! Discovery events emitted during traversal.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use fathom_core::EntryKind;

/// One discovered entry, reported exactly once per entry.
///
/// Events are plain structural records so a transport can forward them
/// verbatim (e.g. as line-delimited JSON).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanEvent {
    /// A directory was discovered. `parent` is `None` only for the scan root.
    DirDiscovered {
        path: PathBuf,
        parent: Option<PathBuf>,
    },
    /// A regular file was discovered.
    FileDiscovered {
        path: PathBuf,
        parent: PathBuf,
        size: u64,
    },
    /// A symbolic link was discovered; `target` is the raw, unresolved
    /// link target. Links are never followed.
    LinkDiscovered {
        path: PathBuf,
        parent: PathBuf,
        target: String,
    },
}

impl ScanEvent {
    /// Path of the discovered entry.
    pub fn path(&self) -> &Path {
        match self {
            ScanEvent::DirDiscovered { path, .. }
            | ScanEvent::FileDiscovered { path, .. }
            | ScanEvent::LinkDiscovered { path, .. } => path,
        }
    }

    /// Classification of the discovered entry.
    pub fn kind(&self) -> EntryKind {
        match self {
            ScanEvent::DirDiscovered { .. } => EntryKind::Directory,
            ScanEvent::FileDiscovered { .. } => EntryKind::File,
            ScanEvent::LinkDiscovered { .. } => EntryKind::Link,
        }
    }
}

/// An ordered group of discovery events flushed together to a consumer.
pub type EventBatch = Vec<ScanEvent>;
