//! Error and warning types for scanning operations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structural contract violations against the aggregate tree.
///
/// These indicate a bug in the caller (the engine must register a parent
/// directory before any of its children, and must never hand the tree a path
/// outside its root). They are fatal to the operation that triggered them and
/// are never silently swallowed; the failing insert is rejected before any
/// mutation, so completed parts of the tree stay intact.
#[derive(Debug, Error)]
pub enum TreeError {
    /// The path is not a strict descendant of the tree's root.
    #[error("path {path} is outside scan root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    /// The parent directory node has not been registered yet.
    #[error("parent directory not registered for {path}")]
    MissingParent { path: PathBuf },

    /// A parent component of the path resolves to a file or link.
    #[error("path component is not a directory: {path}")]
    NotADirectory { path: PathBuf },
}

/// Kind of non-fatal scan warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// OS-level access denial on a specific path.
    PermissionDenied,
    /// Entry disappeared or changed type between listing and stat.
    Vanished,
    /// Directory listing failed.
    ReadDirFailed,
    /// Stat/classification failed.
    MetadataFailed,
    /// Reading a symlink target failed.
    ReadLinkFailed,
}

/// Non-fatal per-path failure recorded during a scan.
///
/// A warning isolates exactly one path: that path's subtree is omitted from
/// the tree and the scan continues with siblings and remaining work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Path where the failure occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl ScanWarning {
    /// Create a new scan warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Classify an I/O failure for `path` during `fallback`-kind work.
    ///
    /// Permission denials and vanished entries get their dedicated kinds
    /// regardless of which operation surfaced them.
    pub fn from_io(path: impl Into<PathBuf>, error: &std::io::Error, fallback: WarningKind) -> Self {
        let kind = match error.kind() {
            std::io::ErrorKind::PermissionDenied => WarningKind::PermissionDenied,
            std::io::ErrorKind::NotFound => WarningKind::Vanished,
            _ => fallback,
        };
        Self::new(path, error.to_string(), kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_permission_denied() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let warning = ScanWarning::from_io("/test/path", &err, WarningKind::MetadataFailed);
        assert_eq!(warning.kind, WarningKind::PermissionDenied);
        assert_eq!(warning.path, PathBuf::from("/test/path"));
    }

    #[test]
    fn test_from_io_vanished() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let warning = ScanWarning::from_io("/test/file", &err, WarningKind::ReadDirFailed);
        assert_eq!(warning.kind, WarningKind::Vanished);
    }

    #[test]
    fn test_from_io_fallback() {
        let err = std::io::Error::other("boom");
        let warning = ScanWarning::from_io("/test", &err, WarningKind::ReadDirFailed);
        assert_eq!(warning.kind, WarningKind::ReadDirFailed);
        assert!(warning.message.contains("boom"));
    }

    #[test]
    fn test_tree_error_display() {
        let err = TreeError::MissingParent {
            path: PathBuf::from("/r/a/b"),
        };
        assert!(err.to_string().contains("/r/a/b"));
    }
}
