//! Core types for fathom.
//!
//! This crate provides the fundamental data structures shared by the
//! fathom engine and its consumers: the aggregate directory tree, entry
//! classification, error types, and scan configuration.

mod config;
mod entry;
mod error;
mod tree;

pub use config::{DEFAULT_MAX_IN_FLIGHT, DEFAULT_SLICE_MS, ScanConfig, ScanConfigBuilder, Strategy};
pub use entry::{EntryInsert, EntryKind, EntryView};
pub use error::{ScanWarning, TreeError, WarningKind};
pub use tree::{AggregateTree, DirectoryNode, LeafEntry};
