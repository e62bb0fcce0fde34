//! Filesystem traversal engine for fathom.
//!
//! This crate walks a directory subtree, classifies every entry (directory,
//! file, symbolic link), maintains per-directory aggregate sizes
//! incrementally, and streams discovery events to a consumer as ordered
//! batches. A single unreadable path never aborts the scan: it is recorded
//! as a warning and its subtree is skipped.
//!
//! # Example
//!
//! ```rust,no_run
//! use fathom_scan::{ScanConfig, start_scan};
//!
//! # async fn demo() {
//! let mut session = start_scan(ScanConfig::new("/path/to/scan"));
//! let outcome = session.wait().await;
//!
//! println!("{} bytes in {} files", outcome.stats.bytes, outcome.stats.files);
//! for warning in &outcome.warnings {
//!     eprintln!("skipped {}: {}", warning.path.display(), warning.message);
//! }
//! # }
//! ```
//!
//! # Event subscription
//!
//! Discovery events arrive as ordered batches while the scan runs:
//!
//! ```rust,no_run
//! use fathom_scan::{ScanConfig, start_scan};
//!
//! # async fn demo() {
//! let config = ScanConfig::builder()
//!     .root("/path/to/scan")
//!     .batch_size(64usize)
//!     .build()
//!     .unwrap();
//! let mut session = start_scan(config);
//! let mut batches = session.take_events().unwrap();
//!
//! tokio::spawn(async move {
//!     while let Some(batch) = batches.recv().await {
//!         for event in batch {
//!             println!("found {}", event.path().display());
//!         }
//!     }
//! });
//! # }
//! ```

mod batcher;
mod event;
mod session;
mod walker;

pub use batcher::EventBatcher;
pub use event::{EventBatch, ScanEvent};
pub use session::{EVENT_CHANNEL_SIZE, ScanOutcome, ScanSession, SessionState, start_scan};
pub use walker::ScanStats;

// Re-export core types for convenience
pub use fathom_core::{
    AggregateTree, EntryInsert, EntryKind, EntryView, ScanConfig, ScanWarning, Strategy,
    TreeError, WarningKind,
};
