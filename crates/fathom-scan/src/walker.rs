//! Work-stack traversal engine with selectable strategy.
//!
//! One engine drives all three strategies from a single flat work stack, so
//! stack depth stays O(1) in tree depth:
//!
//! - `Serial` and `TimeSliced` push children unclassified and classify them
//!   one at a time at pop time, in listing order; `TimeSliced` additionally
//!   yields to the scheduler whenever a wall-clock slice budget is spent.
//! - `Parallel` classifies all children of a directory concurrently (capped
//!   by a semaphore), registers leaves in listing order, and pushes
//!   subdirectories pre-classified.
//!
//! Within one directory, leaves are reported in listing order. Under
//! `Parallel`, a directory's leaf events precede its subdirectory subtrees
//! and cross-subtree order is not guaranteed.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use fathom_core::{
    AggregateTree, EntryInsert, ScanConfig, ScanWarning, Strategy, TreeError, WarningKind,
};

use crate::batcher::EventBatcher;
use crate::event::ScanEvent;

/// Running counters for one scan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Directories registered.
    pub dirs: u64,
    /// Files registered.
    pub files: u64,
    /// Symbolic links registered.
    pub links: u64,
    /// Total file bytes registered.
    pub bytes: u64,
    /// Warnings recorded.
    pub warnings: u64,
}

/// What one classification produced.
enum Classified {
    Dir,
    Leaf(LeafClass),
}

enum LeafClass {
    File { size: u64 },
    Link { target: String },
}

/// Pending traversal work.
enum WorkItem {
    /// Classification still needed.
    Visit(PathBuf),
    /// Already known to be a directory (pre-classified under `Parallel`).
    Enter(PathBuf),
}

/// Result of one walk, handed back to the session.
pub(crate) struct WalkReport {
    pub warnings: Vec<ScanWarning>,
    pub stats: ScanStats,
    pub cancelled: bool,
    /// A structural contract violation escaping the engine; a bug, not a
    /// filesystem condition.
    pub failure: Option<TreeError>,
}

/// The traversal engine for one session.
///
/// Sole writer of the session's tree; every failure is caught at the scope
/// of the single path being processed and recorded as a warning, never
/// aborting sibling work.
pub(crate) struct Walker {
    config: ScanConfig,
    tree: Arc<RwLock<AggregateTree>>,
    batcher: EventBatcher,
    cancel: CancellationToken,
    permits: Arc<Semaphore>,
    warnings: Vec<ScanWarning>,
    stats: ScanStats,
}

impl Walker {
    pub(crate) fn new(
        config: ScanConfig,
        tree: Arc<RwLock<AggregateTree>>,
        batcher: EventBatcher,
        cancel: CancellationToken,
    ) -> Self {
        let permits = match config.strategy {
            Strategy::Parallel { max_in_flight } => max_in_flight.max(1),
            _ => 1,
        };
        Self {
            config,
            tree,
            batcher,
            cancel,
            permits: Arc::new(Semaphore::new(permits)),
            warnings: Vec::new(),
            stats: ScanStats::default(),
        }
    }

    /// Walk the subtree, flush the final event batch, and report.
    pub(crate) async fn run(mut self) -> WalkReport {
        let result = self.walk().await;
        // Whatever was discovered before completion, cancellation, or a
        // structural failure still reaches the subscriber.
        self.batcher.finish().await;
        let (cancelled, failure) = match result {
            Ok(cancelled) => (cancelled, None),
            Err(err) => (false, Some(err)),
        };
        WalkReport {
            warnings: self.warnings,
            stats: self.stats,
            cancelled,
            failure,
        }
    }

    /// Returns `Ok(true)` when the walk stopped due to cancellation.
    async fn walk(&mut self) -> Result<bool, TreeError> {
        let root = self.config.root.clone();
        let mut stack: Vec<WorkItem> = Vec::new();

        if self.cancel.is_cancelled() {
            return Ok(true);
        }

        // The root is expanded directly; a root that is not a directory
        // yields an empty tree plus a warning rather than a failure.
        match self.classify(&root).await {
            Some(Classified::Dir) => self.enter_dir(root, &mut stack).await?,
            Some(Classified::Leaf(_)) => {
                self.record_warning(ScanWarning::new(
                    &root,
                    "scan root is not a directory",
                    WarningKind::MetadataFailed,
                ));
            }
            None => {}
        }

        let budget = match self.config.strategy {
            Strategy::TimeSliced { slice_ms } => Some(Duration::from_millis(slice_ms.max(1))),
            _ => None,
        };
        let mut slice_started = Instant::now();

        while let Some(item) = stack.pop() {
            if self.cancel.is_cancelled() {
                return Ok(true);
            }
            if let Some(budget) = budget {
                if slice_started.elapsed() >= budget {
                    tokio::task::yield_now().await;
                    slice_started = Instant::now();
                }
            }
            match item {
                WorkItem::Visit(path) => match self.classify(&path).await {
                    Some(Classified::Dir) => self.enter_dir(path, &mut stack).await?,
                    Some(Classified::Leaf(leaf)) => self.record_leaf(path, leaf).await?,
                    None => {}
                },
                WorkItem::Enter(path) => self.enter_dir(path, &mut stack).await?,
            }
        }
        Ok(false)
    }

    /// Classify one path via lstat. Failures are recorded here; `None` means
    /// the path produced nothing to traverse (failed or unsupported kind).
    async fn classify(&mut self, path: &Path) -> Option<Classified> {
        let meta = match tokio::fs::symlink_metadata(path).await {
            Ok(meta) => meta,
            Err(err) => {
                self.report_io(path, &err, WarningKind::MetadataFailed);
                return None;
            }
        };
        self.classify_meta(path, &meta).await
    }

    async fn classify_meta(&mut self, path: &Path, meta: &std::fs::Metadata) -> Option<Classified> {
        let file_type = meta.file_type();
        if file_type.is_dir() {
            Some(Classified::Dir)
        } else if file_type.is_file() {
            Some(Classified::Leaf(LeafClass::File { size: meta.len() }))
        } else if file_type.is_symlink() {
            match tokio::fs::read_link(path).await {
                Ok(target) => Some(Classified::Leaf(LeafClass::Link {
                    target: target.to_string_lossy().into_owned(),
                })),
                Err(err) => {
                    self.report_io(path, &err, WarningKind::ReadLinkFailed);
                    None
                }
            }
        } else {
            // Sockets, fifos, devices: no size, no event.
            debug!(path = %path.display(), "skipping unsupported entry kind");
            None
        }
    }

    /// Register a directory, emit its event, list it, and queue its children.
    async fn enter_dir(&mut self, path: PathBuf, stack: &mut Vec<WorkItem>) -> Result<(), TreeError> {
        let parent = if path == self.config.root {
            None
        } else {
            path.parent().map(Path::to_path_buf)
        };
        self.tree.write().await.add_entry(&path, EntryInsert::Dir)?;
        self.stats.dirs += 1;
        self.batcher
            .push(ScanEvent::DirDiscovered {
                path: path.clone(),
                parent,
            })
            .await;

        let mut reader = match tokio::fs::read_dir(&path).await {
            Ok(reader) => reader,
            Err(err) => {
                self.report_io(&path, &err, WarningKind::ReadDirFailed);
                return Ok(());
            }
        };
        let mut children: Vec<PathBuf> = Vec::new();
        loop {
            match reader.next_entry().await {
                Ok(Some(entry)) => children.push(entry.path()),
                Ok(None) => break,
                Err(err) => {
                    self.report_io(&path, &err, WarningKind::ReadDirFailed);
                    break;
                }
            }
        }

        match self.config.strategy {
            Strategy::Parallel { .. } => self.expand_parallel(children, stack).await?,
            Strategy::Serial | Strategy::TimeSliced { .. } => {
                // Reversed so pops happen in listing order.
                for child in children.into_iter().rev() {
                    stack.push(WorkItem::Visit(child));
                }
            }
        }
        Ok(())
    }

    /// Classify all children concurrently, then apply results in listing
    /// order: leaves are registered immediately, subdirectories queued.
    async fn expand_parallel(
        &mut self,
        children: Vec<PathBuf>,
        stack: &mut Vec<WorkItem>,
    ) -> Result<(), TreeError> {
        let handles: Vec<(PathBuf, JoinHandle<io::Result<std::fs::Metadata>>)> = children
            .into_iter()
            .map(|child| {
                let permits = Arc::clone(&self.permits);
                let path = child.clone();
                let handle = tokio::spawn(async move {
                    let _permit = permits
                        .acquire_owned()
                        .await
                        .map_err(|_| io::Error::other("scan worker pool closed"))?;
                    tokio::fs::symlink_metadata(&path).await
                });
                (child, handle)
            })
            .collect();

        let mut subdirs: Vec<PathBuf> = Vec::new();
        for (child, handle) in handles {
            if self.cancel.is_cancelled() {
                // Remaining in-flight stats finish detached; nothing new
                // starts and no further results are applied.
                break;
            }
            let meta = match handle.await {
                Ok(Ok(meta)) => meta,
                Ok(Err(err)) => {
                    self.report_io(&child, &err, WarningKind::MetadataFailed);
                    continue;
                }
                Err(err) => {
                    self.report_io(&child, &io::Error::other(err), WarningKind::MetadataFailed);
                    continue;
                }
            };
            match self.classify_meta(&child, &meta).await {
                Some(Classified::Dir) => subdirs.push(child),
                Some(Classified::Leaf(leaf)) => self.record_leaf(child, leaf).await?,
                None => {}
            }
        }
        for dir in subdirs.into_iter().rev() {
            stack.push(WorkItem::Enter(dir));
        }
        Ok(())
    }

    /// Register a file or link and emit its discovery event.
    async fn record_leaf(&mut self, path: PathBuf, leaf: LeafClass) -> Result<(), TreeError> {
        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.root.clone());
        match leaf {
            LeafClass::File { size } => {
                self.tree
                    .write()
                    .await
                    .add_entry(&path, EntryInsert::File { size })?;
                self.stats.files += 1;
                self.stats.bytes += size;
                self.batcher
                    .push(ScanEvent::FileDiscovered { path, parent, size })
                    .await;
            }
            LeafClass::Link { target } => {
                self.tree.write().await.add_entry(
                    &path,
                    EntryInsert::Link {
                        target: target.clone(),
                    },
                )?;
                self.stats.links += 1;
                self.batcher
                    .push(ScanEvent::LinkDiscovered {
                        path,
                        parent,
                        target,
                    })
                    .await;
            }
        }
        Ok(())
    }

    fn report_io(&mut self, path: &Path, error: &io::Error, fallback: WarningKind) {
        self.record_warning(ScanWarning::from_io(path, error, fallback));
    }

    fn record_warning(&mut self, warning: ScanWarning) {
        warn!(path = %warning.path.display(), kind = ?warning.kind, "{}", warning.message);
        self.stats.warnings += 1;
        self.warnings.push(warning);
    }
}
