//! Scan sessions: the externally visible unit of work.
//!
//! One session owns one tree, one walker, and one event subscription for one
//! root path. Sessions are fully independent, so concurrent scans of
//! different roots never interfere; terminal states are final and a new root
//! requires a new session.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::info;

use fathom_core::{AggregateTree, EntryView, ScanConfig, ScanWarning};

use crate::batcher::EventBatcher;
use crate::event::EventBatch;
use crate::walker::{ScanStats, Walker};

/// Capacity of the event-batch subscription channel.
pub const EVENT_CHANNEL_SIZE: usize = 256;

/// Lifecycle state of a session: `Idle -> Scanning -> terminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created, traversal not yet started.
    Idle,
    /// Traversal in progress.
    Scanning,
    /// All recursive work finished.
    Completed,
    /// Cancelled before exhaustion; the tree is partial.
    Cancelled,
    /// A structural bug escaped the engine.
    Failed,
}

impl SessionState {
    /// Whether this state is final.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Cancelled | SessionState::Failed
        )
    }
}

/// Completion payload, delivered exactly once per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOutcome {
    /// Snapshot of the tree at completion: everything that was readable.
    pub tree: AggregateTree,
    /// Everything that was not, one warning per isolated path.
    pub warnings: Vec<ScanWarning>,
    /// Running counters for the scan.
    pub stats: ScanStats,
    /// Terminal state (`Completed`, `Cancelled`, or `Failed`).
    pub status: SessionState,
    /// Failure message when `status` is `Failed`.
    pub failure: Option<String>,
}

/// Handle to one scan over one root path.
///
/// Created by [`start_scan`]; exposes the event subscription, live tree
/// queries, cooperative cancellation, and the completion outcome.
pub struct ScanSession {
    tree: Arc<RwLock<AggregateTree>>,
    cancel: CancellationToken,
    events: Option<mpsc::Receiver<EventBatch>>,
    done: Option<oneshot::Receiver<ScanOutcome>>,
    outcome: Option<ScanOutcome>,
    state: watch::Receiver<SessionState>,
}

/// Start scanning `config.root`, returning the session handle immediately.
///
/// Traversal runs on a spawned task; the session's tree is written only by
/// that task, so live queries never observe a half-applied size update.
pub fn start_scan(config: ScanConfig) -> ScanSession {
    let tree = Arc::new(RwLock::new(AggregateTree::new(config.root.clone())));
    let (batch_tx, batch_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
    let (done_tx, done_rx) = oneshot::channel();
    let (state_tx, state_rx) = watch::channel(SessionState::Idle);
    let cancel = CancellationToken::new();

    let root = config.root.clone();
    let batcher = EventBatcher::new(config.batch_size, batch_tx);
    let walker = Walker::new(config, Arc::clone(&tree), batcher, cancel.clone());
    let task_tree = Arc::clone(&tree);

    tokio::spawn(async move {
        let _ = state_tx.send(SessionState::Scanning);
        info!(root = %root.display(), "scan started");

        let report = walker.run().await;
        let status = if report.failure.is_some() {
            SessionState::Failed
        } else if report.cancelled {
            SessionState::Cancelled
        } else {
            SessionState::Completed
        };
        info!(
            root = %root.display(),
            ?status,
            dirs = report.stats.dirs,
            files = report.stats.files,
            warnings = report.stats.warnings,
            "scan finished"
        );

        let outcome = ScanOutcome {
            tree: task_tree.read().await.clone(),
            warnings: report.warnings,
            stats: report.stats,
            status,
            failure: report.failure.map(|err| err.to_string()),
        };
        let _ = state_tx.send(status);
        let _ = done_tx.send(outcome);
    });

    ScanSession {
        tree,
        cancel,
        events: Some(batch_rx),
        done: Some(done_rx),
        outcome: None,
        state: state_rx,
    }
}

impl ScanSession {
    /// Take the event subscription. Yields ordered batches of discovery
    /// events; available at most once per session.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<EventBatch>> {
        self.events.take()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// A watch handle for observing state transitions.
    pub fn state_changes(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Request cooperative cancellation. In-flight classification and
    /// listing finish; nothing new starts. The completion outcome still
    /// arrives, carrying the partial tree.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Detach the event subscription. The batcher stops buffering once it
    /// notices; traversal and tree construction run to completion.
    pub fn shutdown(&mut self) {
        self.events = None;
    }

    /// Wait for completion. Resolves exactly once per scan; later calls
    /// return the same cached outcome.
    ///
    /// A subscription that was never taken is released here: with no consumer
    /// to drain it, the channel would otherwise fill and stall the walker.
    pub async fn wait(&mut self) -> ScanOutcome {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }
        self.events = None;
        let outcome = match self.done.take() {
            Some(done) => match done.await {
                Ok(outcome) => outcome,
                Err(_) => self.aborted_outcome().await,
            },
            None => self.aborted_outcome().await,
        };
        self.outcome = Some(outcome.clone());
        outcome
    }

    /// The root entry plus its one-level listing, safe during a live scan.
    pub async fn view_root(&self) -> Vec<EntryView> {
        self.tree.read().await.view_root()
    }

    /// One-level listing at `path`; empty when not (yet) present.
    pub async fn view_path(&self, path: &Path) -> Vec<EntryView> {
        self.tree.read().await.view_path(path)
    }

    /// The root path this session scans.
    pub async fn root_path(&self) -> PathBuf {
        self.tree.read().await.root_path().to_path_buf()
    }

    /// Fallback outcome for a scan task that went away without reporting.
    async fn aborted_outcome(&self) -> ScanOutcome {
        ScanOutcome {
            tree: self.tree.read().await.clone(),
            warnings: Vec::new(),
            stats: ScanStats::default(),
            status: SessionState::Failed,
            failure: Some("scan task terminated unexpectedly".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!SessionState::Idle.is_terminal());
        assert!(!SessionState::Scanning.is_terminal());
        assert!(SessionState::Completed.is_terminal());
        assert!(SessionState::Cancelled.is_terminal());
        assert!(SessionState::Failed.is_terminal());
    }
}
