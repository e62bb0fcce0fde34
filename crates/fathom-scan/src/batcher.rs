//! Buffering of discovery events into ordered batches.

use tokio::sync::mpsc;
use tracing::debug;

use crate::event::{EventBatch, ScanEvent};

/// Buffers discovery events and flushes them as ordered batches.
///
/// Decouples the rate at which the walker discovers entries from the rate at
/// which a consumer absorbs them: a batch is flushed once `batch_size` events
/// are buffered, and the final partial batch is flushed on [`finish`].
/// Concatenating flushed batches reproduces the discovery sequence exactly,
/// with no loss or duplication.
///
/// When the consumer drops its receiver the batcher detaches: later events
/// are discarded without buffering and the walk continues undisturbed.
///
/// [`finish`]: EventBatcher::finish
#[derive(Debug)]
pub struct EventBatcher {
    buffer: Vec<ScanEvent>,
    batch_size: usize,
    tx: mpsc::Sender<EventBatch>,
    detached: bool,
}

impl EventBatcher {
    /// Create a batcher flushing every `batch_size` events (minimum 1).
    pub fn new(batch_size: usize, tx: mpsc::Sender<EventBatch>) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            buffer: Vec::with_capacity(batch_size),
            batch_size,
            tx,
            detached: false,
        }
    }

    /// Buffer one event, flushing if the batch is now full.
    pub async fn push(&mut self, event: ScanEvent) {
        if self.detached {
            return;
        }
        self.buffer.push(event);
        if self.buffer.len() >= self.batch_size {
            self.flush().await;
        }
    }

    /// Flush the final partial batch, if any.
    pub async fn finish(&mut self) {
        if !self.detached && !self.buffer.is_empty() {
            self.flush().await;
        }
    }

    /// Whether the consumer has gone away.
    pub fn is_detached(&self) -> bool {
        self.detached
    }

    async fn flush(&mut self) {
        let batch = std::mem::take(&mut self.buffer);
        if self.tx.send(batch).await.is_err() {
            debug!("event subscriber dropped, detaching batcher");
            self.detached = true;
            self.buffer = Vec::new();
        }
    }
}
