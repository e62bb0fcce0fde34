//! Scan configuration types.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Default cap on concurrent classification operations.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 32;

/// Default wall-clock budget per time slice, in milliseconds.
pub const DEFAULT_SLICE_MS: u64 = 150;

/// Traversal strategy, chosen once per session.
///
/// The choice changes observable ordering and latency: `Parallel` gives the
/// lowest latency but only guarantees ordering within a single directory
/// listing; `Serial` and `TimeSliced` report entries strictly in
/// depth-first listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Strategy {
    /// Classify all children of a directory concurrently, capped by a
    /// semaphore so file-descriptor usage stays bounded.
    Parallel {
        /// Maximum concurrent stat operations.
        max_in_flight: usize,
    },
    /// One entry at a time, in listing order. Predictable resource usage,
    /// highest latency for large trees.
    Serial,
    /// Work-stack traversal in wall-clock slices, yielding to the scheduler
    /// between slices so the host stays responsive during long scans.
    TimeSliced {
        /// Slice budget in milliseconds.
        slice_ms: u64,
    },
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Parallel {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

/// Configuration for one scan session.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root path to scan.
    pub root: PathBuf,

    /// Traversal strategy.
    #[builder(default)]
    #[serde(default)]
    pub strategy: Strategy,

    /// Number of discovery events buffered before a batch is flushed.
    /// 1 flushes every event; the final partial batch always flushes.
    #[builder(default = "1")]
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    1
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref root) = self.root {
            if root.as_os_str().is_empty() {
                return Err("Root path cannot be empty".to_string());
            }
        } else {
            return Err("Root path is required".to_string());
        }
        if let Some(batch_size) = self.batch_size {
            if batch_size == 0 {
                return Err("Batch size must be at least 1".to_string());
            }
        }
        if let Some(Strategy::Parallel { max_in_flight }) = self.strategy {
            if max_in_flight == 0 {
                return Err("max_in_flight must be at least 1".to_string());
            }
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a simple config for scanning a path with defaults.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            strategy: Strategy::default(),
            batch_size: 1,
        }
    }
}
