//! Checkpoints for continuing open buckets across input boundaries
//!
//! ```text
//! File 1 ends with an open bucket → save checkpoint
//! File 2 starts → restore checkpoint → the bucket continues
//! ```
//!
//! Restoring a checkpoint and feeding the remaining trades yields exactly the
//! bars of processing the unsplit input.

use crate::accumulator::Bucket;
use crate::errors::ProcessingError;
use crate::types::BarSpec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Serializable state of one accumulator
///
/// # Example
///
/// ```ignore
/// let bars_1 = accumulator.process_trades(&day1);
/// let json = serde_json::to_string(&accumulator.checkpoint())?;
/// std::fs::write("volume_1000.json", json)?;
///
/// // ... later ...
/// let checkpoint: AccumulatorCheckpoint = serde_json::from_str(&json)?;
/// let mut accumulator = BarAccumulator::from_checkpoint(checkpoint)?;
/// let bars_2 = accumulator.process_trades(&day2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccumulatorCheckpoint {
    /// Spec of the accumulator that produced this checkpoint
    pub spec: BarSpec,

    /// Open bucket at the boundary (`None` = last bar closed cleanly)
    pub bucket: Option<Bucket>,
}

impl AccumulatorCheckpoint {
    pub fn has_open_bucket(&self) -> bool {
        self.bucket.is_some()
    }
}

/// Errors when restoring from a checkpoint
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CheckpointError {
    /// A checkpoint was offered to an accumulator of a different spec
    #[error("Spec mismatch: checkpoint has '{checkpoint}', expected '{expected}'")]
    SpecMismatch { checkpoint: String, expected: String },

    /// Stored bucket violates the bucket invariants
    #[error("Checkpoint for '{spec}' holds an inconsistent bucket - corrupted checkpoint")]
    InvalidBucket { spec: String },

    /// Checkpoint set does not describe a valid dispatcher (empty or duplicated)
    #[error(transparent)]
    Specs(#[from] ProcessingError),
}
