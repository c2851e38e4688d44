//! Core threshold bar algorithms
//!
//! Activity-clocked bar construction: a bar closes when the cumulative tick
//! count, traded volume or traded dollar value of its bucket reaches a fixed
//! threshold, instead of at fixed time intervals.
//!
//! ## Features
//!
//! - Threshold-inclusive: the trade that reaches the threshold closes the bar
//! - No splitting: an oversized trade closes exactly one bar
//! - Per-bucket extrema: open/high/low never depend on how input was paged
//! - Batch-invariance: paged batch input and one-at-a-time live input produce
//!   identical bars
//! - Multi-metric fan-out over one shared trade feed
//! - Two-sided CUSUM event filter (fixed or per-index threshold)

pub mod accumulator;
pub mod checkpoint;
pub mod cusum;
pub mod dispatcher;
pub mod errors;
pub mod source;
pub mod trade;
pub mod types;

// Test utilities (only available in test builds or with test-utils feature)
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export commonly used types
pub use accumulator::{BarAccumulator, Bucket};
pub use checkpoint::{AccumulatorCheckpoint, CheckpointError};
pub use cusum::{CusumError, CusumEvent, CusumFilter, CusumThreshold};
pub use dispatcher::{BarSet, EmittedBars, MultiMetricDispatcher, validate_specs};
pub use errors::ProcessingError;
pub use source::{RowError, SliceSource, SourceError, TradePage, TradeSource};
pub use trade::{Trade, TradeError};
pub use types::{Bar, BarMetric, BarSpec, EmittedBar};
