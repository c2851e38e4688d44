//! Batch processing of historical trades
//!
//! One logical pass over a paged [`tickbars_core::TradeSource`]: pages are
//! processed in order, trades within a page in arrival order, and open buckets
//! carry over page boundaries. Optional read-ahead overlaps file I/O with
//! processing without reordering anything.

pub mod engine;
pub mod prefetch;

pub use engine::{BatchConfig, BatchEngine, BatchError, BatchResult, DEFAULT_PAGE_SIZE};
pub use prefetch::Prefetch;
