//! Real-time streaming engine for threshold bar processing
//!
//! Live trades arrive one at a time from an external transport, are fanned
//! out to every configured accumulator, and completed bars leave through a
//! bounded channel. Bars are identical to those a batch run over the same
//! trades produces.

pub mod errors;
pub mod live_engine;
pub mod shared;
pub mod source;

// Re-export commonly used types
pub use errors::StreamError;
pub use live_engine::{
    DEFAULT_BAR_CHANNEL_CAPACITY, LiveBarEngine, LiveEngineConfig, LiveEngineMetrics,
    LiveEngineMetricsSnapshot, LiveSessionReport, OverflowPolicy, SessionEnd,
};
pub use shared::{DEFAULT_HISTORY_CAPACITY, SharedDispatcher};
pub use source::{
    ChannelTradeSource, DEFAULT_TRADE_CHANNEL_CAPACITY, LiveTradeSource, StreamTradeSource,
};
