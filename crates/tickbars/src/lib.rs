//! Activity-clocked bars for market data: tick, volume and dollar bars plus a
//! symmetric CUSUM event filter.
//!
//! A bar closes when the tick count, traded volume or traded dollar value of
//! its bucket reaches a fixed threshold. The same trades produce the same bars
//! whether they arrive as one-at-a-time live messages or as pages of a large
//! file.
//!
//! ## Meta-Crate
//!
//! This crate re-exports the tickbars sub-crates behind features:
//!
//! - `tickbars-core` - accumulators, dispatcher, CUSUM filter (always enabled)
//! - `tickbars-io` - CSV trade sources, bar export, Polars frames (`io`, `polars`)
//! - `tickbars-batch` - paged batch engine with read-ahead (`batch`)
//! - `tickbars-streaming` - live engine over async trade feeds (`streaming`)
//! - `tickbars-config` - layered settings (`config`)
//!
//! ## Basic Usage
//!
//! ```rust
//! use tickbars::{BarSpec, MultiMetricDispatcher, Trade};
//!
//! let specs = [BarSpec::tick(2).unwrap(), BarSpec::volume(10.0).unwrap()];
//! let mut dispatcher = MultiMetricDispatcher::new(specs).unwrap();
//!
//! let trades = [
//!     Trade::new(1_700_000_000_000_000, 100.0, 4.0).unwrap(),
//!     Trade::new(1_700_000_000_001_000, 101.0, 7.0).unwrap(),
//! ];
//! let bars = dispatcher.process_trades(&trades);
//! assert_eq!(bars.total_bars(), 2);
//! ```
//!
//! ### Batch Mode
//! ```rust,no_run
//! # #[cfg(feature = "batch")]
//! # {
//! use tickbars::batch::{BatchConfig, BatchEngine};
//! use tickbars::io::TradeLayout;
//! use tickbars::BarSpec;
//!
//! let engine = BatchEngine::new([BarSpec::dollar(1e6).unwrap()], BatchConfig::default()).unwrap();
//! let result = engine.process_csv("trades.csv", TradeLayout::Epoch).unwrap();
//! println!("{} bars, {} rows rejected", result.bars.total_bars(), result.rejected.len());
//! # }
//! ```
//!
//! ### CUSUM Filter
//! ```rust
//! use tickbars::{CusumFilter, CusumThreshold};
//!
//! let series: Vec<(usize, f64)> = [0.0, 1.0, 2.0, 0.0, -3.0, -3.0, 5.0]
//!     .into_iter()
//!     .enumerate()
//!     .collect();
//! let events = CusumFilter::scan(&series, &CusumThreshold::Fixed(2.0)).unwrap();
//! assert_eq!(events, vec![4, 6]);
//! ```

// Re-export core (always available)
pub use tickbars_core as core;

// Re-export optional crates
#[cfg(feature = "io")]
pub use tickbars_io as io;

#[cfg(feature = "batch")]
pub use tickbars_batch as batch;

#[cfg(feature = "streaming")]
pub use tickbars_streaming as streaming;

#[cfg(feature = "config")]
pub use tickbars_config as config;

// Re-export commonly used types at crate root for convenience
pub use tickbars_core::{
    Bar, BarAccumulator, BarMetric, BarSet, BarSpec, CusumEvent, CusumFilter, CusumThreshold,
    EmittedBar, MultiMetricDispatcher, ProcessingError, Trade, TradeSource,
};

#[cfg(feature = "config")]
pub use tickbars_config::Settings;

#[cfg(feature = "batch")]
pub use tickbars_batch::{BatchConfig, BatchEngine, BatchResult};

#[cfg(feature = "streaming")]
pub use tickbars_streaming::{LiveBarEngine, LiveEngineConfig, OverflowPolicy, SharedDispatcher};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
