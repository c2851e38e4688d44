//! `tickbars` command-line interface
//!
//! - `tickbars bars`: batch run over a trade CSV, one bar CSV per spec
//! - `tickbars cusum`: CUSUM event labels of a CSV series

pub mod args;
pub mod commands;
pub mod logging;

pub use args::{BarsArgs, Cli, Command, CusumArgs, LayoutArg};
pub use commands::{BarsSummary, run_bars, run_cusum};
pub use logging::init_tracing;
