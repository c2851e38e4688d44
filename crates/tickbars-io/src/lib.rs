//! Input/output operations for threshold bar data
//!
//! - [`CsvTradeSource`]: paged trade reader implementing
//!   [`tickbars_core::TradeSource`]
//! - [`BarCsvWriter`]: delimited bar export in metric-specific column order
//! - [`read_series`]: labeled value series for the CUSUM filter
//! - `BarFrame` (feature `polars`): bar sequences as Polars DataFrames

pub mod columns;
pub mod csv_export;
pub mod csv_source;
pub mod errors;
pub mod series;

#[cfg(feature = "polars")]
pub mod formats;

pub use columns::{BarColumn, CellValue, metric_columns, metric_header};
pub use csv_export::{BarCsvWriter, CsvExportConfig, CsvExportResult};
pub use csv_source::{CsvTradeSource, TradeLayout};
pub use errors::ExportError;
pub use series::{LabeledSeries, read_series, read_series_from};

#[cfg(feature = "polars")]
pub use formats::{BarFrame, ConversionError, DataFrameConverter, bar_set_frames};
