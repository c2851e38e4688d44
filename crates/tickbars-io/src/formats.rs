//! Conversion between bar sequences and Polars DataFrames
//!
//! Column order and names follow [`metric_columns`], so a frame built here and
//! a CSV written by [`crate::BarCsvWriter`] agree column for column.

use crate::columns::{BarColumn, CellValue, metric_columns};
use crate::errors::ExportError;
use polars::prelude::*;
use thiserror::Error;
use tickbars_core::{Bar, BarMetric, BarSet, BarSpec};

/// Trait for converting between Rust types and Polars DataFrames
pub trait DataFrameConverter: Sized {
    fn to_polars_dataframe(&self) -> PolarsResult<DataFrame>;

    fn from_polars_dataframe(metric: BarMetric, df: &DataFrame) -> Result<Self, ConversionError>;
}

/// Conversion errors with column context
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Missing required column: {column}")]
    MissingColumn { column: String },

    #[error("Invalid data type for column '{column}': expected {expected}, got {actual}")]
    InvalidDataType {
        column: String,
        expected: String,
        actual: String,
    },

    #[error("Data validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Bars of one metric as an in-memory table
#[derive(Debug, Clone, PartialEq)]
pub struct BarFrame {
    pub metric: BarMetric,
    pub bars: Vec<Bar>,
}

impl BarFrame {
    pub fn new(metric: BarMetric, bars: Vec<Bar>) -> Self {
        Self { metric, bars }
    }
}

impl DataFrameConverter for BarFrame {
    /// An empty bar sequence yields a zero-row frame with the full schema
    fn to_polars_dataframe(&self) -> PolarsResult<DataFrame> {
        let columns = metric_columns(self.metric)
            .iter()
            .map(|col| build_column(*col, &self.bars))
            .collect::<Vec<Column>>();
        DataFrame::new(columns)
    }

    fn from_polars_dataframe(metric: BarMetric, df: &DataFrame) -> Result<Self, ConversionError> {
        let height = df.height();

        let int = |col: BarColumn| extract_i64_column(df, col.name());
        let float = |col: BarColumn| extract_f64_column(df, col.name());

        let open_times = int(BarColumn::OpenTime)?;
        let close_times = int(BarColumn::CloseTime)?;
        let cum_ticks = int(BarColumn::CumTicks)?;
        let opens = float(BarColumn::Open)?;
        let highs = float(BarColumn::High)?;
        let lows = float(BarColumn::Low)?;
        let closes = float(BarColumn::Close)?;
        let volumes = float(BarColumn::CumVolume)?;
        let buy_volumes = float(BarColumn::CumBuyVolume)?;
        let dollars = float(BarColumn::CumDollar)?;

        let mut bars = Vec::with_capacity(height);
        for i in 0..height {
            let bar = Bar {
                metric,
                open_time: open_times[i],
                close_time: close_times[i],
                cum_ticks: cum_ticks[i] as u64,
                open: opens[i],
                high: highs[i],
                low: lows[i],
                close: closes[i],
                cum_volume: volumes[i],
                cum_buy_volume: buy_volumes[i],
                cum_dollar: dollars[i],
            };
            validate_bar(&bar)?;
            bars.push(bar);
        }

        Ok(Self { metric, bars })
    }
}

/// One DataFrame per spec of a bar set, in the set's spec order
pub fn bar_set_frames(set: &BarSet) -> Result<Vec<(BarSpec, DataFrame)>, ExportError> {
    set.iter()
        .map(|(spec, bars)| {
            let df = BarFrame::new(spec.metric(), bars.to_vec()).to_polars_dataframe()?;
            Ok((*spec, df))
        })
        .collect()
}

fn build_column(col: BarColumn, bars: &[Bar]) -> Column {
    if col.is_integer() {
        let values: Vec<i64> = bars
            .iter()
            .map(|bar| match col.value(bar) {
                CellValue::Int(v) => v,
                CellValue::Float(v) => v as i64,
            })
            .collect();
        Column::new(col.name().into(), values)
    } else {
        let values: Vec<f64> = bars
            .iter()
            .map(|bar| match col.value(bar) {
                CellValue::Int(v) => v as f64,
                CellValue::Float(v) => v,
            })
            .collect();
        Column::new(col.name().into(), values)
    }
}

fn extract_i64_column(df: &DataFrame, column_name: &str) -> Result<Vec<i64>, ConversionError> {
    let column = df
        .column(column_name)
        .map_err(|_| ConversionError::MissingColumn {
            column: column_name.to_string(),
        })?;

    Ok(column
        .i64()
        .map_err(|_| ConversionError::InvalidDataType {
            column: column_name.to_string(),
            expected: "i64".to_string(),
            actual: format!("{:?}", column.dtype()),
        })?
        .into_no_null_iter()
        .collect())
}

fn extract_f64_column(df: &DataFrame, column_name: &str) -> Result<Vec<f64>, ConversionError> {
    let column = df
        .column(column_name)
        .map_err(|_| ConversionError::MissingColumn {
            column: column_name.to_string(),
        })?;

    Ok(column
        .f64()
        .map_err(|_| ConversionError::InvalidDataType {
            column: column_name.to_string(),
            expected: "f64".to_string(),
            actual: format!("{:?}", column.dtype()),
        })?
        .into_no_null_iter()
        .collect())
}

fn validate_bar(bar: &Bar) -> Result<(), ConversionError> {
    if bar.close_time < bar.open_time {
        return Err(ConversionError::ValidationFailed {
            message: format!(
                "Invalid time sequence: close_time ({}) < open_time ({})",
                bar.close_time, bar.open_time
            ),
        });
    }

    if bar.high < bar.low {
        return Err(ConversionError::ValidationFailed {
            message: format!("Invalid OHLC: high ({}) < low ({})", bar.high, bar.low),
        });
    }

    if bar.cum_ticks == 0 {
        return Err(ConversionError::ValidationFailed {
            message: "Trade count must be positive".to_string(),
        });
    }

    Ok(())
}
