//! Bar column layout per metric
//!
//! Every export path (CSV, DataFrame) takes its column order from
//! [`metric_columns`]. The thresholding metric's own cumulative column sits
//! right after `close`; the other two metrics trail as extra columns.

use tickbars_core::{Bar, BarMetric};

/// One exported bar field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarColumn {
    OpenTime,
    CloseTime,
    CumTicks,
    Open,
    High,
    Low,
    Close,
    CumVolume,
    CumBuyVolume,
    CumDollar,
}

/// Typed cell value, integers stay integers in the output
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellValue {
    Int(i64),
    Float(f64),
}

impl BarColumn {
    pub fn name(&self) -> &'static str {
        match self {
            BarColumn::OpenTime => "open_time",
            BarColumn::CloseTime => "close_time",
            BarColumn::CumTicks => "cum_ticks",
            BarColumn::Open => "open",
            BarColumn::High => "high",
            BarColumn::Low => "low",
            BarColumn::Close => "close",
            BarColumn::CumVolume => "cum_volume",
            BarColumn::CumBuyVolume => "cum_buy_volume",
            BarColumn::CumDollar => "cum_dollar",
        }
    }

    pub fn value(&self, bar: &Bar) -> CellValue {
        match self {
            BarColumn::OpenTime => CellValue::Int(bar.open_time),
            BarColumn::CloseTime => CellValue::Int(bar.close_time),
            BarColumn::CumTicks => CellValue::Int(bar.cum_ticks as i64),
            BarColumn::Open => CellValue::Float(bar.open),
            BarColumn::High => CellValue::Float(bar.high),
            BarColumn::Low => CellValue::Float(bar.low),
            BarColumn::Close => CellValue::Float(bar.close),
            BarColumn::CumVolume => CellValue::Float(bar.cum_volume),
            BarColumn::CumBuyVolume => CellValue::Float(bar.cum_buy_volume),
            BarColumn::CumDollar => CellValue::Float(bar.cum_dollar),
        }
    }

    /// Whether the column holds integers (timestamps, tick counts)
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            BarColumn::OpenTime | BarColumn::CloseTime | BarColumn::CumTicks
        )
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Int(v) => write!(f, "{v}"),
            CellValue::Float(v) => write!(f, "{v}"),
        }
    }
}

use BarColumn::*;

const TICK_COLUMNS: [BarColumn; 10] = [
    OpenTime, CloseTime, CumVolume, Open, High, Low, Close, CumTicks, CumBuyVolume, CumDollar,
];

const VOLUME_COLUMNS: [BarColumn; 10] = [
    OpenTime, CloseTime, CumTicks, Open, High, Low, Close, CumVolume, CumBuyVolume, CumDollar,
];

const DOLLAR_COLUMNS: [BarColumn; 10] = [
    OpenTime, CloseTime, CumTicks, Open, High, Low, Close, CumDollar, CumBuyVolume, CumVolume,
];

/// Column order for bars of `metric`
pub fn metric_columns(metric: BarMetric) -> &'static [BarColumn; 10] {
    match metric {
        BarMetric::Tick => &TICK_COLUMNS,
        BarMetric::Volume => &VOLUME_COLUMNS,
        BarMetric::Dollar => &DOLLAR_COLUMNS,
    }
}

/// Header names for bars of `metric`
pub fn metric_header(metric: BarMetric) -> [&'static str; 10] {
    metric_columns(metric).map(|c| c.name())
}
