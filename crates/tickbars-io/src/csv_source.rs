//! Paged CSV trade reader
//!
//! Reads a trade file in pages of `page_size` rows. Rows that cannot become a
//! valid [`Trade`] are reported as [`RowError`]s and skipped; everything else
//! about the file (missing, unreadable, missing columns) is fatal.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tickbars_core::{RowError, SourceError, Trade, TradePage, TradeSource};

/// Epoch values below this are milliseconds (13 digits), above microseconds
const MICROS_CUTOFF: i64 = 100_000_000_000_000;

/// Column layout of a trade file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeLayout {
    /// `timestamp,price,volume` with epoch milliseconds or microseconds
    #[default]
    Epoch,
    /// `Date,Time,Price,Volume` with `%Y-%m-%d` and `%H:%M:%S%.f` in UTC
    DateTime,
}

impl TradeLayout {
    fn required_columns(&self) -> &'static [&'static str] {
        match self {
            TradeLayout::Epoch => &["timestamp", "price", "volume"],
            TradeLayout::DateTime => &["date", "time", "price", "volume"],
        }
    }
}

impl std::str::FromStr for TradeLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "epoch" => Ok(TradeLayout::Epoch),
            "date_time" | "datetime" => Ok(TradeLayout::DateTime),
            other => Err(format!(
                "unknown trade layout '{other}', expected epoch or date_time"
            )),
        }
    }
}

/// Resolved column positions in the header
#[derive(Debug, Clone, Copy)]
enum ColumnMap {
    Epoch {
        timestamp: usize,
        price: usize,
        volume: usize,
    },
    DateTime {
        date: usize,
        time: usize,
        price: usize,
        volume: usize,
    },
}

/// CSV-backed [`TradeSource`]
///
/// ```ignore
/// let mut source = CsvTradeSource::open("trades.csv", TradeLayout::Epoch, 1_000_000)?;
/// while let Some(page) = source.next_page()? {
///     set.merge(dispatcher.process_trades(&page.trades));
/// }
/// ```
pub struct CsvTradeSource<R: Read = File> {
    reader: csv::Reader<BufReader<R>>,
    path: PathBuf,
    columns: ColumnMap,
    page_size: usize,
    record: StringRecord,
    exhausted: bool,
    rows_read: u64,
    rows_rejected: u64,
}

impl CsvTradeSource<File> {
    /// Open a trade file
    ///
    /// # Errors
    ///
    /// - `SourceError::InvalidPageSize` for `page_size == 0`
    /// - `SourceError::Open` if the file is missing or unreadable
    /// - `SourceError::MissingColumn` if the header lacks a layout column
    pub fn open<P: AsRef<Path>>(
        path: P,
        layout: TradeLayout,
        page_size: usize,
    ) -> Result<Self, SourceError> {
        let path = path.as_ref();
        if page_size == 0 {
            return Err(SourceError::InvalidPageSize { size: page_size });
        }
        let file = File::open(path).map_err(|source| SourceError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_reader(file, path, layout, page_size)
    }
}

impl<R: Read> CsvTradeSource<R> {
    /// Read trades from any reader; `path` only names the input in logs and errors
    pub fn from_reader<P: AsRef<Path>>(
        reader: R,
        path: P,
        layout: TradeLayout,
        page_size: usize,
    ) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        if page_size == 0 {
            return Err(SourceError::InvalidPageSize { size: page_size });
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(BufReader::new(reader));

        let headers = reader.headers().map_err(|e| SourceError::Read {
            path: path.clone(),
            source: Box::new(e),
        })?;
        let columns = resolve_columns(headers, layout, &path)?;

        tracing::debug!(path = %path.display(), ?layout, page_size, "trade source opened");

        Ok(Self {
            reader,
            path,
            columns,
            page_size,
            record: StringRecord::new(),
            exhausted: false,
            rows_read: 0,
            rows_rejected: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Data rows consumed so far (accepted and rejected)
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    pub fn rows_rejected(&self) -> u64 {
        self.rows_rejected
    }

    fn reject(&mut self, page: &mut TradePage, line: u64, message: String) {
        tracing::warn!(path = %self.path.display(), line, error = %message, "rejected trade row");
        self.rows_rejected += 1;
        page.rejected.push(RowError { line, message });
    }
}

impl<R: Read> TradeSource for CsvTradeSource<R> {
    fn next_page(&mut self) -> Result<Option<TradePage>, SourceError> {
        if self.exhausted {
            return Ok(None);
        }

        let mut page = TradePage {
            trades: Vec::with_capacity(self.page_size.min(65_536)),
            rejected: Vec::new(),
        };
        let mut rows = 0usize;

        while rows < self.page_size {
            match self.reader.read_record(&mut self.record) {
                Ok(true) => {}
                Ok(false) => {
                    self.exhausted = true;
                    break;
                }
                Err(e) => {
                    let line = e.position().map_or(0, |p| p.line());
                    if matches!(e.kind(), csv::ErrorKind::Utf8 { .. }) {
                        rows += 1;
                        self.rows_read += 1;
                        self.reject(&mut page, line, e.to_string());
                        continue;
                    }
                    return Err(SourceError::Read {
                        path: self.path.clone(),
                        source: Box::new(e),
                    });
                }
            }

            rows += 1;
            self.rows_read += 1;
            let line = self.record.position().map_or(0, |p| p.line());

            match parse_trade(&self.record, self.columns) {
                Ok(trade) => page.trades.push(trade),
                Err(message) => self.reject(&mut page, line, message),
            }
        }

        if rows == 0 {
            tracing::debug!(
                path = %self.path.display(),
                rows = self.rows_read,
                rejected = self.rows_rejected,
                "trade source exhausted"
            );
            return Ok(None);
        }

        tracing::debug!(
            path = %self.path.display(),
            trades = page.trades.len(),
            rejected = page.rejected.len(),
            "page read"
        );
        Ok(Some(page))
    }
}

fn resolve_columns(
    headers: &StringRecord,
    layout: TradeLayout,
    path: &Path,
) -> Result<ColumnMap, SourceError> {
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| SourceError::MissingColumn {
                path: path.to_path_buf(),
                column: name.to_string(),
            })
    };

    let required = layout.required_columns();
    Ok(match layout {
        TradeLayout::Epoch => ColumnMap::Epoch {
            timestamp: find(required[0])?,
            price: find(required[1])?,
            volume: find(required[2])?,
        },
        TradeLayout::DateTime => ColumnMap::DateTime {
            date: find(required[0])?,
            time: find(required[1])?,
            price: find(required[2])?,
            volume: find(required[3])?,
        },
    })
}

fn field<'r>(record: &'r StringRecord, index: usize, name: &str) -> Result<&'r str, String> {
    match record.get(index) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(format!("missing {name}")),
    }
}

fn parse_number(record: &StringRecord, index: usize, name: &str) -> Result<f64, String> {
    let raw = field(record, index, name)?;
    raw.parse::<f64>()
        .map_err(|_| format!("invalid {name} '{raw}'"))
}

/// Epoch timestamp in microseconds; 13-digit millisecond values are scaled
pub fn normalize_epoch(value: i64) -> i64 {
    if value.abs() < MICROS_CUTOFF {
        value * 1_000
    } else {
        value
    }
}

fn parse_epoch(raw: &str) -> Result<i64, String> {
    let value = match raw.parse::<i64>() {
        Ok(v) => v,
        Err(_) => {
            let v = raw
                .parse::<f64>()
                .map_err(|_| format!("invalid timestamp '{raw}'"))?;
            if !v.is_finite() {
                return Err(format!("invalid timestamp '{raw}'"));
            }
            v as i64
        }
    };
    Ok(normalize_epoch(value))
}

fn parse_date_time(date: &str, time: &str) -> Result<i64, String> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{date}': {e}"))?;
    let time = NaiveTime::parse_from_str(time, "%H:%M:%S%.f")
        .map_err(|e| format!("invalid time '{time}': {e}"))?;
    Ok(NaiveDateTime::new(date, time).and_utc().timestamp_micros())
}

fn parse_trade(record: &StringRecord, columns: ColumnMap) -> Result<Trade, String> {
    let (timestamp, price, volume) = match columns {
        ColumnMap::Epoch {
            timestamp,
            price,
            volume,
        } => (
            parse_epoch(field(record, timestamp, "timestamp")?)?,
            parse_number(record, price, "price")?,
            parse_number(record, volume, "volume")?,
        ),
        ColumnMap::DateTime {
            date,
            time,
            price,
            volume,
        } => (
            parse_date_time(field(record, date, "date")?, field(record, time, "time")?)?,
            parse_number(record, price, "price")?,
            parse_number(record, volume, "volume")?,
        ),
    };

    Trade::new(timestamp, price, volume).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(text: &str, layout: TradeLayout, page_size: usize) -> CsvTradeSource<&[u8]> {
        CsvTradeSource::from_reader(text.as_bytes(), "memory.csv", layout, page_size).unwrap()
    }

    fn drain<R: Read>(source: &mut CsvTradeSource<R>) -> (Vec<Trade>, Vec<RowError>) {
        let mut trades = Vec::new();
        let mut rejected = Vec::new();
        while let Some(page) = source.next_page().unwrap() {
            trades.extend(page.trades);
            rejected.extend(page.rejected);
        }
        (trades, rejected)
    }

    #[test]
    fn test_epoch_layout_scales_milliseconds() {
        let text = "timestamp,price,volume\n\
                    1700000000000,100.5,2\n\
                    1700000000001000,101,0.5\n";
        let (trades, rejected) = drain(&mut source(text, TradeLayout::Epoch, 10));
        assert!(rejected.is_empty());
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].timestamp, 1_700_000_000_000_000);
        assert_eq!(trades[1].timestamp, 1_700_000_000_001_000);
        assert_eq!(trades[0].price, 100.5);
        assert_eq!(trades[1].volume, 0.5);
    }

    #[test]
    fn test_date_time_layout() {
        let text = "Date,Time,Price,Volume\n\
                    2020-01-02,09:30:00.250,3240.5,3\n\
                    2020-01-02,09:30:01,3241,1\n";
        let (trades, rejected) = drain(&mut source(text, TradeLayout::DateTime, 10));
        assert!(rejected.is_empty());
        assert_eq!(trades[0].timestamp, 1_577_957_400_250_000);
        assert_eq!(trades[1].timestamp - trades[0].timestamp, 750_000);
    }

    #[test]
    fn test_headers_case_insensitive_and_reordered() {
        let text = "VOLUME,Price,TimeStamp\n1,10,1700000000000\n";
        let (trades, _) = drain(&mut source(text, TradeLayout::Epoch, 10));
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].volume, 1.0);
        assert_eq!(trades[0].price, 10.0);
    }

    #[test]
    fn test_malformed_rows_rejected_with_line() {
        let text = "timestamp,price,volume\n\
                    1700000000000,10,1\n\
                    1700000000001,abc,1\n\
                    1700000000002,10\n\
                    1700000000003,10,-4\n\
                    1700000000004,NaN,1\n\
                    1700000000005,11,2\n";
        let (trades, rejected) = drain(&mut source(text, TradeLayout::Epoch, 100));
        assert_eq!(trades.len(), 2);
        let lines: Vec<u64> = rejected.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![3, 4, 5, 6]);
        assert!(rejected[0].message.contains("price"));
        assert!(rejected[1].message.contains("missing volume"));
        assert!(rejected[2].message.contains("Negative volume"));
    }

    #[test]
    fn test_paging() {
        let mut text = String::from("timestamp,price,volume\n");
        for i in 0..10 {
            text.push_str(&format!("{},{},1\n", 1_700_000_000_000i64 + i, 100 + i));
        }
        let mut src = source(&text, TradeLayout::Epoch, 4);
        let mut sizes = Vec::new();
        while let Some(page) = src.next_page().unwrap() {
            sizes.push(page.len());
        }
        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(src.rows_read(), 10);
        assert!(src.next_page().unwrap().is_none());
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let result = CsvTradeSource::from_reader(
            "timestamp,price\n1,2\n".as_bytes(),
            "memory.csv",
            TradeLayout::Epoch,
            10,
        );
        assert!(matches!(
            result,
            Err(SourceError::MissingColumn { ref column, .. }) if column == "volume"
        ));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let result = CsvTradeSource::open("/nonexistent/trades.csv", TradeLayout::Epoch, 10);
        assert!(matches!(result, Err(SourceError::Open { .. })));
    }

    #[test]
    fn test_zero_page_size() {
        let result = CsvTradeSource::from_reader(
            "timestamp,price,volume\n".as_bytes(),
            "memory.csv",
            TradeLayout::Epoch,
            0,
        );
        assert!(matches!(result, Err(SourceError::InvalidPageSize { size: 0 })));
    }

    #[test]
    fn test_layout_parsing() {
        assert_eq!("epoch".parse::<TradeLayout>(), Ok(TradeLayout::Epoch));
        assert_eq!("date-time".parse::<TradeLayout>(), Ok(TradeLayout::DateTime));
        assert_eq!("DATE_TIME".parse::<TradeLayout>(), Ok(TradeLayout::DateTime));
        assert!("parquet".parse::<TradeLayout>().is_err());
    }
}
