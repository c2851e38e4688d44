//! Paged trade input contract
//!
//! A [`TradeSource`] delivers trades in order, one page at a time. Sources are
//! not restartable: re-open to re-read.

use crate::trade::Trade;
use std::path::PathBuf;
use thiserror::Error;

/// A row the source rejected (unparsable, missing field, negative volume)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// 1-based line in the underlying input (header is line 1 for files)
    pub line: u64,
    pub message: String,
}

/// Trades of one page in arrival order, plus the rows rejected in that page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradePage {
    pub trades: Vec<Trade>,
    pub rejected: Vec<RowError>,
}

impl TradePage {
    pub fn new(trades: Vec<Trade>) -> Self {
        Self {
            trades,
            rejected: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }
}

/// Fatal source errors
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid page size: {size}. Page size must be greater than 0")]
    InvalidPageSize { size: usize },

    #[error("{path}: missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: String },
}

/// Pull-based paged trade input
pub trait TradeSource {
    /// Next page, or `None` at end of data
    ///
    /// A page may hold zero trades when every row in it was rejected.
    fn next_page(&mut self) -> Result<Option<TradePage>, SourceError>;
}

impl<S: TradeSource + ?Sized> TradeSource for Box<S> {
    fn next_page(&mut self) -> Result<Option<TradePage>, SourceError> {
        (**self).next_page()
    }
}

/// Pages an in-memory trade slice
#[derive(Debug)]
pub struct SliceSource<'a> {
    trades: &'a [Trade],
    page_size: usize,
    position: usize,
}

impl<'a> SliceSource<'a> {
    /// # Errors
    ///
    /// `SourceError::InvalidPageSize` if `page_size == 0`.
    pub fn new(trades: &'a [Trade], page_size: usize) -> Result<Self, SourceError> {
        if page_size == 0 {
            return Err(SourceError::InvalidPageSize { size: page_size });
        }
        Ok(Self {
            trades,
            page_size,
            position: 0,
        })
    }
}

impl TradeSource for SliceSource<'_> {
    fn next_page(&mut self) -> Result<Option<TradePage>, SourceError> {
        if self.position >= self.trades.len() {
            return Ok(None);
        }
        let end = (self.position + self.page_size).min(self.trades.len());
        let page = TradePage::new(self.trades[self.position..end].to_vec());
        self.position = end;
        Ok(Some(page))
    }
}
