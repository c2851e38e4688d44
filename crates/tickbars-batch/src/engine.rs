//! Batch bar engine
//!
//! Drives a [`MultiMetricDispatcher`] over a paged source and collects every
//! emitted bar per spec. The result is independent of page size and
//! read-ahead depth.

use crate::prefetch::Prefetch;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tickbars_core::{
    AccumulatorCheckpoint, BarSet, BarSpec, CheckpointError, EmittedBar, MultiMetricDispatcher,
    ProcessingError, RowError, SliceSource, SourceError, Trade, TradeSource,
};
use tickbars_io::{CsvTradeSource, TradeLayout};

/// Default rows per page
pub const DEFAULT_PAGE_SIZE: usize = 1_000_000;

/// Configuration for batch runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Rows read per page (must be > 0)
    pub page_size: usize,

    /// Pages read ahead on a background thread (0 = no read-ahead)
    pub prefetch_pages: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            prefetch_pages: 0,
        }
    }
}

/// Batch run errors
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}

/// Outcome of one batch run
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Emitted bars per spec, in emission order
    pub bars: BarSet,

    /// Valid trades fed to the dispatcher
    pub trades_processed: u64,

    pub pages_processed: u64,

    /// Rows the source rejected, in input order
    pub rejected: Vec<RowError>,

    /// Open buckets at end of input (never emitted as bars)
    pub incomplete: Vec<EmittedBar>,

    /// Resumable state for continuing with the next input
    pub checkpoints: Vec<AccumulatorCheckpoint>,
}

/// Batch engine for a fixed spec set
#[derive(Debug, Clone)]
pub struct BatchEngine {
    specs: Vec<BarSpec>,
    config: BatchConfig,
    resume: Vec<AccumulatorCheckpoint>,
}

impl BatchEngine {
    /// # Errors
    ///
    /// - `ProcessingError::NoBarSpecs` / `DuplicateSpec` for a bad spec set
    /// - `SourceError::InvalidPageSize` for `page_size == 0`
    pub fn new(
        specs: impl IntoIterator<Item = BarSpec>,
        config: BatchConfig,
    ) -> Result<Self, BatchError> {
        let specs: Vec<BarSpec> = specs.into_iter().collect();
        // Reject a bad spec set before any I/O
        MultiMetricDispatcher::new(specs.iter().copied())?;
        if config.page_size == 0 {
            return Err(SourceError::InvalidPageSize {
                size: config.page_size,
            }
            .into());
        }

        Ok(Self {
            specs,
            config,
            resume: Vec::new(),
        })
    }

    /// Continue open buckets from a previous run's checkpoints
    pub fn resume_from(mut self, checkpoints: Vec<AccumulatorCheckpoint>) -> Self {
        self.resume = checkpoints;
        self
    }

    pub fn specs(&self) -> &[BarSpec] {
        &self.specs
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Process a CSV trade file
    ///
    /// The file is opened (and its header checked) before any bar is produced.
    pub fn process_csv<P: AsRef<Path>>(
        &self,
        path: P,
        layout: TradeLayout,
    ) -> Result<BatchResult, BatchError> {
        let path = path.as_ref();
        tracing::info!(
            path = %path.display(),
            ?layout,
            page_size = self.config.page_size,
            prefetch = self.config.prefetch_pages,
            "batch run started"
        );

        let source = CsvTradeSource::open(path, layout, self.config.page_size)?;
        let mut run = self.begin()?;
        self.drain_csv(&mut run, source)?;
        Ok(run.finish())
    }

    /// Process several CSV trade files as one trade stream
    ///
    /// Buckets continue across file boundaries, so the bars equal those of
    /// the concatenated files. Every file is opened (and its header checked)
    /// before any bar is produced. Rejected rows keep their line within their
    /// own file.
    pub fn process_csv_files<I, P>(
        &self,
        paths: I,
        layout: TradeLayout,
    ) -> Result<BatchResult, BatchError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let sources = paths
            .into_iter()
            .map(|path| CsvTradeSource::open(path.as_ref(), layout, self.config.page_size))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::info!(
            files = sources.len(),
            ?layout,
            page_size = self.config.page_size,
            prefetch = self.config.prefetch_pages,
            "multi-file batch run started"
        );

        let mut run = self.begin()?;
        for source in sources {
            self.drain_csv(&mut run, source)?;
        }
        Ok(run.finish())
    }

    fn drain_csv(&self, run: &mut Run, source: CsvTradeSource) -> Result<(), BatchError> {
        if self.config.prefetch_pages > 0 {
            let mut source = Prefetch::spawn(source, self.config.prefetch_pages)?;
            run.drain(&mut source)
        } else {
            let mut source = source;
            run.drain(&mut source)
        }
    }

    /// Process trades already in memory, paged with the configured page size
    pub fn process_trades(&self, trades: &[Trade]) -> Result<BatchResult, BatchError> {
        let mut source = SliceSource::new(trades, self.config.page_size)?;
        self.process(&mut source)
    }

    /// Drain a source page by page
    pub fn process<S: TradeSource + ?Sized>(&self, source: &mut S) -> Result<BatchResult, BatchError> {
        let mut run = self.begin()?;
        run.drain(source)?;
        Ok(run.finish())
    }

    fn begin(&self) -> Result<Run, BatchError> {
        let mut dispatcher = MultiMetricDispatcher::new(self.specs.iter().copied())?;
        if !self.resume.is_empty() {
            dispatcher.restore(self.resume.iter().copied())?;
        }

        Ok(Run {
            bars: BarSet::with_specs(self.specs.iter().copied()),
            dispatcher,
            rejected: Vec::new(),
            trades_processed: 0,
            pages_processed: 0,
        })
    }
}

/// State of one batch run, carried across every source it drains
struct Run {
    dispatcher: MultiMetricDispatcher,
    bars: BarSet,
    rejected: Vec<RowError>,
    trades_processed: u64,
    pages_processed: u64,
}

impl Run {
    fn drain<S: TradeSource + ?Sized>(&mut self, source: &mut S) -> Result<(), BatchError> {
        while let Some(page) = source.next_page()? {
            self.pages_processed += 1;
            self.trades_processed += page.trades.len() as u64;

            let page_bars = self.dispatcher.process_trades(&page.trades);
            tracing::debug!(
                page = self.pages_processed,
                trades = page.trades.len(),
                rejected = page.rejected.len(),
                bars = page_bars.total_bars(),
                "page processed"
            );

            self.bars.merge(page_bars);
            self.rejected.extend(page.rejected);
        }
        Ok(())
    }

    fn finish(self) -> BatchResult {
        tracing::info!(
            pages = self.pages_processed,
            trades = self.trades_processed,
            rejected = self.rejected.len(),
            bars = self.bars.total_bars(),
            "batch run complete"
        );

        BatchResult {
            incomplete: self.dispatcher.incomplete_bars(),
            checkpoints: self.dispatcher.checkpoints(),
            bars: self.bars,
            trades_processed: self.trades_processed,
            pages_processed: self.pages_processed,
            rejected: self.rejected,
        }
    }
}
