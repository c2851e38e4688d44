//! Single-metric threshold bar accumulator
//!
//! A bar closes on the trade whose contribution brings the bucket's cumulative
//! metric to `>= threshold`. That trade is included in the closing bar and the
//! next trade opens a fresh bucket.

use crate::checkpoint::{AccumulatorCheckpoint, CheckpointError};
use crate::errors::ProcessingError;
use crate::trade::Trade;
use crate::types::{Bar, BarMetric, BarSpec};
use serde::{Deserialize, Serialize};

/// In-progress accumulation window between two bar emissions
///
/// Extrema are tracked over every trade in the bucket, so the bucket is
/// independent of how its trades were delivered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub open_time: i64,
    pub last_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub last_price: f64,
    pub cum_ticks: u64,
    pub cum_volume: f64,
    pub cum_buy_volume: f64,
    pub cum_dollar: f64,
}

impl Bucket {
    /// Open a bucket from its first trade, before that trade is accumulated
    fn open(trade: &Trade) -> Self {
        Self {
            open_time: trade.timestamp,
            last_time: trade.timestamp,
            open: trade.price,
            high: trade.price,
            low: trade.price,
            last_price: trade.price,
            cum_ticks: 0,
            cum_volume: 0.0,
            cum_buy_volume: 0.0,
            cum_dollar: 0.0,
        }
    }

    #[inline]
    fn update(&mut self, trade: &Trade) {
        self.high = self.high.max(trade.price);
        self.low = self.low.min(trade.price);
        self.last_price = trade.price;
        self.last_time = trade.timestamp;
        self.cum_ticks += 1;
        self.cum_volume += trade.volume;
        // No aggressor flag in the input: every trade counts as a buy
        self.cum_buy_volume += trade.volume;
        self.cum_dollar += trade.dollar_value();
    }

    #[inline]
    fn metric_value(&self, metric: BarMetric) -> f64 {
        match metric {
            BarMetric::Tick => self.cum_ticks as f64,
            BarMetric::Volume => self.cum_volume,
            BarMetric::Dollar => self.cum_dollar,
        }
    }

    /// Snapshot as a bar closed at the last accumulated trade
    fn to_bar(self, metric: BarMetric) -> Bar {
        Bar {
            metric,
            open_time: self.open_time,
            close_time: self.last_time,
            cum_ticks: self.cum_ticks,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.last_price,
            cum_volume: self.cum_volume,
            cum_buy_volume: self.cum_buy_volume,
            cum_dollar: self.cum_dollar,
        }
    }

    /// Structural sanity check used when restoring checkpoints
    ///
    /// Open and last price lie within `[low, high]`, sums are finite, and buy
    /// volume equals volume (every trade counts as a buy).
    pub(crate) fn is_consistent(&self) -> bool {
        let within = |price: f64| price >= self.low && price <= self.high;
        let finite = [self.cum_volume, self.cum_buy_volume, self.cum_dollar]
            .iter()
            .all(|v| v.is_finite());

        self.cum_ticks > 0
            && self.high >= self.low
            && within(self.open)
            && within(self.last_price)
            && finite
            && self.cum_volume >= 0.0
            && self.cum_buy_volume == self.cum_volume
            && self.open_time <= self.last_time
    }
}

/// Threshold bar state machine for one (metric, threshold) pair
///
/// Created once per spec and kept for the whole run. Consumes one trade at a
/// time and emits zero or one finished bar per trade.
#[derive(Debug, Clone)]
pub struct BarAccumulator {
    spec: BarSpec,

    /// `None` while no bucket is open (all cumulative state is zero)
    bucket: Option<Bucket>,

    trades_seen: u64,
    bars_emitted: u64,
}

impl BarAccumulator {
    /// Create an accumulator for a validated spec
    pub fn new(spec: BarSpec) -> Self {
        Self {
            spec,
            bucket: None,
            trades_seen: 0,
            bars_emitted: 0,
        }
    }

    /// Create an accumulator from a raw metric and threshold
    ///
    /// # Errors
    ///
    /// `ProcessingError::InvalidThreshold` if `threshold` is not finite and positive.
    pub fn with_threshold(metric: BarMetric, threshold: f64) -> Result<Self, ProcessingError> {
        Ok(Self::new(BarSpec::new(metric, threshold)?))
    }

    pub fn spec(&self) -> BarSpec {
        self.spec
    }

    /// Feed one trade, returning the bar it completes, if any
    ///
    /// The caller guarantees `trade.volume >= 0` (see [`Trade::new`]).
    pub fn accumulate(&mut self, trade: &Trade) -> Option<Bar> {
        debug_assert!(trade.volume >= 0.0, "negative volume reached accumulator");
        self.trades_seen += 1;

        let metric = self.spec.metric();
        let bucket = self.bucket.get_or_insert_with(|| Bucket::open(trade));
        bucket.update(trade);

        if bucket.metric_value(metric) >= self.spec.threshold() {
            let bar = bucket.to_bar(metric);
            debug_assert!(bar.high >= bar.open.max(bar.close));
            debug_assert!(bar.low <= bar.open.min(bar.close));

            self.bucket = None;
            self.bars_emitted += 1;
            Some(bar)
        } else {
            None
        }
    }

    /// Feed a run of trades in order, returning every bar they complete
    ///
    /// The open bucket carries over between calls, so feeding pages one by one
    /// yields exactly the bars of feeding their concatenation.
    pub fn process_trades(&mut self, trades: &[Trade]) -> Vec<Bar> {
        trades.iter().filter_map(|t| self.accumulate(t)).collect()
    }

    /// Snapshot of the open bucket as a bar, without consuming it
    ///
    /// For inspection only: a bucket below threshold is never emitted.
    pub fn incomplete_bar(&self) -> Option<Bar> {
        self.bucket.map(|b| b.to_bar(self.spec.metric()))
    }

    /// Remove and return the open bucket as a bar
    pub fn take_incomplete(&mut self) -> Option<Bar> {
        let metric = self.spec.metric();
        self.bucket.take().map(|b| b.to_bar(metric))
    }

    /// Discard the open bucket (cancellation)
    pub fn reset(&mut self) {
        self.bucket = None;
    }

    pub fn has_open_bucket(&self) -> bool {
        self.bucket.is_some()
    }

    /// Current value of the thresholding metric (0 when no bucket is open)
    pub fn metric_value(&self) -> f64 {
        self.bucket
            .map(|b| b.metric_value(self.spec.metric()))
            .unwrap_or(0.0)
    }

    pub fn trades_seen(&self) -> u64 {
        self.trades_seen
    }

    pub fn bars_emitted(&self) -> u64 {
        self.bars_emitted
    }

    // === CHECKPOINT METHODS ===

    /// Capture the open bucket for later continuation
    pub fn checkpoint(&self) -> AccumulatorCheckpoint {
        AccumulatorCheckpoint {
            spec: self.spec,
            bucket: self.bucket,
        }
    }

    /// Resume from a checkpoint
    ///
    /// The next trade continues the restored bucket exactly as if the input had
    /// never been split.
    ///
    /// # Errors
    ///
    /// `CheckpointError::InvalidBucket` if the stored bucket is structurally
    /// inconsistent (no trades, `high < low`, open outside the range).
    pub fn from_checkpoint(checkpoint: AccumulatorCheckpoint) -> Result<Self, CheckpointError> {
        if let Some(bucket) = &checkpoint.bucket {
            if !bucket.is_consistent() {
                return Err(CheckpointError::InvalidBucket {
                    spec: checkpoint.spec.to_string(),
                });
            }
        }

        Ok(Self {
            spec: checkpoint.spec,
            bucket: checkpoint.bucket,
            trades_seen: 0,
            bars_emitted: 0,
        })
    }

    /// Replace the open bucket with one from a checkpoint of the same spec
    ///
    /// # Errors
    ///
    /// `CheckpointError::SpecMismatch` if the checkpoint belongs to another
    /// spec, `CheckpointError::InvalidBucket` as for [`Self::from_checkpoint`].
    pub fn restore(&mut self, checkpoint: AccumulatorCheckpoint) -> Result<(), CheckpointError> {
        if checkpoint.spec != self.spec {
            return Err(CheckpointError::SpecMismatch {
                checkpoint: checkpoint.spec.to_string(),
                expected: self.spec.to_string(),
            });
        }
        let restored = Self::from_checkpoint(checkpoint)?;
        self.bucket = restored.bucket;
        Ok(())
    }
}
