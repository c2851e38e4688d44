//! Dispatcher shareable across tasks
//!
//! Each spec owns a lane: its accumulator plus a bounded history of the bars
//! it emitted. A lane is locked for the whole accumulate-and-record step, so
//! readers never observe a half-updated accumulator. Lanes never lock each
//! other.
//!
//! Design:
//! - One `parking_lot::Mutex` per spec, no cross-metric lock
//! - Bounded history (default 10K bars per spec); when full the oldest bar is
//!   evicted and counted, producers never block
//! - Single-writer is the recommended discipline; concurrent writers are safe
//!   but interleave trades per lane in lock order

use parking_lot::Mutex;
use std::collections::VecDeque;
use tickbars_core::{
    AccumulatorCheckpoint, Bar, BarAccumulator, BarSpec, CheckpointError, EmittedBar,
    EmittedBars, ProcessingError, Trade, validate_specs,
};

/// Default number of bars kept per spec
pub const DEFAULT_HISTORY_CAPACITY: usize = 10_000;

#[derive(Debug)]
struct Lane {
    accumulator: BarAccumulator,
    history: VecDeque<Bar>,
    evicted: u64,
}

impl Lane {
    fn record(&mut self, bar: Bar, capacity: usize) {
        if capacity == 0 {
            self.evicted += 1;
            return;
        }
        if self.history.len() == capacity {
            self.history.pop_front();
            self.evicted += 1;
        }
        self.history.push_back(bar);
    }
}

/// Multi-metric dispatcher with per-spec locking, callable through `&self`
#[derive(Debug)]
pub struct SharedDispatcher {
    lanes: Vec<(BarSpec, Mutex<Lane>)>,
    history_capacity: usize,
}

impl SharedDispatcher {
    /// # Errors
    ///
    /// `ProcessingError::NoBarSpecs` / `DuplicateSpec` for a bad spec set
    pub fn new(specs: impl IntoIterator<Item = BarSpec>) -> Result<Self, ProcessingError> {
        Self::with_history_capacity(specs, DEFAULT_HISTORY_CAPACITY)
    }

    /// `history_capacity == 0` keeps no bar history at all
    pub fn with_history_capacity(
        specs: impl IntoIterator<Item = BarSpec>,
        history_capacity: usize,
    ) -> Result<Self, ProcessingError> {
        let specs: Vec<BarSpec> = specs.into_iter().collect();
        validate_specs(&specs)?;

        let lanes = specs
            .into_iter()
            .map(|spec| {
                let lane = Lane {
                    accumulator: BarAccumulator::new(spec),
                    history: VecDeque::with_capacity(history_capacity.min(1024)),
                    evicted: 0,
                };
                (spec, Mutex::new(lane))
            })
            .collect();

        Ok(Self {
            lanes,
            history_capacity,
        })
    }

    /// Offer one trade to every lane, in spec configuration order
    pub fn dispatch(&self, trade: &Trade) -> EmittedBars {
        let mut emitted = EmittedBars::new();
        for (spec, lane) in &self.lanes {
            let mut lane = lane.lock();
            if let Some(bar) = lane.accumulator.accumulate(trade) {
                lane.record(bar, self.history_capacity);
                emitted.push(EmittedBar { spec: *spec, bar });
            }
        }
        emitted
    }

    pub fn specs(&self) -> impl Iterator<Item = BarSpec> + '_ {
        self.lanes.iter().map(|(spec, _)| *spec)
    }

    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }

    fn lane(&self, spec: &BarSpec) -> Option<&Mutex<Lane>> {
        self.lanes
            .iter()
            .find(|(s, _)| s == spec)
            .map(|(_, lane)| lane)
    }

    /// Most recently emitted bar for a spec
    pub fn last_bar(&self, spec: &BarSpec) -> Option<Bar> {
        self.lane(spec)?.lock().history.back().copied()
    }

    /// Retained bars for a spec, oldest first
    pub fn bars(&self, spec: &BarSpec) -> Vec<Bar> {
        self.lane(spec)
            .map(|lane| lane.lock().history.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Drain the retained bars for a spec
    pub fn take_bars(&self, spec: &BarSpec) -> Vec<Bar> {
        self.lane(spec)
            .map(|lane| lane.lock().history.drain(..).collect())
            .unwrap_or_default()
    }

    /// Bars evicted from a spec's history because it was full
    pub fn evicted(&self, spec: &BarSpec) -> u64 {
        self.lane(spec).map_or(0, |lane| lane.lock().evicted)
    }

    /// Snapshot of a spec's open bucket
    pub fn incomplete_bar(&self, spec: &BarSpec) -> Option<Bar> {
        self.lane(spec)?.lock().accumulator.incomplete_bar()
    }

    pub fn incomplete_bars(&self) -> Vec<EmittedBar> {
        self.lanes
            .iter()
            .filter_map(|(spec, lane)| {
                lane.lock()
                    .accumulator
                    .incomplete_bar()
                    .map(|bar| EmittedBar { spec: *spec, bar })
            })
            .collect()
    }

    /// Trades seen by a spec's accumulator
    pub fn trades_seen(&self, spec: &BarSpec) -> u64 {
        self.lane(spec)
            .map_or(0, |lane| lane.lock().accumulator.trades_seen())
    }

    pub fn checkpoints(&self) -> Vec<AccumulatorCheckpoint> {
        self.lanes
            .iter()
            .map(|(_, lane)| lane.lock().accumulator.checkpoint())
            .collect()
    }

    /// Restore one spec's open bucket
    ///
    /// # Errors
    ///
    /// `CheckpointError::SpecMismatch` when the spec is not configured here,
    /// `CheckpointError::InvalidBucket` for an inconsistent bucket.
    pub fn restore(&self, checkpoint: AccumulatorCheckpoint) -> Result<(), CheckpointError> {
        let Some(lane) = self.lane(&checkpoint.spec) else {
            return Err(CheckpointError::SpecMismatch {
                checkpoint: checkpoint.spec.to_string(),
                expected: self
                    .specs()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
                    .join(","),
            });
        };
        lane.lock().accumulator.restore(checkpoint)
    }

    /// Discard every open bucket; emitted history is kept
    pub fn reset(&self) {
        for (_, lane) in &self.lanes {
            lane.lock().accumulator.reset();
        }
    }
}
