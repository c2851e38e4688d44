//! Fan-out of one trade stream to several accumulators
//!
//! Each configured [`BarSpec`] gets its own [`BarAccumulator`]; every trade is
//! offered to all of them in configuration order. Accumulators share no state,
//! so a Tick(2) accumulator is unaffected by a Dollar(1000) one in the same
//! dispatcher.

use crate::accumulator::BarAccumulator;
use crate::checkpoint::{AccumulatorCheckpoint, CheckpointError};
use crate::errors::ProcessingError;
use crate::trade::Trade;
use crate::types::{Bar, BarSpec, EmittedBar};
use smallvec::SmallVec;

/// Bars emitted by a single trade
///
/// Inline up to 4 entries: a trade rarely closes more bars than there are
/// configured metrics.
pub type EmittedBars = SmallVec<[EmittedBar; 4]>;

/// Validate a spec set: non-empty, no exact duplicates
pub fn validate_specs(specs: &[BarSpec]) -> Result<(), ProcessingError> {
    if specs.is_empty() {
        return Err(ProcessingError::NoBarSpecs);
    }
    for (i, spec) in specs.iter().enumerate() {
        if specs[..i].contains(spec) {
            return Err(ProcessingError::DuplicateSpec {
                spec: spec.to_string(),
            });
        }
    }
    Ok(())
}

/// Set of accumulators fed from one trade stream
#[derive(Debug, Clone)]
pub struct MultiMetricDispatcher {
    accumulators: Vec<BarAccumulator>,
}

impl MultiMetricDispatcher {
    /// Create a dispatcher with one accumulator per spec
    ///
    /// # Errors
    ///
    /// - `ProcessingError::NoBarSpecs` for an empty set
    /// - `ProcessingError::DuplicateSpec` when the same spec appears twice
    pub fn new(specs: impl IntoIterator<Item = BarSpec>) -> Result<Self, ProcessingError> {
        let specs: Vec<BarSpec> = specs.into_iter().collect();
        validate_specs(&specs)?;

        tracing::debug!(
            specs = %specs.iter().map(ToString::to_string).collect::<Vec<_>>().join(","),
            "dispatcher created"
        );

        Ok(Self {
            accumulators: specs.into_iter().map(BarAccumulator::new).collect(),
        })
    }

    /// Offer one trade to every accumulator
    ///
    /// Returns the bars this trade closed, in spec configuration order.
    pub fn dispatch(&mut self, trade: &Trade) -> EmittedBars {
        self.accumulators
            .iter_mut()
            .filter_map(|acc| {
                acc.accumulate(trade).map(|bar| EmittedBar {
                    spec: acc.spec(),
                    bar,
                })
            })
            .collect()
    }

    /// Dispatch a run of trades, collecting bars per spec
    ///
    /// Open buckets carry over between calls.
    pub fn process_trades(&mut self, trades: &[Trade]) -> BarSet {
        let mut set = BarSet::with_specs(self.specs());
        for trade in trades {
            for emitted in self.dispatch(trade) {
                set.extend(emitted);
            }
        }
        set
    }

    pub fn specs(&self) -> impl Iterator<Item = BarSpec> + '_ {
        self.accumulators.iter().map(BarAccumulator::spec)
    }

    pub fn accumulators(&self) -> &[BarAccumulator] {
        &self.accumulators
    }

    pub fn accumulator(&self, spec: &BarSpec) -> Option<&BarAccumulator> {
        self.accumulators.iter().find(|acc| acc.spec() == *spec)
    }

    /// Snapshots of every open bucket, tagged by spec
    pub fn incomplete_bars(&self) -> Vec<EmittedBar> {
        self.accumulators
            .iter()
            .filter_map(|acc| {
                acc.incomplete_bar().map(|bar| EmittedBar {
                    spec: acc.spec(),
                    bar,
                })
            })
            .collect()
    }

    /// Discard every open bucket
    pub fn reset(&mut self) {
        for acc in &mut self.accumulators {
            acc.reset();
        }
    }

    pub fn checkpoints(&self) -> Vec<AccumulatorCheckpoint> {
        self.accumulators.iter().map(BarAccumulator::checkpoint).collect()
    }

    /// Rebuild a dispatcher from the checkpoints of a previous run
    ///
    /// The spec set and its order are taken from the checkpoints.
    pub fn from_checkpoints(
        checkpoints: impl IntoIterator<Item = AccumulatorCheckpoint>,
    ) -> Result<Self, CheckpointError> {
        let checkpoints: Vec<AccumulatorCheckpoint> = checkpoints.into_iter().collect();
        let specs: Vec<BarSpec> = checkpoints.iter().map(|c| c.spec).collect();
        validate_specs(&specs)?;

        let accumulators = checkpoints
            .into_iter()
            .map(BarAccumulator::from_checkpoint)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { accumulators })
    }

    /// Restore open buckets into an existing dispatcher, matching by spec
    ///
    /// # Errors
    ///
    /// `CheckpointError::SpecMismatch` for a checkpoint whose spec is not
    /// configured here. Accumulators restored before the failing checkpoint
    /// keep their restored state.
    pub fn restore(
        &mut self,
        checkpoints: impl IntoIterator<Item = AccumulatorCheckpoint>,
    ) -> Result<(), CheckpointError> {
        for checkpoint in checkpoints {
            let Some(idx) = self
                .accumulators
                .iter()
                .position(|acc| acc.spec() == checkpoint.spec)
            else {
                return Err(CheckpointError::SpecMismatch {
                    checkpoint: checkpoint.spec.to_string(),
                    expected: self
                        .specs()
                        .map(|s| s.to_string())
                        .collect::<Vec<_>>()
                        .join(","),
                });
            };
            self.accumulators[idx].restore(checkpoint)?;
        }
        Ok(())
    }
}

/// Ordered bar sequences, one per spec
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarSet {
    entries: Vec<(BarSpec, Vec<Bar>)>,
}

impl BarSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty set that reports every spec, even those that end up with no bars
    pub fn with_specs(specs: impl IntoIterator<Item = BarSpec>) -> Self {
        Self {
            entries: specs.into_iter().map(|s| (s, Vec::new())).collect(),
        }
    }

    /// Bars for `spec` in emission order (empty if unknown)
    pub fn bars(&self, spec: &BarSpec) -> &[Bar] {
        self.entries
            .iter()
            .find(|(s, _)| s == spec)
            .map(|(_, bars)| bars.as_slice())
            .unwrap_or(&[])
    }

    /// Append an emitted bar to its spec's sequence
    pub fn extend(&mut self, emitted: EmittedBar) {
        match self.entries.iter_mut().find(|(s, _)| *s == emitted.spec) {
            Some((_, bars)) => bars.push(emitted.bar),
            None => self.entries.push((emitted.spec, vec![emitted.bar])),
        }
    }

    /// Append every sequence of `other` after this set's bars
    pub fn merge(&mut self, other: BarSet) {
        for (spec, bars) in other.entries {
            match self.entries.iter_mut().find(|(s, _)| *s == spec) {
                Some((_, existing)) => existing.extend(bars),
                None => self.entries.push((spec, bars)),
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BarSpec, &[Bar])> {
        self.entries.iter().map(|(s, bars)| (s, bars.as_slice()))
    }

    pub fn specs(&self) -> impl Iterator<Item = BarSpec> + '_ {
        self.entries.iter().map(|(s, _)| *s)
    }

    pub fn total_bars(&self) -> usize {
        self.entries.iter().map(|(_, bars)| bars.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_bars() == 0
    }
}

impl IntoIterator for BarSet {
    type Item = (BarSpec, Vec<Bar>);
    type IntoIter = std::vec::IntoIter<(BarSpec, Vec<Bar>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{self, generators};

    fn mixed_specs() -> Vec<BarSpec> {
        vec![
            BarSpec::tick(2).unwrap(),
            BarSpec::volume(100.0).unwrap(),
            BarSpec::dollar(1000.0).unwrap(),
        ]
    }

    #[test]
    fn test_rejects_empty_and_duplicate_specs() {
        assert_eq!(
            MultiMetricDispatcher::new(Vec::new()).unwrap_err(),
            ProcessingError::NoBarSpecs
        );

        let spec = BarSpec::volume(10.0).unwrap();
        assert!(matches!(
            MultiMetricDispatcher::new([spec, BarSpec::tick(10).unwrap(), spec]),
            Err(ProcessingError::DuplicateSpec { .. })
        ));

        // Same metric, different threshold is fine
        assert!(MultiMetricDispatcher::new([spec, BarSpec::volume(20.0).unwrap()]).is_ok());
    }

    #[test]
    fn test_metrics_are_independent() {
        let trades = test_utils::sawtooth_trades(400, 10.0);
        let mut dispatcher = MultiMetricDispatcher::new(mixed_specs()).unwrap();
        let set = dispatcher.process_trades(&trades);

        for spec in mixed_specs() {
            let mut alone = BarAccumulator::new(spec);
            let expected = alone.process_trades(&trades);
            assert!(!expected.is_empty(), "{spec} produced no bars");
            assert_eq!(set.bars(&spec), expected.as_slice(), "{spec}");
        }
        assert_eq!(set.specs().collect::<Vec<_>>(), mixed_specs());
    }

    #[test]
    fn test_dispatch_order_follows_configuration() {
        // Every trade closes a tick(1) bar; a single big trade closes all three
        let specs = vec![
            BarSpec::dollar(10.0).unwrap(),
            BarSpec::tick(1).unwrap(),
            BarSpec::volume(1.0).unwrap(),
        ];
        let mut dispatcher = MultiMetricDispatcher::new(specs.clone()).unwrap();
        let emitted = dispatcher.dispatch(&test_utils::trade(1, 100.0, 5.0));
        let order: Vec<BarSpec> = emitted.iter().map(|e| e.spec).collect();
        assert_eq!(order, specs);
        assert!(!emitted.spilled());
    }

    #[test]
    fn test_paged_equals_whole() {
        let trades = test_utils::sawtooth_trades(1_000, 50.0);

        let mut whole = MultiMetricDispatcher::new(mixed_specs()).unwrap();
        let expected = whole.process_trades(&trades);

        let mut paged = MultiMetricDispatcher::new(mixed_specs()).unwrap();
        let mut actual = BarSet::with_specs(mixed_specs());
        for page in trades.chunks(37) {
            actual.merge(paged.process_trades(page));
        }

        assert_eq!(actual, expected);
        assert_eq!(actual.total_bars(), expected.total_bars());

        assert_eq!(generators::process_one_by_one(&trades, &mixed_specs()), expected);
        for page_size in [1, 64, 5_000] {
            assert_eq!(
                generators::process_paged(&trades, &mixed_specs(), page_size),
                expected,
                "page size {page_size}"
            );
        }
    }

    #[test]
    fn test_incomplete_bars_and_reset() {
        let mut dispatcher = MultiMetricDispatcher::new(mixed_specs()).unwrap();
        dispatcher.process_trades(&test_utils::unit_volume_trades(3, 1.0));

        // tick(2) closed once and holds one trade; the others hold three
        let pending = dispatcher.incomplete_bars();
        assert_eq!(pending.len(), 3);
        assert_eq!(pending[0].bar.cum_ticks, 1);
        assert_eq!(pending[1].bar.cum_ticks, 3);

        dispatcher.reset();
        assert!(dispatcher.incomplete_bars().is_empty());
        assert_eq!(dispatcher.accumulators().len(), 3);
    }

    #[test]
    fn test_checkpoint_roundtrip() {
        let trades = test_utils::sawtooth_trades(300, 20.0);
        let (head, tail) = trades.split_at(111);

        let mut reference = MultiMetricDispatcher::new(mixed_specs()).unwrap();
        let expected = reference.process_trades(&trades);

        let mut first = MultiMetricDispatcher::new(mixed_specs()).unwrap();
        let mut actual = first.process_trades(head);
        let mut second = MultiMetricDispatcher::from_checkpoints(first.checkpoints()).unwrap();
        actual.merge(second.process_trades(tail));

        assert_eq!(actual, expected);
    }

    #[test]
    fn test_restore_rejects_unknown_spec() {
        let mut source = MultiMetricDispatcher::new([BarSpec::tick(7).unwrap()]).unwrap();
        source.process_trades(&test_utils::unit_volume_trades(3, 1.0));

        let mut target = MultiMetricDispatcher::new(mixed_specs()).unwrap();
        assert!(matches!(
            target.restore(source.checkpoints()),
            Err(CheckpointError::SpecMismatch { .. })
        ));
        assert!(matches!(
            MultiMetricDispatcher::from_checkpoints(Vec::new()),
            Err(CheckpointError::Specs(ProcessingError::NoBarSpecs))
        ));
    }

    #[test]
    fn test_bar_set_unknown_spec_is_empty() {
        let set = BarSet::new();
        assert!(set.bars(&BarSpec::tick(1).unwrap()).is_empty());
        assert!(set.is_empty());
    }
}
