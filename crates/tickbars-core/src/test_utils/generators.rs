//! Large-scale deterministic data generators for integration tests
//!
//! All generators are pure functions of their arguments: no randomness, no
//! I/O, strictly increasing timestamps and positive prices.

use super::constants::BASE_TIMESTAMP;
use crate::dispatcher::{BarSet, MultiMetricDispatcher};
use crate::source::{SliceSource, TradeSource};
use crate::trade::Trade;
use crate::types::BarSpec;

const DAY_US: i64 = 24 * 60 * 60 * 1_000_000;

// =============================================================================
// Datasets
// =============================================================================

/// Realistic-looking price path: slow trend, volatility layer and noise
///
/// 100ms spacing, volumes between 0.01 and ~5.
pub fn realistic_dataset(count: usize) -> Vec<Trade> {
    let base_price = 23_000.0;

    (0..count)
        .map(|i| {
            let x = i as f64;
            let progress = x / count.max(1) as f64;
            let trend = (progress * 2.0 * std::f64::consts::PI).sin() * 500.0;
            let volatility = (x * 0.01).sin() * 50.0 + (x * 0.001).cos() * 20.0;
            let noise = (x * 0.1).sin() * 5.0;
            let volume = 0.01 + ((x * 0.37).sin().abs() * 5.0);

            Trade::new(
                BASE_TIMESTAMP + i as i64 * 100_000,
                base_price + trend + volatility + noise,
                volume,
            )
            .unwrap()
        })
        .collect()
}

/// Several days of trades, each day continuing the previous one's price level
pub fn multi_day_dataset(days: usize, trades_per_day: usize) -> Vec<Trade> {
    let mut trades = Vec::with_capacity(days * trades_per_day);
    let spacing = DAY_US / trades_per_day.max(1) as i64;

    for day in 0..days {
        let day_start = BASE_TIMESTAMP + day as i64 * DAY_US;
        let drift = if day % 2 == 0 { 1.0 } else { -1.0 };

        for i in 0..trades_per_day {
            let x = i as f64;
            let price = 1_000.0 + drift * x * 0.01 + (x * 0.05).sin() * 3.0;
            let volume = 0.5 + (i % 7) as f64 * 0.25;
            trades.push(Trade::new(day_start + i as i64 * spacing, price, volume).unwrap());
        }
    }

    trades
}

// =============================================================================
// Processing Functions (one-by-one and paged)
// =============================================================================

/// Dispatch trades one at a time, as the live engine does
pub fn process_one_by_one(trades: &[Trade], specs: &[BarSpec]) -> BarSet {
    let mut dispatcher = MultiMetricDispatcher::new(specs.iter().copied()).unwrap();
    let mut set = BarSet::with_specs(specs.iter().copied());
    for trade in trades {
        for emitted in dispatcher.dispatch(trade) {
            set.extend(emitted);
        }
    }
    set
}

/// Dispatch trades page by page through a [`SliceSource`]
pub fn process_paged(trades: &[Trade], specs: &[BarSpec], page_size: usize) -> BarSet {
    let mut dispatcher = MultiMetricDispatcher::new(specs.iter().copied()).unwrap();
    let mut source = SliceSource::new(trades, page_size).unwrap();
    let mut set = BarSet::with_specs(specs.iter().copied());
    while let Some(page) = source.next_page().unwrap() {
        set.merge(dispatcher.process_trades(&page.trades));
    }
    set
}

/// The tick/volume/dollar trio used throughout the tests
pub fn default_specs() -> Vec<BarSpec> {
    vec![
        BarSpec::tick(100).unwrap(),
        BarSpec::volume(1_000.0).unwrap(),
        BarSpec::dollar(10_000.0).unwrap(),
    ]
}
