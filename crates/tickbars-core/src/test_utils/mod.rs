//! Test utilities for consistent trade data across the workspace
//!
//! ## Module Organization
//!
//! - `mod.rs`: small unit test helpers (single trades, builders, scenarios)
//! - `generators.rs`: large deterministic datasets and processing helpers

pub mod generators;

use crate::trade::Trade;

/// Standard test constants
pub mod constants {
    /// 2022-01-01 00:00:00 UTC in microseconds
    pub const BASE_TIMESTAMP: i64 = 1_640_995_200_000_000;
    pub const BASE_PRICE: f64 = 50_000.0;
    /// One millisecond in microseconds
    pub const STEP_US: i64 = 1_000;
}

/// Creates a trade at `BASE_TIMESTAMP + offset_ms`
///
/// Panics on invalid values: test fixtures must never be malformed.
pub fn trade(offset_ms: i64, price: f64, volume: f64) -> Trade {
    Trade::new(
        constants::BASE_TIMESTAMP + offset_ms * constants::STEP_US,
        price,
        volume,
    )
    .unwrap()
}

/// `count` trades of volume 1 at a constant price, 1ms apart
pub fn unit_volume_trades(count: usize, price: f64) -> Vec<Trade> {
    (0..count).map(|i| trade(i as i64, price, 1.0)).collect()
}

/// Deterministic oscillating prices with cycling volumes 1..=5
///
/// Price stays within +/-1% of `base_price`, so dollar value per trade is
/// roughly `3 * base_price` on average.
pub fn sawtooth_trades(count: usize, base_price: f64) -> Vec<Trade> {
    (0..count)
        .map(|i| {
            let step = (i % 20) as f64 - 10.0;
            let price = base_price * (1.0 + step * 0.001);
            let volume = 1.0 + (i % 5) as f64;
            trade(i as i64, price, volume)
        })
        .collect()
}

/// Builder for hand-written trade sequences
pub struct TradeBuilder {
    base_price: f64,
    base_volume: f64,
    trades: Vec<Trade>,
}

impl Default for TradeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TradeBuilder {
    pub fn new() -> Self {
        Self {
            base_price: constants::BASE_PRICE,
            base_volume: 1.0,
            trades: Vec::new(),
        }
    }

    pub fn with_base_price(mut self, price: f64) -> Self {
        self.base_price = price;
        self
    }

    pub fn with_base_volume(mut self, volume: f64) -> Self {
        self.base_volume = volume;
        self
    }

    /// Add a trade at `base_price * price_factor`, 1ms after the previous one
    pub fn add_trade(self, price_factor: f64) -> Self {
        let volume = self.base_volume;
        self.add_trade_with_volume(price_factor, volume)
    }

    pub fn add_trade_with_volume(mut self, price_factor: f64, volume: f64) -> Self {
        let offset = self.trades.len() as i64;
        self.trades
            .push(trade(offset, self.base_price * price_factor, volume));
        self
    }

    pub fn build(self) -> Vec<Trade> {
        self.trades
    }
}

/// Common test scenarios
pub mod scenarios {
    use super::*;

    /// Prices 5, 9, 3, 7 with volume 1 each: a volume(4) bar closes on the
    /// last trade with high 9 and low 3
    pub fn five_nine_three_seven() -> Vec<Trade> {
        [5.0, 9.0, 3.0, 7.0]
            .iter()
            .enumerate()
            .map(|(i, &p)| trade(i as i64, p, 1.0))
            .collect()
    }

    /// Small trades, one oversized trade, then small trades again
    pub fn oversized_middle_trade() -> Vec<Trade> {
        TradeBuilder::new()
            .with_base_price(100.0)
            .add_trade(1.0)
            .add_trade(1.01)
            .add_trade_with_volume(1.02, 1_000.0)
            .add_trade(0.99)
            .add_trade(1.0)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_increase() {
        let trades = sawtooth_trades(50, 10.0);
        assert!(trades.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn test_builder() {
        let trades = TradeBuilder::new()
            .with_base_price(10.0)
            .with_base_volume(2.0)
            .add_trade(1.0)
            .add_trade(1.5)
            .build();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[1].price, 15.0);
        assert_eq!(trades[1].volume, 2.0);
    }
}
