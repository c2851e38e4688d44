//! Trade input type

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single executed trade
///
/// The atomic input unit of every bar. Created by a trade source, consumed once
/// by the dispatcher and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Timestamp in microseconds since the Unix epoch
    pub timestamp: i64,

    /// Execution price (not required to be positive)
    pub price: f64,

    /// Traded quantity, always `>= 0`
    pub volume: f64,
}

impl Trade {
    /// Create a validated trade
    ///
    /// Rejects non-finite prices and negative or non-finite volumes. Sources
    /// should construct trades through this so that malformed rows never reach
    /// an accumulator.
    pub fn new(timestamp: i64, price: f64, volume: f64) -> Result<Self, TradeError> {
        if !price.is_finite() {
            return Err(TradeError::NonFinitePrice { price });
        }
        if !volume.is_finite() {
            return Err(TradeError::NonFiniteVolume { volume });
        }
        if volume < 0.0 {
            return Err(TradeError::NegativeVolume { volume });
        }

        Ok(Self {
            timestamp,
            price,
            volume,
        })
    }

    /// Dollar value (price * volume)
    #[inline]
    pub fn dollar_value(&self) -> f64 {
        self.price * self.volume
    }
}

/// Trade validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TradeError {
    #[error("Negative volume: {volume}")]
    NegativeVolume { volume: f64 },

    #[error("Non-finite volume: {volume}")]
    NonFiniteVolume { volume: f64 },

    #[error("Non-finite price: {price}")]
    NonFinitePrice { price: f64 },
}
