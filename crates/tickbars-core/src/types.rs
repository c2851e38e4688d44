//! Type definitions for threshold bar processing

use crate::errors::ProcessingError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Cumulative quantity whose crossing of a threshold closes a bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarMetric {
    /// Number of trades in the bucket
    Tick,
    /// Sum of traded quantity
    Volume,
    /// Sum of price * quantity
    Dollar,
}

impl BarMetric {
    /// All metrics, in canonical order
    pub const ALL: [BarMetric; 3] = [BarMetric::Tick, BarMetric::Volume, BarMetric::Dollar];

    /// Lowercase name used in specs, file names and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            BarMetric::Tick => "tick",
            BarMetric::Volume => "volume",
            BarMetric::Dollar => "dollar",
        }
    }
}

impl fmt::Display for BarMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BarMetric {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tick" => Ok(BarMetric::Tick),
            "volume" => Ok(BarMetric::Volume),
            "dollar" => Ok(BarMetric::Dollar),
            _ => Err(ProcessingError::UnknownMetric {
                metric: s.to_string(),
            }),
        }
    }
}

/// A (metric, threshold) pair identifying one accumulator
///
/// The threshold is validated at construction (finite, `> 0`), which is what
/// makes bit-wise equality and hashing sound.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BarSpec {
    metric: BarMetric,
    threshold: f64,
}

impl BarSpec {
    /// Create a validated spec
    pub fn new(metric: BarMetric, threshold: f64) -> Result<Self, ProcessingError> {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ProcessingError::InvalidThreshold { threshold });
        }
        Ok(Self { metric, threshold })
    }

    /// Tick bar closing every `ticks` trades
    pub fn tick(ticks: u64) -> Result<Self, ProcessingError> {
        Self::new(BarMetric::Tick, ticks as f64)
    }

    /// Volume bar closing once `volume` units have traded
    pub fn volume(volume: f64) -> Result<Self, ProcessingError> {
        Self::new(BarMetric::Volume, volume)
    }

    /// Dollar bar closing once `dollars` of notional have traded
    pub fn dollar(dollars: f64) -> Result<Self, ProcessingError> {
        Self::new(BarMetric::Dollar, dollars)
    }

    pub fn metric(&self) -> BarMetric {
        self.metric
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl PartialEq for BarSpec {
    fn eq(&self, other: &Self) -> bool {
        self.metric == other.metric && self.threshold.to_bits() == other.threshold.to_bits()
    }
}

impl Eq for BarSpec {}

impl Hash for BarSpec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.metric.hash(state);
        self.threshold.to_bits().hash(state);
    }
}

impl fmt::Display for BarSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.metric, self.threshold)
    }
}

impl FromStr for BarSpec {
    type Err = ProcessingError;

    /// Parse `<metric>:<threshold>`, e.g. `volume:1000`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (metric, threshold) = s.split_once(':').ok_or_else(|| ProcessingError::InvalidSpec {
            spec: s.to_string(),
        })?;
        let metric: BarMetric = metric.parse()?;
        let threshold: f64 = threshold
            .trim()
            .parse()
            .map_err(|_| ProcessingError::InvalidSpec {
                spec: s.to_string(),
            })?;
        Self::new(metric, threshold)
    }
}

impl TryFrom<String> for BarSpec {
    type Error = ProcessingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BarSpec> for String {
    fn from(spec: BarSpec) -> Self {
        spec.to_string()
    }
}

/// A finished OHLCV bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Metric that closed this bar
    pub metric: BarMetric,

    /// Timestamp of the first trade in the bucket (microseconds)
    pub open_time: i64,

    /// Timestamp of the trade that reached the threshold (microseconds)
    pub close_time: i64,

    /// Number of trades in the bar
    pub cum_ticks: u64,

    /// First trade price
    pub open: f64,

    /// Highest price over every trade in the bar
    pub high: f64,

    /// Lowest price over every trade in the bar
    pub low: f64,

    /// Price of the threshold-crossing trade
    pub close: f64,

    /// Total traded quantity
    pub cum_volume: f64,

    /// Buyer-initiated quantity
    ///
    /// Trades carry no aggressor flag, so every trade counts as a buy and this
    /// always equals `cum_volume`.
    pub cum_buy_volume: f64,

    /// Total notional (sum of price * quantity)
    pub cum_dollar: f64,
}

impl Bar {
    /// Value of the thresholding metric at emission
    pub fn metric_value(&self) -> f64 {
        match self.metric {
            BarMetric::Tick => self.cum_ticks as f64,
            BarMetric::Volume => self.cum_volume,
            BarMetric::Dollar => self.cum_dollar,
        }
    }

    /// Volume weighted average price, `None` for a zero-volume bar
    pub fn vwap(&self) -> Option<f64> {
        (self.cum_volume > 0.0).then(|| self.cum_dollar / self.cum_volume)
    }
}

/// A bar tagged with the spec of the accumulator that produced it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmittedBar {
    pub spec: BarSpec,
    pub bar: Bar,
}
