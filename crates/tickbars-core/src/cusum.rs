//! Symmetric CUSUM event filter
//!
//! Tracks upside and downside cumulative sums of successive differences and
//! samples an index whenever one of them exceeds the threshold, resetting that
//! sum to zero. A series hovering around a level never fires repeatedly: a full
//! run of `threshold` is needed for each event.

use thiserror::Error;

/// Threshold applied at each step of a scan
#[derive(Debug, Clone, PartialEq)]
pub enum CusumThreshold {
    /// Same threshold at every index
    Fixed(f64),
    /// One threshold per index, aligned with the value series
    PerIndex(Vec<f64>),
}

impl CusumThreshold {
    #[inline]
    fn at(&self, i: usize) -> f64 {
        match self {
            CusumThreshold::Fixed(t) => *t,
            CusumThreshold::PerIndex(ts) => ts[i],
        }
    }
}

impl From<f64> for CusumThreshold {
    fn from(threshold: f64) -> Self {
        CusumThreshold::Fixed(threshold)
    }
}

/// Direction of the cumulative sum that fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CusumEvent {
    Upside,
    Downside,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CusumError {
    #[error("Threshold series has {thresholds} entries but the value series has {values}")]
    ThresholdLengthMismatch { values: usize, thresholds: usize },
}

/// Incremental two-sided CUSUM state machine
///
/// ```ignore
/// let mut filter = CusumFilter::new();
/// for price in closes {
///     if let Some(event) = filter.update(price, 0.5) {
///         sample(event);
///     }
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CusumFilter {
    s_pos: f64,
    s_neg: f64,
    prev: Option<f64>,
}

impl CusumFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next value with the threshold for its position
    ///
    /// The first value only seeds the difference and never fires. The downside
    /// sum is checked first; at most one event per step.
    pub fn update(&mut self, value: f64, threshold: f64) -> Option<CusumEvent> {
        let prev = self.prev.replace(value)?;
        let diff = value - prev;

        self.s_pos = (self.s_pos + diff).max(0.0);
        self.s_neg = (self.s_neg + diff).min(0.0);

        if self.s_neg < -threshold {
            self.s_neg = 0.0;
            Some(CusumEvent::Downside)
        } else if self.s_pos > threshold {
            self.s_pos = 0.0;
            Some(CusumEvent::Upside)
        } else {
            None
        }
    }

    /// Upside cumulative sum (always `>= 0`)
    pub fn s_pos(&self) -> f64 {
        self.s_pos
    }

    /// Downside cumulative sum (always `<= 0`)
    pub fn s_neg(&self) -> f64 {
        self.s_neg
    }

    /// Clear both sums and forget the previous value
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Labels of every event in `series`
    ///
    /// Event labels are returned in series order.
    ///
    /// # Errors
    ///
    /// `CusumError::ThresholdLengthMismatch` if a per-index threshold is shorter
    /// than the series. Checked before any value is evaluated; extra threshold
    /// entries past the end of the series are ignored.
    pub fn scan<I: Clone>(
        series: &[(I, f64)],
        threshold: &CusumThreshold,
    ) -> Result<Vec<I>, CusumError> {
        Ok(Self::scan_events(series, threshold)?
            .into_iter()
            .map(|(label, _)| label)
            .collect())
    }

    /// Like [`Self::scan`], also reporting which side fired
    pub fn scan_events<I: Clone>(
        series: &[(I, f64)],
        threshold: &CusumThreshold,
    ) -> Result<Vec<(I, CusumEvent)>, CusumError> {
        if let CusumThreshold::PerIndex(ts) = threshold {
            if ts.len() < series.len() {
                return Err(CusumError::ThresholdLengthMismatch {
                    values: series.len(),
                    thresholds: ts.len(),
                });
            }
        }

        let mut filter = Self::new();
        let mut events = Vec::new();
        for (i, (label, value)) in series.iter().enumerate() {
            if let Some(event) = filter.update(*value, threshold.at(i)) {
                events.push((label.clone(), event));
            }
        }

        tracing::debug!(
            values = series.len(),
            events = events.len(),
            "cusum scan complete"
        );
        Ok(events)
    }
}
