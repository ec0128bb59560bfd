//! OHLCV bar and validated bar series.

use super::error::OpenBellError;
use chrono::{NaiveDate, NaiveDateTime};

/// One OHLCV bar. `ts` is the local wall-clock open time of the bar in the
/// reference timezone.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub ts: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl Bar {
    pub fn date(&self) -> NaiveDate {
        self.ts.date()
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// high - low
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// low <= min(open, close) <= max(open, close) <= high
    pub fn is_well_formed(&self) -> bool {
        self.low <= self.open.min(self.close) && self.open.max(self.close) <= self.high
    }
}

/// Ordered bars for one instrument at one interval.
///
/// Timestamps are strictly increasing and every bar is well formed; both are
/// checked on construction, so downstream lookback windows and forward scans
/// can index freely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(bars: Vec<Bar>) -> Result<Self, OpenBellError> {
        validate_bars(&bars)?;
        Ok(Self { bars })
    }

    /// Builds a series from bars already known to satisfy the invariants,
    /// such as a filtered or aggregated view of a validated series.
    pub(crate) fn from_validated(bars: Vec<Bar>) -> Self {
        Self { bars }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn into_bars(self) -> Vec<Bar> {
        self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }
}

impl AsRef<[Bar]> for BarSeries {
    fn as_ref(&self) -> &[Bar] {
        &self.bars
    }
}

/// Rejects unsorted or duplicate timestamps and malformed bars.
pub fn validate_bars(bars: &[Bar]) -> Result<(), OpenBellError> {
    for (i, bar) in bars.iter().enumerate() {
        if !bar.is_well_formed() {
            return Err(OpenBellError::InvalidBar { timestamp: bar.ts });
        }
        if i > 0 && bar.ts <= bars[i - 1].ts {
            return Err(OpenBellError::NonMonotonicTimestamps {
                index: i,
                timestamp: bar.ts,
            });
        }
    }
    Ok(())
}
