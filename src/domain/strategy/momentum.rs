//! Momentum continuation.
//!
//! Bar1 is the anchor, Bar2 the bar after it and Bar3 the entry bar. Two
//! bullish bars go long at Bar3's open, two bearish bars go short; anything
//! else, or fewer than three bars from the anchor, is no trade. One trade per
//! day at most.

use super::{find_anchor, open_trade, SessionStrategy, StrategyParams};
use crate::domain::bar::{Bar, BarSeries};
use crate::domain::error::OpenBellError;
use crate::domain::trade::{Direction, StrategyKind, Trade};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct MomentumStrategy {
    params: StrategyParams,
}

impl MomentumStrategy {
    pub fn new(params: StrategyParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    /// Entry index and direction for the day, if the pattern matches.
    pub fn signal(&self, bars: &[Bar]) -> Option<(usize, Direction)> {
        let anchor = find_anchor(bars, self.params.open_time)?;
        let entry = anchor + 2;
        if entry >= bars.len() {
            return None;
        }

        let (bar1, bar2) = (&bars[anchor], &bars[anchor + 1]);
        let direction = if bar1.is_bullish() && bar2.is_bullish() {
            Direction::Long
        } else if bar1.is_bearish() && bar2.is_bearish() {
            Direction::Short
        } else {
            return None;
        };
        Some((entry, direction))
    }
}

impl SessionStrategy for MomentumStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Momentum
    }

    fn run_day(&self, day: &BarSeries) -> Result<Option<Trade>, OpenBellError> {
        let bars = day.bars();
        match self.signal(bars) {
            Some((entry, direction)) => {
                debug!(entry_time = %bars[entry].ts, %direction, "momentum signal");
                open_trade(bars, entry, direction, &self.params)
            }
            None => Ok(None),
        }
    }
}
