//! Flush-and-reverse.
//!
//! Windows of three bars (flush, reversal 1, reversal 2) are scanned from the
//! anchor forward, one bar at a time. A flush bar's range must reach
//! `flush_min_range_pct` of the first-hour range (max high - min low of the
//! bars from the open to one hour later). A down flush followed by two
//! bullish bars goes long; an up flush followed by two bearish bars goes
//! short. Entry is at the open of reversal 2. The first window that yields a
//! trade ends the day. A day needs at least four bars from the anchor.

use super::{find_anchor, open_trade, SessionStrategy, StrategyParams};
use crate::domain::bar::{Bar, BarSeries};
use crate::domain::error::OpenBellError;
use crate::domain::stop_loss::StopLossPolicy;
use crate::domain::trade::{Direction, StrategyKind, Trade};
use chrono::Duration;
use std::fmt;
use tracing::debug;

/// Extra gate applied to a matched reversal before entering.
///
/// `entry_index` is the reversal 2 bar. Any
/// `Fn(&[Bar], usize, Direction) -> bool` closure works as a confirmation.
pub trait Confirmation: Send + Sync {
    fn confirm(&self, bars: &[Bar], entry_index: usize, direction: Direction) -> bool;
}

/// Confirms every matched pattern.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Confirmation for AlwaysConfirm {
    fn confirm(&self, _bars: &[Bar], _entry_index: usize, _direction: Direction) -> bool {
        true
    }
}

impl<F> Confirmation for F
where
    F: Fn(&[Bar], usize, Direction) -> bool + Send + Sync,
{
    fn confirm(&self, bars: &[Bar], entry_index: usize, direction: Direction) -> bool {
        self(bars, entry_index, direction)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReversalParams {
    pub base: StrategyParams,
    pub flush_min_range_pct: f64,
}

impl Default for ReversalParams {
    fn default() -> Self {
        Self {
            base: StrategyParams {
                stop_loss: StopLossPolicy::Atr {
                    period: 14,
                    multiplier: 3.0,
                },
                target_r_multiple: 2.0,
                ..StrategyParams::default()
            },
            flush_min_range_pct: 0.25,
        }
    }
}

pub struct ReversalStrategy {
    params: ReversalParams,
    confirmation: Box<dyn Confirmation>,
}

impl ReversalStrategy {
    pub fn new(params: ReversalParams) -> Self {
        Self {
            params,
            confirmation: Box::new(AlwaysConfirm),
        }
    }

    pub fn with_confirmation(mut self, confirmation: impl Confirmation + 'static) -> Self {
        self.confirmation = Box::new(confirmation);
        self
    }

    pub fn params(&self) -> &ReversalParams {
        &self.params
    }

    /// max(high) - min(low) over bars from the open to one hour after it,
    /// inclusive. Zero when no bar falls in that hour.
    pub fn first_hour_range(&self, bars: &[Bar]) -> f64 {
        let open = self.params.base.open_time;
        let end = open + Duration::hours(1);
        let mut hour = bars.iter().filter(|b| {
            let t = b.ts.time();
            t >= open && t <= end
        });

        let Some(first) = hour.next() else {
            return 0.0;
        };
        let (high, low) = hour.fold((first.high, first.low), |(h, l), b| {
            (h.max(b.high), l.min(b.low))
        });
        high - low
    }

    pub fn is_flush(&self, bar: &Bar, session_range: f64) -> bool {
        if session_range == 0.0 {
            return false;
        }
        bar.range() / session_range >= self.params.flush_min_range_pct
    }

    /// Direction implied by a flush bar and the two bars after it.
    fn reversal_direction(flush: &Bar, rev1: &Bar, rev2: &Bar) -> Option<Direction> {
        if flush.is_bearish() && rev1.is_bullish() && rev2.is_bullish() {
            Some(Direction::Long)
        } else if flush.is_bullish() && rev1.is_bearish() && rev2.is_bearish() {
            Some(Direction::Short)
        } else {
            None
        }
    }

    /// Every window that matches the pattern and passes confirmation, in scan
    /// order, as (entry index, direction). Empty when fewer than four bars
    /// start at the anchor.
    pub fn signals<'a>(&'a self, bars: &'a [Bar]) -> impl Iterator<Item = (usize, Direction)> + 'a {
        let anchor = find_anchor(bars, self.params.base.open_time)
            .filter(|&a| a + 3 < bars.len())
            .unwrap_or(bars.len());
        let session_range = self.first_hour_range(bars);

        bars.windows(3)
            .enumerate()
            .skip(anchor)
            .filter(move |(_, w)| self.is_flush(&w[0], session_range))
            .filter_map(|(i, w)| Self::reversal_direction(&w[0], &w[1], &w[2]).map(|d| (i + 2, d)))
            .filter(move |&(entry, direction)| self.confirmation.confirm(bars, entry, direction))
    }
}

impl fmt::Debug for ReversalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReversalStrategy")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl Default for ReversalStrategy {
    fn default() -> Self {
        Self::new(ReversalParams::default())
    }
}

impl SessionStrategy for ReversalStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Reversal
    }

    fn run_day(&self, day: &BarSeries) -> Result<Option<Trade>, OpenBellError> {
        let bars = day.bars();
        for (entry, direction) in self.signals(bars) {
            debug!(entry_time = %bars[entry].ts, %direction, "reversal signal");
            if let Some(trade) = open_trade(bars, entry, direction, &self.params.base)? {
                return Ok(Some(trade));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trade::Outcome;
    use chrono::{NaiveDate, NaiveDateTime};

    fn t(i: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
            + Duration::minutes(5 * i)
    }

    fn series(rows: &[(f64, f64, f64, f64)]) -> BarSeries {
        let bars = rows
            .iter()
            .enumerate()
            .map(|(i, &(open, high, low, close))| Bar {
                ts: t(i as i64),
                open,
                high,
                low,
                close,
                volume: 100,
            })
            .collect();
        BarSeries::new(bars).unwrap()
    }

    fn strategy() -> ReversalStrategy {
        ReversalStrategy::new(ReversalParams {
            base: StrategyParams {
                stop_loss: StopLossPolicy::StructureLookback { lookback: 3 },
                target_r_multiple: 2.0,
                ..StrategyParams::default()
            },
            flush_min_range_pct: 0.4,
        })
    }

    /// Quiet bar, down flush, two bullish bars, then a rally.
    fn down_flush_day() -> BarSeries {
        series(&[
            (100.0, 100.5, 99.5, 100.2),
            (100.2, 100.4, 94.0, 94.5),
            (94.5, 95.5, 94.3, 95.2),
            (95.2, 96.0, 95.0, 95.8),
            (95.8, 108.0, 95.6, 107.0),
        ])
    }

    #[test]
    fn first_hour_range_spans_open_to_plus_one_hour() {
        let s = strategy();
        assert_eq!(s.first_hour_range(down_flush_day().bars()), 108.0 - 94.0);
        assert_eq!(s.first_hour_range(&[]), 0.0);
    }

    #[test]
    fn down_flush_then_two_bullish_bars_goes_long() {
        let day = down_flush_day();
        let trade = strategy().run_day(&day).unwrap().unwrap();

        assert_eq!(trade.direction, Direction::Long);
        // Entry at the open of the second reversal bar.
        assert_eq!(trade.entry_time, t(3));
        assert_eq!(trade.entry_price, 95.2);
        // Structure stop: lowest low of the three bars before entry.
        assert_eq!(trade.stop_price, 94.0);
        assert_eq!(trade.outcome, Outcome::Win);
    }

    #[test]
    fn up_flush_then_two_bearish_bars_goes_short() {
        let day = series(&[
            (100.0, 100.5, 99.5, 99.8),
            (99.8, 106.0, 99.7, 105.5),
            (105.5, 105.6, 104.5, 104.8),
            (104.8, 105.0, 104.0, 104.2),
            (104.2, 104.3, 95.0, 96.0),
        ]);
        let trade = strategy().run_day(&day).unwrap().unwrap();

        assert_eq!(trade.direction, Direction::Short);
        assert_eq!(trade.entry_time, t(3));
        assert_eq!(trade.stop_price, 106.0);
    }

    #[test]
    fn no_flush_bar_means_no_trade() {
        let day = series(&[
            (100.0, 101.0, 99.0, 100.5),
            (100.5, 101.5, 100.0, 100.2),
            (100.2, 101.0, 99.5, 100.8),
            (100.8, 101.8, 100.4, 101.5),
            (101.5, 102.0, 100.9, 101.0),
        ]);
        let s = ReversalStrategy::new(ReversalParams {
            flush_min_range_pct: 0.9,
            ..ReversalParams::default()
        });
        assert!(s.run_day(&day).unwrap().is_none());
    }

    #[test]
    fn zero_session_range_disqualifies_every_bar() {
        let flat = Bar {
            ts: t(0),
            open: 100.0,
            high: 100.0,
            low: 100.0,
            close: 100.0,
            volume: 1,
        };
        let s = strategy();
        assert!(!s.is_flush(&flat, 0.0));
    }

    #[test]
    fn rejecting_confirmation_blocks_the_trade() {
        let day = down_flush_day();
        let s = strategy().with_confirmation(|_: &[Bar], _: usize, _: Direction| false);
        assert!(s.run_day(&day).unwrap().is_none());
    }

    #[test]
    fn confirmation_sees_entry_index_and_direction() {
        let day = down_flush_day();
        let s = strategy().with_confirmation(|bars: &[Bar], entry: usize, direction: Direction| {
            entry == 3 && direction == Direction::Long && bars[entry].open == 95.2
        });
        assert!(s.run_day(&day).unwrap().is_some());
    }

    #[test]
    fn only_first_matching_window_trades() {
        // Two flush-and-reverse patterns; the scan stops at the first.
        let day = series(&[
            (100.2, 100.4, 94.0, 94.5),
            (94.5, 95.5, 94.3, 95.2),
            (95.2, 96.0, 95.0, 95.8),
            (95.8, 96.0, 89.0, 89.5),
            (89.5, 90.5, 89.4, 90.2),
            (90.2, 91.0, 90.0, 90.8),
        ]);
        let s = strategy();
        let signals: Vec<_> = s.signals(day.bars()).collect();
        assert_eq!(signals, vec![(2, Direction::Long), (5, Direction::Long)]);

        let trade = s.run_day(&day).unwrap().unwrap();
        assert_eq!(trade.entry_time, t(2));
    }

    #[test]
    fn too_few_bars_after_anchor_is_no_trade() {
        let day = series(&[(100.2, 100.4, 94.0, 94.5), (94.5, 95.5, 94.3, 95.2)]);
        assert!(strategy().run_day(&day).unwrap().is_none());
    }

    #[test]
    fn pattern_without_a_bar_to_simulate_on_is_skipped() {
        // Flush down then two bullish bars, but nothing after the entry bar.
        let day = series(&[
            (100.2, 100.4, 94.0, 94.5),
            (94.5, 95.5, 94.3, 95.2),
            (95.2, 96.0, 95.0, 95.8),
        ]);
        let s = strategy();
        assert_eq!(s.signals(day.bars()).count(), 0);
        assert!(s.run_day(&day).unwrap().is_none());
    }

    #[test]
    fn four_bars_from_anchor_is_enough() {
        let day = series(&[
            (100.2, 100.4, 94.0, 94.5),
            (94.5, 95.5, 94.3, 95.2),
            (95.2, 96.0, 95.0, 95.8),
            (95.8, 99.0, 95.6, 98.8),
        ]);
        let trade = strategy().run_day(&day).unwrap().unwrap();
        assert_eq!(trade.entry_time, t(2));
        assert_eq!(trade.direction, Direction::Long);
    }
}
