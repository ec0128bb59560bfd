//! Forward bar-by-bar trade outcome simulation.

use super::bar::Bar;
use super::trade::{Direction, Outcome, Trade};
use chrono::NaiveDateTime;

/// Open position being walked forward through the remaining bars of a day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenPosition {
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_price: f64,
    pub target_price: f64,
}

impl OpenPosition {
    pub fn stop_hit(&self, bar: &Bar) -> bool {
        match self.direction {
            Direction::Long => bar.low <= self.stop_price,
            Direction::Short => bar.high >= self.stop_price,
        }
    }

    pub fn target_hit(&self, bar: &Bar) -> bool {
        match self.direction {
            Direction::Long => bar.high >= self.target_price,
            Direction::Short => bar.low <= self.target_price,
        }
    }
}

/// Simulates a trade entered at `entry_time`, scanning every bar strictly after it.
///
/// Returns `None` for a zero-risk trade (stop at the entry price). On each
/// bar the stop is checked before the target, so a bar that touches both
/// is a loss. A trade still open after the last bar is closed at that bar's
/// close with an R-multiple of pnl / risk.
pub fn simulate(
    bars: &[Bar],
    entry_time: NaiveDateTime,
    entry_price: f64,
    stop_price: f64,
    direction: Direction,
    target_r_multiple: f64,
) -> Option<Trade> {
    let risk = (entry_price - stop_price).abs();
    if risk == 0.0 || !risk.is_finite() {
        return None;
    }

    let position = OpenPosition {
        direction,
        entry_price,
        stop_price,
        target_price: entry_price + direction.sign() * risk * target_r_multiple,
    };

    let after_entry = bars.partition_point(|b| b.ts <= entry_time);
    let forward = &bars[after_entry..];

    let close_at =
        |exit_time: NaiveDateTime, exit_price: f64, outcome: Outcome, r_multiple: f64| Trade {
            entry_time,
            direction,
            entry_price,
            stop_price,
            target_price: position.target_price,
            exit_time,
            exit_price,
            outcome,
            r_multiple,
        };

    for bar in forward {
        if position.stop_hit(bar) {
            return Some(close_at(bar.ts, stop_price, Outcome::Loss, -1.0));
        }
        if position.target_hit(bar) {
            return Some(close_at(
                bar.ts,
                position.target_price,
                Outcome::Win,
                target_r_multiple,
            ));
        }
    }

    let (exit_time, exit_price) = match forward.last() {
        Some(last) => (last.ts, last.close),
        None => (entry_time, entry_price),
    };
    let mut trade = close_at(exit_time, exit_price, Outcome::SessionEndClose, 0.0);
    trade.r_multiple = trade.pnl() / trade.risk();
    Some(trade)
}
