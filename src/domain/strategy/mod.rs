//! Per-day opening-bell strategies.
//!
//! Both strategies share one shape: find the anchor bar (first bar at or
//! after the open), match a short bar pattern after it, and hand the entry to
//! the stop-loss calculator and trade simulator. A day without the bars a
//! pattern needs simply yields no trade.

pub mod momentum;
pub mod reversal;

pub use momentum::MomentumStrategy;
pub use reversal::{AlwaysConfirm, Confirmation, ReversalParams, ReversalStrategy};

use super::bar::{Bar, BarSeries};
use super::error::OpenBellError;
use super::simulator::simulate;
use super::stop_loss::{compute_stop, StopLossPolicy};
use super::trade::{Direction, StrategyKind, Trade};
use chrono::NaiveTime;
use tracing::debug;

/// Parameters shared by every strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyParams {
    pub open_time: NaiveTime,
    pub stop_loss: StopLossPolicy,
    pub target_r_multiple: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            open_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN),
            stop_loss: StopLossPolicy::Atr {
                period: 14,
                multiplier: 2.0,
            },
            target_r_multiple: 1.5,
        }
    }
}

/// A strategy evaluated independently on each trading day.
pub trait SessionStrategy {
    fn kind(&self) -> StrategyKind;

    /// Runs the strategy over one day's bars. `Ok(None)` means no trade today.
    fn run_day(&self, day: &BarSeries) -> Result<Option<Trade>, OpenBellError>;
}

/// Index of the first bar whose time-of-day is at or after `open_time`.
pub fn find_anchor(bars: &[Bar], open_time: NaiveTime) -> Option<usize> {
    bars.iter().position(|b| b.ts.time() >= open_time)
}

/// Prices the stop for an entry at the open of `bars[entry_index]` and walks
/// the trade forward. `Ok(None)` when the stop lands on the entry price.
pub(crate) fn open_trade(
    bars: &[Bar],
    entry_index: usize,
    direction: Direction,
    params: &StrategyParams,
) -> Result<Option<Trade>, OpenBellError> {
    let stop = compute_stop(bars, entry_index, direction, &params.stop_loss)?;
    let entry = &bars[entry_index];

    let trade = simulate(
        bars,
        entry.ts,
        entry.open,
        stop.price,
        direction,
        params.target_r_multiple,
    );
    if trade.is_none() {
        debug!(entry_time = %entry.ts, "zero-risk entry skipped");
    }
    Ok(trade)
}
