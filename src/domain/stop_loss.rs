//! Stop-loss policies.
//!
//! Every policy prices the stop off the entry bar's open. When a policy lacks
//! the history it needs it falls back to a fixed percentage offset and marks
//! the result as degraded instead of failing:
//!
//! | policy             | fallback when                   | offset            |
//! |--------------------|---------------------------------|-------------------|
//! | `Atr`              | fewer than `period` bars        | 0.5% of entry     |
//! | `StructureLookback`| entry is the first bar          | 1% of entry open  |
//! | `BarRangeFraction` | no bar precedes the entry       | 0.5% of entry     |

use super::bar::Bar;
use super::error::OpenBellError;
use super::trade::Direction;
use tracing::warn;

const ATR_FALLBACK_PCT: f64 = 0.005;
const STRUCTURE_FALLBACK_PCT: f64 = 0.01;
const BAR_RANGE_FALLBACK_PCT: f64 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopLossPolicy {
    /// entry ∓ SMA(true range, period) × multiplier
    Atr { period: usize, multiplier: f64 },
    /// min low / max high of the `lookback` bars before entry
    StructureLookback { lookback: usize },
    /// entry ∓ fraction × range of the bar before entry
    BarRangeFraction { fraction: f64 },
}

/// Numeric knobs for every policy, so a policy can be picked by tag at
/// configuration time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopLossParams {
    pub atr_period: usize,
    pub atr_multiplier: f64,
    pub structure_lookback: usize,
    pub bar_range_fraction: f64,
}

impl Default for StopLossParams {
    fn default() -> Self {
        Self {
            atr_period: 14,
            atr_multiplier: 2.0,
            structure_lookback: 3,
            bar_range_fraction: 0.5,
        }
    }
}

impl StopLossPolicy {
    /// Selects a policy by its configuration tag: `atr`, `structure` or `bar_range`.
    pub fn from_tag(tag: &str, params: &StopLossParams) -> Result<Self, OpenBellError> {
        match tag.trim().to_lowercase().as_str() {
            "atr" => Ok(StopLossPolicy::Atr {
                period: params.atr_period,
                multiplier: params.atr_multiplier,
            }),
            "structure" | "structure_lookback" => Ok(StopLossPolicy::StructureLookback {
                lookback: params.structure_lookback,
            }),
            "bar_range" | "bar_range_fraction" => Ok(StopLossPolicy::BarRangeFraction {
                fraction: params.bar_range_fraction,
            }),
            _ => Err(OpenBellError::UnknownPolicy {
                value: tag.to_string(),
            }),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            StopLossPolicy::Atr { .. } => "atr",
            StopLossPolicy::StructureLookback { .. } => "structure",
            StopLossPolicy::BarRangeFraction { .. } => "bar_range",
        }
    }
}

/// A computed stop. `degraded` is set when the policy fell back to a fixed offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopLoss {
    pub price: f64,
    pub degraded: bool,
}

impl StopLoss {
    fn exact(price: f64) -> Self {
        Self {
            price,
            degraded: false,
        }
    }

    fn degraded(price: f64) -> Self {
        Self {
            price,
            degraded: true,
        }
    }
}

/// Computes the stop for a trade entered at the open of `bars[entry_index]`.
pub fn compute_stop(
    bars: &[Bar],
    entry_index: usize,
    direction: Direction,
    policy: &StopLossPolicy,
) -> Result<StopLoss, OpenBellError> {
    let entry_bar = bars.get(entry_index).ok_or(OpenBellError::EntryOutOfRange {
        index: entry_index,
        len: bars.len(),
    })?;
    let entry_price = entry_bar.open;

    let stop = match *policy {
        StopLossPolicy::Atr { period, multiplier } => match sma_atr(bars, entry_index, period) {
            Some(atr) => StopLoss::exact(atr_stop(entry_price, atr, direction, multiplier)),
            None => {
                warn!(
                    entry_time = %entry_bar.ts,
                    period,
                    "DegradedStop: ATR undefined at entry, using 0.5% stop"
                );
                StopLoss::degraded(offset_stop(entry_price, direction, ATR_FALLBACK_PCT))
            }
        },
        StopLossPolicy::StructureLookback { lookback } => {
            let start = entry_index.saturating_sub(lookback);
            let window = &bars[start..entry_index];
            match structure_stop(window, direction) {
                Some(price) => StopLoss::exact(price),
                None => {
                    warn!(
                        entry_time = %entry_bar.ts,
                        lookback,
                        "DegradedStop: empty structure lookback, using 1% stop"
                    );
                    StopLoss::degraded(offset_stop(
                        entry_bar.open,
                        direction,
                        STRUCTURE_FALLBACK_PCT,
                    ))
                }
            }
        }
        StopLossPolicy::BarRangeFraction { fraction } => match entry_index.checked_sub(1) {
            Some(prev) => {
                let reference = &bars[prev];
                StopLoss::exact(bar_range_stop(
                    entry_price,
                    reference.high,
                    reference.low,
                    direction,
                    fraction,
                ))
            }
            None => {
                warn!(
                    entry_time = %entry_bar.ts,
                    "DegradedStop: no reference bar before entry, using 0.5% stop"
                );
                StopLoss::degraded(offset_stop(entry_price, direction, BAR_RANGE_FALLBACK_PCT))
            }
        },
    };

    Ok(stop)
}

/// Simple moving average of the true range over the `period` bars ending at
/// `end_index` (inclusive). The first bar of the series uses high - low.
/// Returns `None` when fewer than `period` bars are available.
pub fn sma_atr(bars: &[Bar], end_index: usize, period: usize) -> Option<f64> {
    if period == 0 || end_index >= bars.len() || end_index + 1 < period {
        return None;
    }
    let start = end_index + 1 - period;
    let sum: f64 = (start..=end_index)
        .map(|i| {
            if i == 0 {
                bars[i].range()
            } else {
                bars[i].true_range(bars[i - 1].close)
            }
        })
        .sum();
    Some(sum / period as f64)
}

pub fn atr_stop(entry_price: f64, atr: f64, direction: Direction, multiplier: f64) -> f64 {
    entry_price - direction.sign() * atr * multiplier
}

/// Lowest low (long) or highest high (short) of `window`; `None` when empty.
pub fn structure_stop(window: &[Bar], direction: Direction) -> Option<f64> {
    match direction {
        Direction::Long => window.iter().map(|b| b.low).reduce(f64::min),
        Direction::Short => window.iter().map(|b| b.high).reduce(f64::max),
    }
}

pub fn bar_range_stop(
    entry_price: f64,
    bar_high: f64,
    bar_low: f64,
    direction: Direction,
    fraction: f64,
) -> f64 {
    entry_price - direction.sign() * (bar_high - bar_low) * fraction
}

fn offset_stop(price: f64, direction: Direction, pct: f64) -> f64 {
    price * (1.0 - direction.sign() * pct)
}
