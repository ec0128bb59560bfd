//! Summary statistics over completed trades, measured in R.

use super::resample::Interval;
use super::trade::{Outcome, StrategyKind, Trade, TradeLogEntry};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsReport {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Percent, 0-100.
    pub win_rate: f64,
    pub avg_r_multiple: f64,
    pub total_r_multiple: f64,
    pub profit_factor: f64,
    pub max_drawdown: f64,
    /// Percent of the highest equity peak.
    pub max_drawdown_pct: f64,
    pub avg_win_r: f64,
    pub avg_loss_r: f64,
}

impl MetricsReport {
    /// Reduces trades, in the order given, into a report. Empty input gives
    /// the all-zero report.
    pub fn compute<'a, I>(trades: I) -> Self
    where
        I: IntoIterator<Item = &'a Trade>,
    {
        let trades: Vec<&Trade> = trades.into_iter().collect();
        if trades.is_empty() {
            return Self::default();
        }

        let mut winning_trades = 0usize;
        let mut losing_trades = 0usize;
        let mut win_sum = 0.0_f64;
        let mut loss_sum = 0.0_f64;

        for trade in &trades {
            match trade.outcome {
                Outcome::Win => {
                    winning_trades += 1;
                    win_sum += trade.r_multiple;
                }
                Outcome::Loss => {
                    losing_trades += 1;
                    loss_sum += trade.r_multiple;
                }
                Outcome::SessionEndClose => {}
            }
        }

        let total_trades = trades.len();
        let n = total_trades as f64;
        let total_r_multiple: f64 = trades.iter().map(|t| t.r_multiple).sum();

        let profit_factor = if loss_sum != 0.0 {
            win_sum / loss_sum.abs()
        } else {
            f64::INFINITY
        };

        let avg_win_r = if winning_trades > 0 {
            win_sum / winning_trades as f64
        } else {
            0.0
        };

        let avg_loss_r = if losing_trades > 0 {
            loss_sum / losing_trades as f64
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_pct) =
            compute_drawdown(trades.iter().map(|t| t.r_multiple));

        MetricsReport {
            total_trades,
            winning_trades,
            losing_trades,
            win_rate: winning_trades as f64 / n * 100.0,
            avg_r_multiple: total_r_multiple / n,
            total_r_multiple,
            profit_factor,
            max_drawdown,
            max_drawdown_pct,
            avg_win_r,
            avg_loss_r,
        }
    }

    /// Report for each strategy present in the log.
    pub fn by_strategy(log: &[TradeLogEntry]) -> Vec<(StrategyKind, MetricsReport)> {
        group_by(log, |e| e.strategy)
    }

    /// Report for each interval present in the log, shortest first.
    pub fn by_interval(log: &[TradeLogEntry]) -> Vec<(Interval, MetricsReport)> {
        group_by(log, |e| e.interval)
    }
}

fn group_by<K: Ord>(
    log: &[TradeLogEntry],
    key: impl Fn(&TradeLogEntry) -> K,
) -> Vec<(K, MetricsReport)> {
    let mut groups: BTreeMap<K, Vec<&Trade>> = BTreeMap::new();
    for entry in log {
        groups.entry(key(entry)).or_default().push(&entry.trade);
    }
    groups
        .into_iter()
        .map(|(k, trades)| (k, MetricsReport::compute(trades)))
        .collect()
}

/// Max (running peak - equity) over the cumulative R curve, and that drawdown
/// as a percent of the highest peak reached.
fn compute_drawdown(r_multiples: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut equity = 0.0_f64;
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;

    for r in r_multiples {
        equity += r;
        peak = peak.max(equity);
        max_dd = max_dd.max(peak - equity);
    }

    let pct = if peak > 0.0 { max_dd / peak * 100.0 } else { 0.0 };
    (max_dd, pct)
}
