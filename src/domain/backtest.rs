//! Backtest driver.
//!
//! Raw 1-minute bars are resampled once per interval, cut to the session
//! window, split into trading days, and each day is handed to both
//! strategies. Days are independent, so the trade log is just the
//! concatenation of every (interval, day, strategy) result, sorted by entry
//! time.

use super::bar::{Bar, BarSeries};
use super::error::OpenBellError;
use super::resample::{resample, Interval};
use super::session::{session_window, split_days, SessionWindow};
use super::strategy::{
    MomentumStrategy, ReversalParams, ReversalStrategy, SessionStrategy, StrategyParams,
};
use super::trade::TradeLogEntry;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub session: SessionWindow,
    pub intervals: Vec<Interval>,
    pub momentum: StrategyParams,
    pub reversal: ReversalParams,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        let intervals = [1, 2, 3, 5, 10, 15]
            .into_iter()
            .filter_map(|m| Interval::from_minutes(m).ok())
            .collect();
        Self {
            session: SessionWindow::default(),
            intervals,
            momentum: StrategyParams::default(),
            reversal: ReversalParams::default(),
        }
    }
}

/// Runs both strategies over every day of an already-resampled series.
pub fn run_series(
    series: &BarSeries,
    interval: Interval,
    config: &BacktestConfig,
) -> Result<Vec<TradeLogEntry>, OpenBellError> {
    let momentum = MomentumStrategy::new(config.momentum);
    let reversal = ReversalStrategy::new(config.reversal);
    let strategies: [&dyn SessionStrategy; 2] = [&momentum, &reversal];

    let windowed = session_window(series, config.session);
    let mut log = Vec::new();

    for (date, day) in split_days(&windowed) {
        for strategy in strategies {
            match strategy.run_day(&day)? {
                Some(trade) => log.push(TradeLogEntry {
                    date,
                    interval,
                    strategy: strategy.kind(),
                    trade,
                }),
                None => debug!(%date, %interval, strategy = %strategy.kind(), "no trade"),
            }
        }
    }

    Ok(log)
}

/// Resamples `bars` to every configured interval and runs the strategies.
///
/// A data error in one interval is logged and that interval skipped; the
/// other intervals still run.
pub fn run_backtest(bars: &[Bar], config: &BacktestConfig) -> Vec<TradeLogEntry> {
    let mut log: Vec<TradeLogEntry> = config
        .intervals
        .iter()
        .flat_map(|&interval| {
            let result =
                resample(bars, interval).and_then(|series| run_series(&series, interval, config));
            match result {
                Ok(entries) => {
                    info!(%interval, trades = entries.len(), "interval complete");
                    entries
                }
                Err(e) => {
                    warn!(%interval, error = %e, "skipping interval");
                    Vec::new()
                }
            }
        })
        .collect();

    log.sort_by_key(|e| e.trade.entry_time);
    log
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stop_loss::StopLossPolicy;
    use crate::domain::trade::{Direction, StrategyKind};
    use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn bar(ts: NaiveDateTime, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            ts,
            open,
            high,
            low,
            close,
            volume: 10,
        }
    }

    /// Pre-market noise, two bullish bars from the open, then a rally.
    fn bullish_open(day: u32) -> Vec<Bar> {
        vec![
            bar(at(day, 9, 28), 99.0, 99.5, 98.8, 99.2),
            bar(at(day, 9, 30), 99.0, 100.5, 98.5, 100.0),
            bar(at(day, 9, 31), 100.0, 101.0, 99.0, 100.8),
            bar(at(day, 9, 32), 101.0, 101.5, 100.5, 101.2),
            bar(at(day, 9, 33), 101.2, 105.0, 100.9, 104.0),
        ]
    }

    fn structure_config() -> BacktestConfig {
        let policy = StopLossPolicy::StructureLookback { lookback: 2 };
        BacktestConfig {
            intervals: vec![Interval::from_minutes(1).unwrap()],
            momentum: StrategyParams {
                stop_loss: policy,
                ..StrategyParams::default()
            },
            reversal: ReversalParams {
                base: StrategyParams {
                    stop_loss: policy,
                    ..ReversalParams::default().base
                },
                flush_min_range_pct: 0.9,
            },
            ..BacktestConfig::default()
        }
    }

    #[test]
    fn default_config_intervals() {
        let c = BacktestConfig::default();
        let minutes: Vec<u32> = c.intervals.iter().map(|i| i.minutes()).collect();
        assert_eq!(minutes, vec![1, 2, 3, 5, 10, 15]);
        assert_eq!(c.session.start, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
    }

    #[test]
    fn series_runs_one_momentum_trade_per_day() {
        let mut bars = bullish_open(1);
        bars.extend(bullish_open(2));
        let series = BarSeries::new(bars).unwrap();
        let config = structure_config();

        let log = run_series(&series, config.intervals[0], &config).unwrap();

        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|e| e.strategy == StrategyKind::Momentum));
        assert_eq!(log[0].date, NaiveDate::from_ymd_opt(2025, 5, 1).unwrap());
        assert_eq!(log[1].date, NaiveDate::from_ymd_opt(2025, 5, 2).unwrap());
        assert_eq!(log[0].trade.direction, Direction::Long);
        // Pre-market bar is outside the session window.
        assert_eq!(log[0].trade.stop_price, 98.5);
    }

    #[test]
    fn backtest_sorts_across_intervals() {
        let bars: Vec<Bar> = bullish_open(1);
        let config = BacktestConfig {
            intervals: vec![
                Interval::from_minutes(1).unwrap(),
                Interval::from_minutes(2).unwrap(),
            ],
            ..structure_config()
        };

        let log = run_backtest(&bars, &config);
        assert!(!log.is_empty());
        assert!(log
            .windows(2)
            .all(|w| w[0].trade.entry_time <= w[1].trade.entry_time));
    }

    #[test]
    fn bad_interval_data_is_skipped_not_fatal() {
        let mut bars = bullish_open(1);
        bars.swap(2, 3);
        let log = run_backtest(&bars, &structure_config());
        assert!(log.is_empty());
    }

    #[test]
    fn empty_input_produces_empty_log() {
        assert!(run_backtest(&[], &BacktestConfig::default()).is_empty());
    }

    #[test]
    fn days_are_independent() {
        let mut bars = bullish_open(1);
        // Second day's session is flat: no momentum pattern.
        let start = at(2, 9, 30);
        bars.extend((0..4).map(|i| {
            bar(start + Duration::minutes(i), 100.0, 100.5, 99.5, 100.0)
        }));
        let series = BarSeries::new(bars).unwrap();
        let config = structure_config();

        let log = run_series(&series, config.intervals[0], &config).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].date, NaiveDate::from_ymd_opt(2025, 5, 1).unwrap());
    }
}
