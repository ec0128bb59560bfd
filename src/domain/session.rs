//! Session windowing and per-day grouping.

use super::bar::{Bar, BarSeries};
use chrono::{NaiveDate, NaiveTime};

/// Clock-time window `[start, end]`, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl SessionWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        time >= self.start && time <= self.end
    }
}

impl Default for SessionWindow {
    /// 09:30-10:00, the first half hour after the New York open.
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Keeps only bars whose time-of-day lies inside `window`.
///
/// Time-of-day is taken per bar, so a multi-day series is filtered per day.
pub fn session_window(series: &BarSeries, window: SessionWindow) -> BarSeries {
    let bars = series
        .bars()
        .iter()
        .filter(|bar| window.contains(bar.ts.time()))
        .cloned()
        .collect();
    BarSeries::from_validated(bars)
}

/// Splits a series into consecutive calendar days, in date order.
pub fn split_days(series: &BarSeries) -> Vec<(NaiveDate, BarSeries)> {
    let mut days: Vec<(NaiveDate, Vec<Bar>)> = Vec::new();
    for bar in series.bars() {
        let date = bar.date();
        match days.last_mut() {
            Some((d, bars)) if *d == date => bars.push(bar.clone()),
            _ => days.push((date, vec![bar.clone()])),
        }
    }
    days.into_iter()
        .map(|(date, bars)| (date, BarSeries::from_validated(bars)))
        .collect()
}
