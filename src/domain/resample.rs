//! Fixed-width bar resampling.
//!
//! Buckets are aligned to local midnight of each bar's calendar day, never to
//! the first bar of the input. A 5-minute bucket therefore always starts at
//! 09:25, 09:30, ... regardless of where the data begins. Buckets that receive
//! no bars are dropped rather than emitted as gaps.

use super::bar::{validate_bars, Bar, BarSeries};
use super::error::OpenBellError;
use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};
use std::fmt;
use std::str::FromStr;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Resampling width in whole minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interval {
    minutes: u32,
}

impl Interval {
    pub fn from_minutes(minutes: u32) -> Result<Self, OpenBellError> {
        if minutes == 0 || minutes > MINUTES_PER_DAY {
            return Err(OpenBellError::InvalidInterval {
                value: format!("{minutes}m"),
                reason: "width must be between 1 minute and 1 day".into(),
            });
        }
        Ok(Self { minutes })
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    /// Start of the midnight-aligned bucket containing `ts`.
    pub fn bucket_start(&self, ts: NaiveDateTime) -> NaiveDateTime {
        let width_secs = self.minutes * 60;
        let secs = ts.num_seconds_from_midnight();
        let start_secs = secs - secs % width_secs;
        let midnight = ts.date().and_time(NaiveTime::MIN);
        midnight + Duration::seconds(i64::from(start_secs))
    }
}

impl FromStr for Interval {
    type Err = OpenBellError;

    /// Accepts `5m`, `5min` and `1h`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_lowercase();
        let invalid = |reason: &str| OpenBellError::InvalidInterval {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let (digits, scale) = if let Some(d) = trimmed.strip_suffix("min") {
            (d, 1)
        } else if let Some(d) = trimmed.strip_suffix('m') {
            (d, 1)
        } else if let Some(d) = trimmed.strip_suffix('h') {
            (d, 60)
        } else {
            return Err(invalid("expected a unit suffix of m, min or h"));
        };

        let count: u32 = digits
            .trim()
            .parse()
            .map_err(|_| invalid("expected a whole number before the unit"))?;
        let minutes = count
            .checked_mul(scale)
            .ok_or_else(|| invalid("width overflows"))?;
        Self::from_minutes(minutes).map_err(|_| invalid("width must be between 1 minute and 1 day"))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.minutes % 60 == 0 {
            write!(f, "{}h", self.minutes / 60)
        } else {
            write!(f, "{}m", self.minutes)
        }
    }
}

/// Parses a comma-separated interval list such as `1m,5m,15m`.
pub fn parse_intervals(s: &str) -> Result<Vec<Interval>, OpenBellError> {
    let mut intervals = s
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(Interval::from_str)
        .collect::<Result<Vec<_>, _>>()?;
    intervals.sort();
    intervals.dedup();
    Ok(intervals)
}

/// Aggregates `bars` into midnight-aligned buckets of width `interval`.
///
/// open = first open, high = max high, low = min low, close = last close,
/// volume = sum. Fails on unsorted timestamps or malformed bars.
pub fn resample(bars: &[Bar], interval: Interval) -> Result<BarSeries, OpenBellError> {
    validate_bars(bars)?;

    let mut out: Vec<Bar> = Vec::new();
    let mut current_key: Option<NaiveDateTime> = None;

    for bar in bars {
        let key = interval.bucket_start(bar.ts);
        match (current_key, out.last_mut()) {
            (Some(k), Some(agg)) if k == key => {
                agg.high = agg.high.max(bar.high);
                agg.low = agg.low.min(bar.low);
                agg.close = bar.close;
                agg.volume += bar.volume;
            }
            _ => {
                out.push(Bar { ts: key, ..bar.clone() });
                current_key = Some(key);
            }
        }
    }

    Ok(BarSeries::from_validated(out))
}
