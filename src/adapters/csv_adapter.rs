//! CSV bar file adapter.
//!
//! Input files carry `ts_event,open,high,low,close,volume` columns in any order,
//! found by header name. `ts_event` is RFC 3339 with an offset and is
//! converted to wall-clock time in the configured timezone. An optional
//! `symbol` column filters rows when a symbol is set.
//!
//! When clocks fall back, the repeated local hour maps onto wall-clock times
//! already seen. Rows whose instant advances while their local time does not
//! are dropped with a warning so the series stays strictly increasing.

use crate::domain::bar::{Bar, BarSeries};
use crate::domain::error::OpenBellError;
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

const TS_COLUMN: &str = "ts_event";
const REQUIRED_COLUMNS: [&str; 6] = [TS_COLUMN, "open", "high", "low", "close", "volume"];
const NAIVE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct CsvBarAdapter {
    timezone: Tz,
    symbol: Option<String>,
}

/// A parsed `ts_event`. `instant` is absent for timestamps without an offset.
#[derive(Debug, Clone, Copy)]
struct Stamp {
    local: NaiveDateTime,
    instant: Option<DateTime<Utc>>,
}

impl Stamp {
    /// True when `self` comes later in real time than `prev` but not later on
    /// the local clock.
    fn repeats_local_time(&self, prev: &Stamp) -> bool {
        match (prev.instant, self.instant) {
            (Some(before), Some(now)) => now > before && self.local <= prev.local,
            _ => false,
        }
    }
}

/// Column positions resolved from the header row.
struct Columns {
    ts: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
    symbol: Option<usize>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord, source_name: &str) -> Result<Self, OpenBellError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };

        let missing: Vec<String> = REQUIRED_COLUMNS
            .into_iter()
            .filter(|&name| find(name).is_none())
            .map(|name| name.to_string())
            .collect();

        match (
            find(TS_COLUMN),
            find("open"),
            find("high"),
            find("low"),
            find("close"),
            find("volume"),
        ) {
            (Some(ts), Some(open), Some(high), Some(low), Some(close), Some(volume)) => Ok(Self {
                ts,
                open,
                high,
                low,
                close,
                volume,
                symbol: find("symbol"),
            }),
            _ => Err(OpenBellError::InsufficientColumns {
                source_name: source_name.to_string(),
                missing,
            }),
        }
    }
}

impl CsvBarAdapter {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            symbol: None,
        }
    }

    pub fn with_symbol(mut self, symbol: Option<String>) -> Self {
        self.symbol = symbol;
        self
    }

    /// Parses an RFC 3339 timestamp into local time. A timestamp without an
    /// offset is taken as already local.
    fn parse_ts(&self, raw: &str) -> Option<Stamp> {
        let raw = raw.trim();
        match DateTime::parse_from_rfc3339(raw) {
            Ok(dt) => Some(Stamp {
                local: dt.with_timezone(&self.timezone).naive_local(),
                instant: Some(dt.with_timezone(&Utc)),
            }),
            Err(_) => NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT)
                .ok()
                .map(|local| Stamp {
                    local,
                    instant: None,
                }),
        }
    }

    /// Writes `series` with `ts_event` as RFC 3339 in this adapter's timezone.
    pub fn write_bars(&self, series: &BarSeries, path: &Path) -> Result<(), OpenBellError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record(REQUIRED_COLUMNS)?;
        for bar in series.bars() {
            let ts = self
                .timezone
                .from_local_datetime(&bar.ts)
                .earliest()
                .ok_or_else(|| OpenBellError::DataParse {
                    source_name: path.display().to_string(),
                    reason: format!("{} does not exist in {}", bar.ts, self.timezone),
                })?;
            wtr.write_record([
                ts.to_rfc3339(),
                bar.open.to_string(),
                bar.high.to_string(),
                bar.low.to_string(),
                bar.close.to_string(),
                bar.volume.to_string(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn field<'r>(record: &'r csv::StringRecord, index: usize) -> &'r str {
    record.get(index).unwrap_or("").trim()
}

impl DataPort for CsvBarAdapter {
    fn load_bars(&self, source: &Path) -> Result<Vec<Bar>, OpenBellError> {
        let source_name = source.display().to_string();
        let mut rdr = csv::Reader::from_path(source)?;
        let columns = Columns::resolve(rdr.headers()?, &source_name)?;

        let parse_error = |row: usize, reason: String| OpenBellError::DataParse {
            source_name: source_name.clone(),
            reason: format!("row {row}: {reason}"),
        };

        let mut bars = Vec::new();
        let mut last_kept: Option<Stamp> = None;
        let mut repeated = 0usize;
        for (i, result) in rdr.records().enumerate() {
            let record = result?;
            let row = i + 2;

            if let (Some(want), Some(col)) = (&self.symbol, columns.symbol) {
                if field(&record, col) != want.as_str() {
                    continue;
                }
            }

            let ts_raw = field(&record, columns.ts);
            let stamp = self
                .parse_ts(ts_raw)
                .ok_or_else(|| parse_error(row, format!("invalid {TS_COLUMN} {ts_raw:?}")))?;
            if last_kept.is_some_and(|prev| stamp.repeats_local_time(&prev)) {
                repeated += 1;
                continue;
            }

            let price = |col: usize, name: &str| -> Result<f64, OpenBellError> {
                let raw = field(&record, col);
                raw.parse::<f64>()
                    .map_err(|e| parse_error(row, format!("invalid {name} value {raw:?}: {e}")))
            };
            let open = price(columns.open, "open")?;
            let high = price(columns.high, "high")?;
            let low = price(columns.low, "low")?;
            let close = price(columns.close, "close")?;

            let volume_raw = field(&record, columns.volume);
            let volume = volume_raw
                .parse::<i64>()
                .or_else(|_| volume_raw.parse::<f64>().map(|v| v.round() as i64))
                .map_err(|e| parse_error(row, format!("invalid volume value {volume_raw:?}: {e}")))?;

            last_kept = Some(stamp);
            bars.push(Bar {
                ts: stamp.local,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        if repeated > 0 {
            warn!(
                source = %source_name,
                rows = repeated,
                timezone = %self.timezone,
                "dropped rows repeating local time after a clock change"
            );
        }
        debug!(source = %source_name, bars = bars.len(), "loaded bars");
        Ok(bars)
    }
}
