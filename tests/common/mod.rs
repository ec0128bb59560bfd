#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use openbell::domain::bar::{Bar, BarSeries};
use openbell::domain::error::OpenBellError;
use openbell::domain::trade::TradeLogEntry;
use openbell::ports::data_port::DataPort;
use openbell::ports::report_port::ReportPort;
use std::cell::RefCell;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Serves fixed bars regardless of the path asked for.
pub struct MockDataPort {
    pub bars: Vec<Bar>,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self { bars, error: None }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            bars: Vec::new(),
            error: Some(reason.to_string()),
        }
    }
}

impl DataPort for MockDataPort {
    fn load_bars(&self, source: &Path) -> Result<Vec<Bar>, OpenBellError> {
        match &self.error {
            Some(reason) => Err(OpenBellError::DataParse {
                source_name: source.display().to_string(),
                reason: reason.clone(),
            }),
            None => Ok(self.bars.clone()),
        }
    }
}

/// Captures written trade logs instead of touching disk.
#[derive(Default)]
pub struct MockReportPort {
    pub written: RefCell<Vec<(PathBuf, Vec<TradeLogEntry>)>>,
}

impl ReportPort for MockReportPort {
    fn write_trades(&self, log: &[TradeLogEntry], output_path: &Path) -> Result<(), OpenBellError> {
        self.written
            .borrow_mut()
            .push((output_path.to_path_buf(), log.to_vec()));
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(day: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
    day.and_hms_opt(h, m, 0).unwrap()
}

pub fn make_bar(ts: NaiveDateTime, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        ts,
        open,
        high,
        low,
        close,
        volume: 1_000,
    }
}

/// Consecutive bars `step` minutes apart starting at `start`.
pub fn make_bars(
    start: NaiveDateTime,
    step: i64,
    rows: &[(f64, f64, f64, f64)],
) -> Vec<Bar> {
    rows.iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| make_bar(start + Duration::minutes(step * i as i64), o, h, l, c))
        .collect()
}

pub fn make_series(start: NaiveDateTime, step: i64, rows: &[(f64, f64, f64, f64)]) -> BarSeries {
    BarSeries::new(make_bars(start, step, rows)).unwrap()
}

/// Flat 1-minute filler bars, useful as ATR warm-up.
pub fn flat_bars(start: NaiveDateTime, count: usize, price: f64, half_range: f64) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            make_bar(
                start + Duration::minutes(i as i64),
                price,
                price + half_range,
                price - half_range,
                price,
            )
        })
        .collect()
}

pub fn write_temp(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Renders bars as an input CSV with UTC `ts_event`, assuming New York in EDT.
pub fn bars_to_csv(bars: &[Bar]) -> String {
    let mut out = String::from("ts_event,open,high,low,close,volume,symbol\n");
    for b in bars {
        let utc = b.ts + Duration::hours(4);
        out.push_str(&format!(
            "{}Z,{},{},{},{},{},SPY\n",
            utc.format("%Y-%m-%dT%H:%M:%S"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    out
}
