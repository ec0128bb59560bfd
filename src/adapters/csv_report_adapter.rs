//! CSV trade log writer.

use crate::domain::error::OpenBellError;
use crate::domain::trade::TradeLogEntry;
use crate::ports::report_port::ReportPort;
use std::fs;
use std::path::Path;

pub const TRADE_LOG_HEADER: [&str; 12] = [
    "date",
    "interval",
    "strategy",
    "direction",
    "entry_time",
    "entry_price",
    "stop_price",
    "target_price",
    "exit_time",
    "exit_price",
    "outcome",
    "r_multiple",
];

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Writes one row per trade, in the order given.
#[derive(Debug, Default)]
pub struct CsvTradeLogWriter;

impl CsvTradeLogWriter {
    pub fn new() -> Self {
        Self
    }

    fn row(entry: &TradeLogEntry) -> [String; 12] {
        let t = &entry.trade;
        [
            entry.date.format("%Y-%m-%d").to_string(),
            entry.interval.to_string(),
            entry.strategy.to_string(),
            t.direction.to_string(),
            t.entry_time.format(TIME_FORMAT).to_string(),
            format!("{:.4}", t.entry_price),
            format!("{:.4}", t.stop_price),
            format!("{:.4}", t.target_price),
            t.exit_time.format(TIME_FORMAT).to_string(),
            format!("{:.4}", t.exit_price),
            t.outcome.to_string(),
            format!("{:.4}", t.r_multiple),
        ]
    }
}

impl ReportPort for CsvTradeLogWriter {
    fn write_trades(&self, log: &[TradeLogEntry], output_path: &Path) -> Result<(), OpenBellError> {
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut wtr = csv::Writer::from_path(output_path)?;
        wtr.write_record(TRADE_LOG_HEADER)?;
        for entry in log {
            wtr.write_record(Self::row(entry))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::resample::Interval;
    use crate::domain::trade::{Direction, Outcome, StrategyKind, Trade};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample_entry() -> TradeLogEntry {
        let day = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        TradeLogEntry {
            date: day,
            interval: Interval::from_minutes(5).unwrap(),
            strategy: StrategyKind::Momentum,
            trade: Trade {
                entry_time: day.and_hms_opt(9, 40, 0).unwrap(),
                direction: Direction::Long,
                entry_price: 100.0,
                stop_price: 98.0,
                target_price: 103.0,
                exit_time: day.and_hms_opt(9, 50, 0).unwrap(),
                exit_price: 103.0,
                outcome: Outcome::Win,
                r_multiple: 1.5,
            },
        }
    }

    #[test]
    fn writes_header_and_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("trades.csv");

        CsvTradeLogWriter::new()
            .write_trades(&[sample_entry()], &path)
            .unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, TRADE_LOG_HEADER);

        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(&row[0], "2025-05-01");
        assert_eq!(&row[1], "5m");
        assert_eq!(&row[2], "Momentum");
        assert_eq!(&row[3], "long");
        assert_eq!(&row[4], "2025-05-01 09:40:00");
        assert_eq!(&row[7], "103.0000");
        assert_eq!(&row[10], "Win");
        assert_eq!(&row[11], "1.5000");
    }

    #[test]
    fn empty_log_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trades.csv");

        CsvTradeLogWriter::new().write_trades(&[], &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim(), TRADE_LOG_HEADER.join(","));
    }
}
