//! Trade records and labels.

use super::error::OpenBellError;
use super::resample::Interval;
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1.0 for long, -1.0 for short.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

impl FromStr for Direction {
    type Err = OpenBellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "long" => Ok(Direction::Long),
            "short" => Ok(Direction::Short),
            _ => Err(OpenBellError::InvalidDirection {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Win,
    Loss,
    SessionEndClose,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Win => write!(f, "Win"),
            Outcome::Loss => write!(f, "Loss"),
            Outcome::SessionEndClose => write!(f, "SessionEndClose"),
        }
    }
}

/// A completed simulated trade.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub entry_time: NaiveDateTime,
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_price: f64,
    pub target_price: f64,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,
    pub outcome: Outcome,
    pub r_multiple: f64,
}

impl Trade {
    /// Initial risk per unit, |entry - stop|.
    pub fn risk(&self) -> f64 {
        (self.entry_price - self.stop_price).abs()
    }

    /// Signed exit minus entry, positive when the trade made money.
    pub fn pnl(&self) -> f64 {
        self.direction.sign() * (self.exit_price - self.entry_price)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StrategyKind {
    Momentum,
    Reversal,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Momentum => write!(f, "Momentum"),
            StrategyKind::Reversal => write!(f, "Reversal"),
        }
    }
}

/// A trade labelled with where it came from, as written to the trade log.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeLogEntry {
    pub date: NaiveDate,
    pub interval: Interval,
    pub strategy: StrategyKind,
    pub trade: Trade,
}
