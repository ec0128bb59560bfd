//! Configuration validation.
//!
//! Turns INI settings into typed run parameters. Every field is checked here,
//! before any market data is read, so a bad knob fails the run up front.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::OpenBellError;
use crate::domain::resample::{parse_intervals, Interval};
use crate::domain::session::SessionWindow;
use crate::domain::stop_loss::{StopLossParams, StopLossPolicy};
use crate::domain::strategy::{ReversalParams, StrategyParams};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveTime;
use chrono_tz::Tz;

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::New_York;

/// Where to read bars from and write trades to.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub path: Option<String>,
    pub symbol: Option<String>,
    pub timezone: Tz,
    pub output: Option<String>,
}

/// Everything a run needs, fully validated.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub data: DataSettings,
    pub backtest: BacktestConfig,
}

pub fn validate_config(config: &dyn ConfigPort) -> Result<RunSettings, OpenBellError> {
    Ok(RunSettings {
        data: validate_data(config)?,
        backtest: validate_backtest_config(config)?,
    })
}

pub fn validate_data(config: &dyn ConfigPort) -> Result<DataSettings, OpenBellError> {
    let timezone = match non_empty(config, "data", "timezone") {
        Some(name) => parse_timezone(&name).map_err(|reason| invalid("data", "timezone", reason))?,
        None => DEFAULT_TIMEZONE,
    };
    Ok(DataSettings {
        path: non_empty(config, "data", "path"),
        symbol: non_empty(config, "data", "symbol"),
        timezone,
        output: non_empty(config, "backtest", "output"),
    })
}

pub fn parse_timezone(name: &str) -> Result<Tz, String> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| format!("unknown IANA timezone {name:?}"))
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, OpenBellError> {
    let defaults = BacktestConfig::default();

    let open_time = parse_time(config, "session", "open_time", defaults.momentum.open_time)?;
    let session = validate_session(config, open_time)?;
    let intervals = validate_intervals(config, defaults.intervals)?;

    let momentum = validate_strategy(config, "momentum", open_time, &defaults.momentum)?;
    let reversal = ReversalParams {
        base: validate_strategy(config, "reversal", open_time, &defaults.reversal.base)?,
        flush_min_range_pct: validate_flush_pct(config, defaults.reversal.flush_min_range_pct)?,
    };

    Ok(BacktestConfig {
        session,
        intervals,
        momentum,
        reversal,
    })
}

fn validate_session(
    config: &dyn ConfigPort,
    open_time: NaiveTime,
) -> Result<SessionWindow, OpenBellError> {
    let default = SessionWindow::default();
    let start = parse_time(config, "session", "start", default.start)?;
    let end = parse_time(config, "session", "end", default.end)?;

    if start >= end {
        return Err(invalid("session", "start", "start must be before end".to_string()));
    }
    let window = SessionWindow::new(start, end);
    if !window.contains(open_time) {
        return Err(invalid(
            "session",
            "open_time",
            format!("open_time {open_time} is outside the session {start}-{end}"),
        ));
    }
    Ok(window)
}

fn validate_intervals(
    config: &dyn ConfigPort,
    default: Vec<Interval>,
) -> Result<Vec<Interval>, OpenBellError> {
    let Some(raw) = non_empty(config, "backtest", "intervals") else {
        return Ok(default);
    };
    let intervals = parse_intervals(&raw)?;
    if intervals.is_empty() {
        return Err(OpenBellError::ConfigMissing {
            section: "backtest".to_string(),
            key: "intervals".to_string(),
        });
    }
    Ok(intervals)
}

fn validate_strategy(
    config: &dyn ConfigPort,
    section: &str,
    open_time: NaiveTime,
    defaults: &StrategyParams,
) -> Result<StrategyParams, OpenBellError> {
    let (default_period, default_multiplier) = match defaults.stop_loss {
        StopLossPolicy::Atr { period, multiplier } => (period, multiplier),
        _ => (14, 2.0),
    };
    let base = StopLossParams::default();

    let atr_period = config.get_int(section, "atr_period", default_period as i64)?;
    if atr_period < 1 {
        return Err(invalid(section, "atr_period", "atr_period must be at least 1".to_string()));
    }
    let atr_multiplier = positive(config, section, "atr_multiplier", default_multiplier)?;

    let structure_lookback =
        config.get_int(section, "structure_lookback", base.structure_lookback as i64)?;
    if structure_lookback < 1 {
        return Err(invalid(
            section,
            "structure_lookback",
            "structure_lookback must be at least 1".to_string(),
        ));
    }
    let bar_range_fraction = positive(config, section, "bar_range_fraction", base.bar_range_fraction)?;

    let params = StopLossParams {
        atr_period: atr_period as usize,
        atr_multiplier,
        structure_lookback: structure_lookback as usize,
        bar_range_fraction,
    };
    let stop_loss = match non_empty(config, section, "stop_loss") {
        Some(tag) => StopLossPolicy::from_tag(&tag, &params)?,
        None => StopLossPolicy::from_tag(defaults.stop_loss.tag(), &params)?,
    };

    let target_r_multiple = positive(config, section, "target_r_multiple", defaults.target_r_multiple)?;

    Ok(StrategyParams {
        open_time,
        stop_loss,
        target_r_multiple,
    })
}

fn validate_flush_pct(config: &dyn ConfigPort, default: f64) -> Result<f64, OpenBellError> {
    let value = config.get_double("reversal", "flush_min_range_pct", default)?;
    if value <= 0.0 || value > 1.0 {
        return Err(invalid(
            "reversal",
            "flush_min_range_pct",
            "flush_min_range_pct must be in (0, 1]".to_string(),
        ));
    }
    Ok(value)
}

fn positive(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, OpenBellError> {
    let value = config.get_double(section, key, default)?;
    if !(value > 0.0 && value.is_finite()) {
        return Err(invalid(section, key, format!("{key} must be positive")));
    }
    Ok(value)
}

fn parse_time(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: NaiveTime,
) -> Result<NaiveTime, OpenBellError> {
    match non_empty(config, section, key) {
        None => Ok(default),
        Some(s) => NaiveTime::parse_from_str(&s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&s, "%H:%M:%S"))
            .map_err(|_| invalid(section, key, format!("invalid time {s:?}, expected HH:MM"))),
    }
}

fn non_empty(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn invalid(section: &str, key: &str, reason: String) -> OpenBellError {
    OpenBellError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason,
    }
}
