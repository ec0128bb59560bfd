//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::adapters::csv_adapter::CsvBarAdapter;
use crate::adapters::csv_report_adapter::CsvTradeLogWriter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::run_backtest;
use crate::domain::config_validation::{
    parse_timezone, validate_config, RunSettings, DEFAULT_TIMEZONE,
};
use crate::domain::error::OpenBellError;
use crate::domain::metrics::MetricsReport;
use crate::domain::resample::{resample, Interval};
use crate::domain::strategy::StrategyParams;
use crate::domain::trade::TradeLogEntry;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

const DEFAULT_OUTPUT: &str = "trades.csv";

#[derive(Parser, Debug)]
#[command(name = "openbell", about = "Opening-bell intraday strategy backtester")]
pub struct Cli {
    /// Log filter when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run both strategies over every configured interval
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// 1-minute bar CSV, overrides [data] path
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Trade log CSV, overrides [backtest] output
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Resample a 1-minute bar CSV to a wider interval
    Resample {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long)]
        interval: String,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        timezone: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Installs the stderr fmt subscriber. `RUST_LOG` wins over `level`.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_backtest_command(&config, data.as_deref(), output.as_deref())
            }
        }
        Command::Resample {
            input,
            interval,
            output,
            timezone,
        } => run_resample(&input, &interval, &output, timezone.as_deref()),
        Command::Validate { config } => run_validate(&config),
    }
}

fn fail(err: &OpenBellError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_settings(path: &Path) -> Result<RunSettings, OpenBellError> {
    let adapter = FileConfigAdapter::from_file(path)?;
    validate_config(&adapter)
}

fn run_backtest_command(
    config_path: &Path,
    data_override: Option<&Path>,
    output_override: Option<&Path>,
) -> ExitCode {
    // Stage 1: load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    // Stage 2: resolve input and output paths
    let data_path = match data_override
        .map(Path::to_path_buf)
        .or_else(|| settings.data.path.as_ref().map(PathBuf::from))
    {
        Some(p) => p,
        None => {
            return fail(&OpenBellError::ConfigMissing {
                section: "data".into(),
                key: "path".into(),
            })
        }
    };
    let output_path = output_override
        .map(Path::to_path_buf)
        .or_else(|| settings.data.output.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    let data_port =
        CsvBarAdapter::new(settings.data.timezone).with_symbol(settings.data.symbol.clone());
    let report_port = CsvTradeLogWriter::new();

    run_backtest_pipeline(&data_port, &report_port, &settings, &data_path, &output_path)
}

/// Stages 3-6: load bars, run every interval, print metrics, write the log.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    settings: &RunSettings,
    data_path: &Path,
    output_path: &Path,
) -> ExitCode {
    // Stage 3: load raw bars
    eprintln!("Loading bars from {}", data_path.display());
    let bars = match data_port.load_bars(data_path) {
        Ok(b) => b,
        Err(e) => return fail(&e),
    };
    if bars.is_empty() {
        eprintln!("warning: {} contains no bars", data_path.display());
    }

    // Stage 4: run
    let config = &settings.backtest;
    eprintln!(
        "Running backtest: {} bars, intervals {}",
        bars.len(),
        format_intervals(&config.intervals)
    );
    info!(bars = bars.len(), intervals = config.intervals.len(), "backtest started");
    let log = run_backtest(&bars, config);

    // Stage 5: console summary
    print_summary(&log);

    // Stage 6: trade log
    match report_port.write_trades(&log, output_path) {
        Ok(()) => {
            eprintln!("\nTrade log written to: {}", output_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn format_intervals(intervals: &[Interval]) -> String {
    intervals
        .iter()
        .map(Interval::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn print_metrics(label: &str, m: &MetricsReport) {
    eprintln!(
        "  {:<10} {:>4} trades  {:>5.1}% win  avg {:>6.2}R  total {:>7.2}R  PF {:>5.2}  max DD {:.2}R ({:.1}%)",
        label,
        m.total_trades,
        m.win_rate,
        m.avg_r_multiple,
        m.total_r_multiple,
        m.profit_factor,
        m.max_drawdown,
        m.max_drawdown_pct,
    );
}

pub fn print_summary(log: &[TradeLogEntry]) {
    let overall = MetricsReport::compute(log.iter().map(|e| &e.trade));

    eprintln!("\n=== Aggregate Results ===");
    eprintln!("Total Trades:     {}", overall.total_trades);
    eprintln!("Wins / Losses:    {} / {}", overall.winning_trades, overall.losing_trades);
    eprintln!("Win Rate:         {:.1}%", overall.win_rate);
    eprintln!("Avg R:            {:.2}", overall.avg_r_multiple);
    eprintln!("Total R:          {:.2}", overall.total_r_multiple);
    eprintln!("Avg Win / Loss:   {:.2}R / {:.2}R", overall.avg_win_r, overall.avg_loss_r);
    eprintln!("Profit Factor:    {:.2}", overall.profit_factor);
    eprintln!(
        "Max Drawdown:     {:.2}R ({:.1}%)",
        overall.max_drawdown, overall.max_drawdown_pct
    );

    if log.is_empty() {
        return;
    }

    eprintln!("\n=== Per-Strategy Summary ===");
    for (kind, m) in MetricsReport::by_strategy(log) {
        print_metrics(&kind.to_string(), &m);
    }

    eprintln!("\n=== Per-Interval Summary ===");
    for (interval, m) in MetricsReport::by_interval(log) {
        print_metrics(&interval.to_string(), &m);
    }
}

fn print_strategy(name: &str, params: &StrategyParams) {
    eprintln!(
        "  {name}: stop_loss = {:?}, target = {}R",
        params.stop_loss, params.target_r_multiple
    );
}

pub fn run_dry_run(config_path: &Path) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    eprintln!("Config validated successfully");

    let data = &settings.data;
    let config = &settings.backtest;
    eprintln!("\nData:");
    eprintln!(
        "  path:     {}",
        data.path.as_deref().unwrap_or("(none, use --data)")
    );
    eprintln!("  symbol:   {}", data.symbol.as_deref().unwrap_or("(all rows)"));
    eprintln!("  timezone: {}", data.timezone);

    eprintln!("\nSession:");
    eprintln!("  open:     {}", config.momentum.open_time);
    eprintln!("  window:   {} - {}", config.session.start, config.session.end);
    eprintln!("  intervals: {}", format_intervals(&config.intervals));

    eprintln!("\nStrategies:");
    print_strategy("momentum", &config.momentum);
    print_strategy("reversal", &config.reversal.base);
    eprintln!("  reversal flush_min_range_pct = {}", config.reversal.flush_min_range_pct);

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    match load_settings(config_path) {
        Ok(_) => {
            eprintln!("Configuration is valid.");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_resample(input: &Path, interval: &str, output: &Path, timezone: Option<&str>) -> ExitCode {
    let interval: Interval = match interval.parse() {
        Ok(i) => i,
        Err(e) => return fail(&e),
    };
    let tz = match timezone {
        Some(name) => match parse_timezone(name) {
            Ok(tz) => tz,
            Err(reason) => {
                return fail(&OpenBellError::ConfigInvalid {
                    section: "cli".into(),
                    key: "timezone".into(),
                    reason,
                })
            }
        },
        None => DEFAULT_TIMEZONE,
    };

    let adapter = CsvBarAdapter::new(tz);
    eprintln!("Loading bars from {}", input.display());
    let result = adapter
        .load_bars(input)
        .and_then(|bars| resample(&bars, interval))
        .and_then(|series| {
            adapter.write_bars(&series, output)?;
            Ok(series.len())
        });

    match result {
        Ok(n) => {
            eprintln!("Wrote {n} {interval} bars to {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}
