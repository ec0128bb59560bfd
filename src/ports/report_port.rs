//! Trade log output port trait.

use crate::domain::error::OpenBellError;
use crate::domain::trade::TradeLogEntry;
use std::path::Path;

/// Port for persisting the trade log of a backtest run.
pub trait ReportPort {
    fn write_trades(&self, log: &[TradeLogEntry], output_path: &Path) -> Result<(), OpenBellError>;
}
