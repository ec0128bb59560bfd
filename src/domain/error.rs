//! Domain error types.

use chrono::NaiveDateTime;

/// Top-level error type for openbell.
#[derive(Debug, thiserror::Error)]
pub enum OpenBellError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid direction {value:?} (expected long or short)")]
    InvalidDirection { value: String },

    #[error("unknown stop-loss policy {value:?} (expected atr, structure or bar_range)")]
    UnknownPolicy { value: String },

    #[error("invalid interval {value:?}: {reason}")]
    InvalidInterval { value: String, reason: String },

    #[error("entry index {index} out of range for series of {len} bars")]
    EntryOutOfRange { index: usize, len: usize },

    #[error("{source_name} is missing required columns: {}", missing.join(", "))]
    InsufficientColumns {
        source_name: String,
        missing: Vec<String>,
    },

    #[error("timestamps not strictly increasing at {timestamp} (bar {index})")]
    NonMonotonicTimestamps {
        index: usize,
        timestamp: NaiveDateTime,
    },

    #[error("bar at {timestamp} violates low <= open,close <= high")]
    InvalidBar { timestamp: NaiveDateTime },

    #[error("data parse error in {source_name}: {reason}")]
    DataParse { source_name: String, reason: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&OpenBellError> for std::process::ExitCode {
    fn from(err: &OpenBellError) -> Self {
        let code: u8 = match err {
            OpenBellError::Io(_) | OpenBellError::Csv(_) => 1,
            OpenBellError::ConfigParse { .. }
            | OpenBellError::ConfigMissing { .. }
            | OpenBellError::ConfigInvalid { .. } => 2,
            OpenBellError::InvalidDirection { .. }
            | OpenBellError::UnknownPolicy { .. }
            | OpenBellError::InvalidInterval { .. }
            | OpenBellError::EntryOutOfRange { .. } => 3,
            OpenBellError::InsufficientColumns { .. }
            | OpenBellError::NonMonotonicTimestamps { .. }
            | OpenBellError::InvalidBar { .. } => 4,
            OpenBellError::DataParse { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
