//! Error taxonomy for the tracker core.
//!
//! The only genuinely fatal condition is a malformed threshold table, which is
//! rejected when the registry is built. Everything else in the read paths
//! degrades to "no data" results instead of surfacing an error.

/// Tracker domain errors
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// A breakpoint table failed validation at registry construction.
    #[error("invalid threshold table '{name}': {reason}")]
    InvalidThresholdTable { name: String, reason: String },

    /// A cumulative metric value was not a finite number.
    #[error("invalid value for metric '{metric}': not a finite number")]
    InvalidMetricValue { metric: String },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
