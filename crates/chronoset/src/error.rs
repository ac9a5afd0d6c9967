//! Error types for interval algebra and recurrence scheduling.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChronosetError {
    #[error("Invalid bound: {0}")]
    InvalidBound(String),

    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    #[error("Invalid flag value: {0}")]
    InvalidFlag(String),

    #[error("Invalid recurrence: {0}")]
    InvalidRecurrence(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid time of day: {0}")]
    InvalidTimeOfDay(String),

    /// A local clock reading that does not exist in the active timezone.
    #[error("Invalid local time: {0}")]
    InvalidTime(String),

    #[error("Date arithmetic out of range: {0}")]
    OutOfRange(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, ChronosetError>;
