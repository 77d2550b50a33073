//! Error types for dataset handle utilities.

use thiserror::Error;

/// Result type alias using TimeDecodeError.
pub type TimeResult<T> = Result<T, TimeDecodeError>;

/// Errors raised while interpreting CF-encoded time coordinates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimeDecodeError {
    #[error("missing 'units' attribute on time coordinate")]
    MissingUnits,

    #[error("invalid CF time units '{0}' (expected '<unit> since <reference date>')")]
    InvalidUnits(String),

    #[error("unsupported time unit '{0}'")]
    UnsupportedUnit(String),

    #[error("unsupported calendar '{0}'")]
    UnsupportedCalendar(String),

    #[error("invalid reference date '{0}'")]
    InvalidReferenceDate(String),

    #[error("time value {0} cannot be represented as a timestamp")]
    OutOfRange(f64),

    #[error("invalid ISO 8601 datetime '{0}'")]
    InvalidIso8601(String),

    #[error("time coordinate values were not loaded")]
    ValuesUnavailable,
}
