use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("range start {start} is after end {end}")]
    Inverted {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("unknown range preset '{0}'")]
    UnknownPreset(String),

    #[error("start and end must be given together")]
    Incomplete,

    #[error("give either a preset or start and end, not both")]
    Conflicting,
}
