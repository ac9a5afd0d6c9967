//! DST transition policies for recurring schedules.

use serde::{Deserialize, Serialize};

/// What to do with an occurrence whose local reading falls in a
/// spring-forward gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidTimeBehavior {
    /// Move the reading forward by the size of the gap (02:30 becomes 03:30).
    #[default]
    Shift,
    /// Drop the occurrence and move on to the next one.
    Skip,
}

/// Which instant to use for a local reading that occurs twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguousTimeBehavior {
    /// The second pass, after clocks fell back.
    #[default]
    StandardTime,
    /// The first pass, before clocks fell back.
    DaylightTime,
}

/// The pair of DST policies a recurrence applies to its occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecurrenceBehavior {
    pub invalid_time: InvalidTimeBehavior,
    pub ambiguous_time: AmbiguousTimeBehavior,
}

impl RecurrenceBehavior {
    pub fn new(invalid_time: InvalidTimeBehavior, ambiguous_time: AmbiguousTimeBehavior) -> Self {
        Self {
            invalid_time,
            ambiguous_time,
        }
    }
}
