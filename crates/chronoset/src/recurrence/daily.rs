//! Every N days, or on selected weekdays, at fixed times of day.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::calendar::{
    add_days, next_matching_weekday, validate_week_days, DateRule, TimesOfDay, WeekSlots,
};
use crate::error::{ChronosetError, Result};
use crate::flags::WeekDays;

/// Which dates a daily recurrence lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DailySelection {
    /// Every `n` days, counted from the first occurrence.
    EveryDays(u32),
    /// Every date whose weekday is in the set.
    WeekDays(WeekDays),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "DailyRepr", into = "DailyRepr")]
pub struct DailyRecurrence {
    times_of_day: TimesOfDay,
    selection: DailySelection,
}

#[derive(Serialize, Deserialize)]
struct DailyRepr {
    times_of_day: TimesOfDay,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    week_days: Option<WeekDays>,
}

impl TryFrom<DailyRepr> for DailyRecurrence {
    type Error = ChronosetError;

    fn try_from(repr: DailyRepr) -> Result<Self> {
        let selection = match (repr.days, repr.week_days) {
            (Some(days), None) => DailySelection::EveryDays(days),
            (None, Some(week_days)) => DailySelection::WeekDays(week_days),
            (None, None) => DailySelection::EveryDays(1),
            (Some(_), Some(_)) => {
                return Err(ChronosetError::InvalidRecurrence(
                    "daily recurrence takes either `days` or `week_days`, not both".to_string(),
                ))
            }
        };
        Self::new(repr.times_of_day, selection)
    }
}

impl From<DailyRecurrence> for DailyRepr {
    fn from(daily: DailyRecurrence) -> Self {
        let (days, week_days) = match daily.selection {
            DailySelection::EveryDays(days) => (Some(days), None),
            DailySelection::WeekDays(week_days) => (None, Some(week_days)),
        };
        Self {
            times_of_day: daily.times_of_day,
            days,
            week_days,
        }
    }
}

impl DailyRecurrence {
    /// # Errors
    /// Returns `ChronosetError::InvalidRecurrence` for a zero day count or an
    /// empty/undefined weekday mask.
    pub fn new(times_of_day: TimesOfDay, selection: DailySelection) -> Result<Self> {
        match selection {
            DailySelection::EveryDays(0) => {
                return Err(ChronosetError::InvalidRecurrence(
                    "day count must be positive".to_string(),
                ))
            }
            DailySelection::EveryDays(_) => {}
            DailySelection::WeekDays(days) => validate_week_days(days)?,
        }
        Ok(Self {
            times_of_day,
            selection,
        })
    }

    pub fn every_days(times_of_day: TimesOfDay, days: u32) -> Result<Self> {
        Self::new(times_of_day, DailySelection::EveryDays(days))
    }

    pub fn on_week_days(times_of_day: TimesOfDay, week_days: WeekDays) -> Result<Self> {
        Self::new(times_of_day, DailySelection::WeekDays(week_days))
    }

    pub fn times_of_day(&self) -> &TimesOfDay {
        &self.times_of_day
    }

    pub fn selection(&self) -> DailySelection {
        self.selection
    }
}

impl DateRule for DailyRecurrence {
    fn first_date(&self, from: NaiveDate) -> Result<NaiveDate> {
        match self.selection {
            DailySelection::EveryDays(_) => Ok(from),
            DailySelection::WeekDays(days) => next_matching_weekday(from, days, true),
        }
    }

    fn next_date(&self, date: NaiveDate, _slots: &WeekSlots) -> Result<NaiveDate> {
        match self.selection {
            DailySelection::EveryDays(days) => add_days(date, i64::from(days)),
            DailySelection::WeekDays(week_days) => next_matching_weekday(date, week_days, false),
        }
    }
}

impl fmt::Display for DailyRecurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.selection {
            DailySelection::EveryDays(1) => write!(f, "daily")?,
            DailySelection::EveryDays(days) => write!(f, "every {days} days")?,
            DailySelection::WeekDays(days) => {
                write!(f, "daily on ")?;
                bitflags::parser::to_writer(&days, &mut *f)?;
            }
        }
        write!(f, " at {}", self.times_of_day)
    }
}
