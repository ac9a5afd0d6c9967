//! Selected weekdays of every N-th week, at fixed times of day.
//!
//! Weeks start on Sunday. The week of the first occurrence is the anchor:
//! each selected weekday recurs exactly `weeks` weeks after the date it last
//! landed on, and a weekday first reached in a later week than the anchor is
//! pushed to the next active week.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::calendar::{
    add_days, next_matching_weekday, validate_week_days, DateRule, TimesOfDay, WeekSlots,
};
use crate::error::{ChronosetError, Result};
use crate::flags::WeekDays;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "WeeklyRepr", into = "WeeklyRepr")]
pub struct WeeklyRecurrence {
    times_of_day: TimesOfDay,
    weeks: u32,
    week_days: WeekDays,
}

#[derive(Serialize, Deserialize)]
struct WeeklyRepr {
    times_of_day: TimesOfDay,
    #[serde(default = "one_week")]
    weeks: u32,
    week_days: WeekDays,
}

fn one_week() -> u32 {
    1
}

impl TryFrom<WeeklyRepr> for WeeklyRecurrence {
    type Error = ChronosetError;

    fn try_from(repr: WeeklyRepr) -> Result<Self> {
        Self::new(repr.times_of_day, repr.weeks, repr.week_days)
    }
}

impl From<WeeklyRecurrence> for WeeklyRepr {
    fn from(weekly: WeeklyRecurrence) -> Self {
        Self {
            times_of_day: weekly.times_of_day,
            weeks: weekly.weeks,
            week_days: weekly.week_days,
        }
    }
}

impl WeeklyRecurrence {
    /// # Errors
    /// Returns `ChronosetError::InvalidRecurrence` for a zero week count or an
    /// empty/undefined weekday mask.
    pub fn new(times_of_day: TimesOfDay, weeks: u32, week_days: WeekDays) -> Result<Self> {
        if weeks == 0 {
            return Err(ChronosetError::InvalidRecurrence(
                "week count must be positive".to_string(),
            ));
        }
        validate_week_days(week_days)?;
        Ok(Self {
            times_of_day,
            weeks,
            week_days,
        })
    }

    pub fn times_of_day(&self) -> &TimesOfDay {
        &self.times_of_day
    }

    pub fn weeks(&self) -> u32 {
        self.weeks
    }

    pub fn week_days(&self) -> WeekDays {
        self.week_days
    }

    fn period_days(&self) -> i64 {
        7 * i64::from(self.weeks)
    }
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - chrono::TimeDelta::days(i64::from(date.weekday().num_days_from_sunday()))
}

impl DateRule for WeeklyRecurrence {
    fn first_date(&self, from: NaiveDate) -> Result<NaiveDate> {
        next_matching_weekday(from, self.week_days, true)
    }

    fn next_date(&self, date: NaiveDate, slots: &WeekSlots) -> Result<NaiveDate> {
        let mut best: Option<NaiveDate> = None;
        for day in self.week_days.weekdays() {
            let slot = slots[day.num_days_from_sunday() as usize];
            let candidate = match slot {
                Some(last) => add_days(last, self.period_days())?,
                None => {
                    let first = next_matching_weekday(date, WeekDays::from_weekday(day), false)?;
                    if week_start(first) == week_start(date) {
                        first
                    } else {
                        add_days(first, self.period_days() - 7)?
                    }
                }
            };
            // A slot can lag behind `date` after the cursor restarts mid-week.
            let candidate = if candidate <= date {
                let behind = (date - candidate).num_days() / self.period_days() + 1;
                add_days(candidate, behind * self.period_days())?
            } else {
                candidate
            };
            best = Some(best.map_or(candidate, |b| b.min(candidate)));
        }
        best.ok_or_else(|| ChronosetError::InvalidRecurrence("no week days selected".to_string()))
    }
}

impl fmt::Display for WeeklyRecurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.weeks == 1 {
            write!(f, "weekly on ")?;
        } else {
            write!(f, "every {} weeks on ", self.weeks)?;
        }
        bitflags::parser::to_writer(&self.week_days, &mut *f)?;
        write!(f, " at {}", self.times_of_day)
    }
}
