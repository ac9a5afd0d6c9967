//! A fixed day of the month, or weekdays at a given week position, in
//! selected months, at fixed times of day.

use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::calendar::{validate_week_days, DateRule, TimesOfDay, WeekSlots};
use crate::error::{ChronosetError, Result};
use crate::flags::{continuous_run_start, Months, WeekDays};

/// Months scanned before giving up on finding a qualifying date: one full
/// Gregorian cycle, enough for February 29th.
const MAX_MONTHS: u32 = 12 * 400;

/// Which occurrence of a weekday within its month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekPosition {
    First,
    Second,
    Third,
    Fourth,
    Last,
}

impl WeekPosition {
    fn ordinal(self) -> Option<u32> {
        match self {
            WeekPosition::First => Some(1),
            WeekPosition::Second => Some(2),
            WeekPosition::Third => Some(3),
            WeekPosition::Fourth => Some(4),
            WeekPosition::Last => None,
        }
    }
}

/// Weekdays at a week position, e.g. "second Tuesday and Thursday".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeekDaysOfMonth {
    pub position: WeekPosition,
    pub week_days: WeekDays,
    /// Land on a single date per month -- the first of the selected weekdays
    /// at that position -- instead of on every one of them.
    #[serde(default)]
    pub any_week_days: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonthlySelection {
    DayOfMonth(u32),
    WeekDaysOfMonth(WeekDaysOfMonth),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "MonthlyRepr", into = "MonthlyRepr")]
pub struct MonthlyRecurrence {
    times_of_day: TimesOfDay,
    selection: MonthlySelection,
    months: Months,
}

#[derive(Serialize, Deserialize)]
struct MonthlyRepr {
    times_of_day: TimesOfDay,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    day_of_month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    week_days_of_month: Option<WeekDaysOfMonth>,
    #[serde(default = "all_months")]
    months: Months,
}

fn all_months() -> Months {
    Months::ALL_YEAR
}

impl TryFrom<MonthlyRepr> for MonthlyRecurrence {
    type Error = ChronosetError;

    fn try_from(repr: MonthlyRepr) -> Result<Self> {
        let selection = match (repr.day_of_month, repr.week_days_of_month) {
            (Some(day), None) => MonthlySelection::DayOfMonth(day),
            (None, Some(week_days)) => MonthlySelection::WeekDaysOfMonth(week_days),
            _ => {
                return Err(ChronosetError::InvalidRecurrence(
                    "monthly recurrence takes exactly one of `day_of_month` or `week_days_of_month`"
                        .to_string(),
                ))
            }
        };
        Self::new(repr.times_of_day, selection, repr.months)
    }
}

impl From<MonthlyRecurrence> for MonthlyRepr {
    fn from(monthly: MonthlyRecurrence) -> Self {
        let (day_of_month, week_days_of_month) = match monthly.selection {
            MonthlySelection::DayOfMonth(day) => (Some(day), None),
            MonthlySelection::WeekDaysOfMonth(w) => (None, Some(w)),
        };
        Self {
            times_of_day: monthly.times_of_day,
            day_of_month,
            week_days_of_month,
            months: monthly.months,
        }
    }
}

impl MonthlyRecurrence {
    /// # Errors
    /// Returns `ChronosetError::InvalidRecurrence` for an empty/undefined
    /// month or weekday mask, or a day of month that none of the selected
    /// months has.
    pub fn new(
        times_of_day: TimesOfDay,
        selection: MonthlySelection,
        months: Months,
    ) -> Result<Self> {
        if months.is_empty() || Months::from_bits(months.bits()).is_none() {
            return Err(ChronosetError::InvalidRecurrence(format!(
                "months must name at least one month, got {:#b}",
                months.bits()
            )));
        }
        match selection {
            MonthlySelection::DayOfMonth(day) => {
                let longest = months
                    .months()
                    .into_iter()
                    .map(max_days_in_month)
                    .max()
                    .unwrap_or(0);
                if day == 0 || day > longest {
                    return Err(ChronosetError::InvalidRecurrence(format!(
                        "day {day} does not exist in the selected months (at most {longest} days)"
                    )));
                }
            }
            MonthlySelection::WeekDaysOfMonth(w) => validate_week_days(w.week_days)?,
        }
        Ok(Self {
            times_of_day,
            selection,
            months,
        })
    }

    pub fn on_day(times_of_day: TimesOfDay, day: u32, months: Months) -> Result<Self> {
        Self::new(times_of_day, MonthlySelection::DayOfMonth(day), months)
    }

    pub fn on_week_days(
        times_of_day: TimesOfDay,
        week_days_of_month: WeekDaysOfMonth,
        months: Months,
    ) -> Result<Self> {
        Self::new(
            times_of_day,
            MonthlySelection::WeekDaysOfMonth(week_days_of_month),
            months,
        )
    }

    pub fn times_of_day(&self) -> &TimesOfDay {
        &self.times_of_day
    }

    pub fn selection(&self) -> MonthlySelection {
        self.selection
    }

    pub fn months(&self) -> Months {
        self.months
    }

    /// The qualifying dates of one month, ascending. Empty when the month is
    /// not selected or lacks the requested day.
    pub fn dates_in_month(&self, year: i32, month: u32) -> Vec<NaiveDate> {
        if !self.months.contains_month(month) {
            return Vec::new();
        }
        match self.selection {
            MonthlySelection::DayOfMonth(day) => {
                NaiveDate::from_ymd_opt(year, month, day).into_iter().collect()
            }
            MonthlySelection::WeekDaysOfMonth(w) => week_position_dates(year, month, w),
        }
    }

    /// First qualifying date after `date` (or on it, when `inclusive`).
    fn scan(&self, date: NaiveDate, inclusive: bool) -> Result<NaiveDate> {
        let (mut year, mut month) = (date.year(), date.month());
        for _ in 0..MAX_MONTHS {
            let found = self
                .dates_in_month(year, month)
                .into_iter()
                .find(|d| if inclusive { *d >= date } else { *d > date });
            if let Some(found) = found {
                return Ok(found);
            }
            (year, month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
        }
        Err(ChronosetError::OutOfRange(format!(
            "no qualifying date within {MAX_MONTHS} months of {date}"
        )))
    }
}

fn max_days_in_month(month: u32) -> u32 {
    match month {
        2 => 29,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u32) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, u8::try_from(n).ok()?)
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let last = last_day_of_month(year, month)?;
    let back = (7 + last.weekday().num_days_from_sunday() - weekday.num_days_from_sunday()) % 7;
    last.checked_sub_days(chrono::Days::new(u64::from(back)))
}

fn weekday_at(
    year: i32,
    month: u32,
    weekday: Weekday,
    position: WeekPosition,
) -> Option<NaiveDate> {
    match position.ordinal() {
        Some(n) => nth_weekday(year, month, weekday, n),
        None => last_weekday(year, month, weekday),
    }
}

fn week_position_dates(year: i32, month: u32, w: WeekDaysOfMonth) -> Vec<NaiveDate> {
    if !w.any_week_days {
        let mut dates: Vec<NaiveDate> = w
            .week_days
            .weekdays()
            .into_iter()
            .filter_map(|day| weekday_at(year, month, day, w.position))
            .collect();
        dates.sort();
        return dates;
    }

    if w.position == WeekPosition::Last {
        // The last week is only well defined when the weekdays form one run;
        // otherwise fall back to the fourth week.
        if let Some(start) = continuous_run_start(w.week_days) {
            let start_day = start.weekdays().into_iter().next();
            return start_day
                .and_then(|day| last_weekday(year, month, day))
                .into_iter()
                .collect();
        }
        return earliest_at(year, month, w.week_days, WeekPosition::Fourth);
    }
    earliest_at(year, month, w.week_days, w.position)
}

fn earliest_at(year: i32, month: u32, days: WeekDays, position: WeekPosition) -> Vec<NaiveDate> {
    days.weekdays()
        .into_iter()
        .filter_map(|day| weekday_at(year, month, day, position))
        .min()
        .into_iter()
        .collect()
}

impl DateRule for MonthlyRecurrence {
    fn first_date(&self, from: NaiveDate) -> Result<NaiveDate> {
        self.scan(from, true)
    }

    fn next_date(&self, date: NaiveDate, _slots: &WeekSlots) -> Result<NaiveDate> {
        self.scan(date, false)
    }
}

impl fmt::Display for MonthlyRecurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.selection {
            MonthlySelection::DayOfMonth(day) => write!(f, "monthly on day {day}")?,
            MonthlySelection::WeekDaysOfMonth(w) => {
                write!(f, "monthly on the {:?} ", w.position)?;
                bitflags::parser::to_writer(&w.week_days, &mut *f)?;
                if w.any_week_days {
                    write!(f, " (any)")?;
                }
            }
        }
        if self.months != Months::ALL_YEAR {
            write!(f, " of ")?;
            bitflags::parser::to_writer(&self.months, &mut *f)?;
        }
        write!(f, " at {}", self.times_of_day)
    }
}
