//! Machinery shared by the daily, weekly and monthly recurrences: the set of
//! times of day and the rotating cursor that walks dates and times together.

use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dst::{InvalidTimeBehavior, RecurrenceBehavior};
use crate::error::{ChronosetError, Result};
use crate::flags::WeekDays;
use crate::timezone::TimezoneContext;

/// Upper bound on candidates examined for one occurrence.
const MAX_CANDIDATES: usize = 1_000_000;

/// Last date an occurrence landed on, per weekday (Sunday first).
pub(crate) type WeekSlots = [Option<NaiveDate>; 7];

/// A non-empty, ordered set of distinct times of day, each in `[00:00, 24:00)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct TimesOfDay(BTreeSet<NaiveTime>);

impl TimesOfDay {
    /// # Errors
    /// Returns `ChronosetError::InvalidTimeOfDay` when `times` is empty.
    pub fn new(times: impl IntoIterator<Item = NaiveTime>) -> Result<Self> {
        let set: BTreeSet<NaiveTime> = times.into_iter().collect();
        if set.is_empty() {
            return Err(ChronosetError::InvalidTimeOfDay(
                "at least one time of day is required".to_string(),
            ));
        }
        Ok(Self(set))
    }

    /// Build from offsets since midnight.
    ///
    /// # Errors
    /// Returns `ChronosetError::InvalidTimeOfDay` when an offset is negative or
    /// reaches 24 hours, or when `offsets` is empty.
    pub fn from_offsets(offsets: impl IntoIterator<Item = TimeDelta>) -> Result<Self> {
        let times = offsets
            .into_iter()
            .map(|offset| {
                if offset < TimeDelta::zero() || offset >= TimeDelta::days(1) {
                    return Err(ChronosetError::InvalidTimeOfDay(format!(
                        "{offset} is outside [0, 24h)"
                    )));
                }
                Ok(NaiveTime::MIN + offset)
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(times)
    }

    /// Parse `"HH:MM"`, `"HH:MM:SS"` or `"HH:MM:SS.fff"` readings.
    pub fn parse<S: AsRef<str>>(texts: impl IntoIterator<Item = S>) -> Result<Self> {
        let times = texts
            .into_iter()
            .map(|text| parse_time_of_day(text.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(times)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NaiveTime> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All times, rotated to start at the first one strictly after `time`.
    fn rotated_after(&self, time: NaiveTime) -> VecDeque<NaiveTime> {
        let (before, after): (Vec<NaiveTime>, Vec<NaiveTime>) =
            self.0.iter().copied().partition(|t| *t <= time);
        after.into_iter().chain(before).collect()
    }

    fn has_time_after(&self, time: NaiveTime) -> bool {
        self.0.range(time..).any(|t| *t > time)
    }
}

fn parse_time_of_day(text: &str) -> Result<NaiveTime> {
    let text = text.trim();
    NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .map_err(|e| ChronosetError::InvalidTimeOfDay(format!("'{text}': {e}")))
}

impl TryFrom<Vec<String>> for TimesOfDay {
    type Error = ChronosetError;

    fn try_from(texts: Vec<String>) -> Result<Self> {
        Self::parse(texts)
    }
}

impl From<TimesOfDay> for Vec<String> {
    fn from(times: TimesOfDay) -> Self {
        times
            .iter()
            .map(|t| t.format("%H:%M:%S%.f").to_string())
            .collect()
    }
}

impl fmt::Display for TimesOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .iter()
            .map(|t| t.format("%H:%M").to_string())
            .collect();
        write!(f, "{}", rendered.join(", "))
    }
}

/// How a calendar recurrence picks the dates its times of day land on.
pub(crate) trait DateRule {
    /// First qualifying date on or after `from`.
    fn first_date(&self, from: NaiveDate) -> Result<NaiveDate>;

    /// Next qualifying date strictly after `date`.
    fn next_date(&self, date: NaiveDate, slots: &WeekSlots) -> Result<NaiveDate>;
}

/// Rotating state of a calendar recurrence.
#[derive(Debug, Clone, Default)]
pub(crate) struct CalendarCursor {
    queue: VecDeque<NaiveTime>,
    date: Option<NaiveDate>,
    last_time: Option<NaiveTime>,
    /// Only read by the weekly rule.
    week_slots: WeekSlots,
}

impl CalendarCursor {
    pub(crate) fn is_fresh(&self) -> bool {
        self.date.is_none()
    }

    /// Position the cursor on the first date/time after `now`.
    fn start(
        &mut self,
        rule: &impl DateRule,
        times: &TimesOfDay,
        now: NaiveDateTime,
    ) -> Result<()> {
        let today = now.date();
        let mut date = rule.first_date(today)?;
        if date == today && !times.has_time_after(now.time()) {
            date = rule.next_date(date, &self.week_slots)?;
        }
        self.queue = if date == today {
            times.rotated_after(now.time())
        } else {
            times.iter().copied().collect()
        };
        self.date = Some(date);
        self.last_time = None;
        Ok(())
    }

    /// Dequeue the next time of day, moving to the next date when the queue
    /// wraps around.
    fn advance(&mut self, rule: &impl DateRule) -> Result<NaiveDateTime> {
        let (Some(mut date), Some(time)) = (self.date, self.queue.pop_front()) else {
            return Err(ChronosetError::InvalidRecurrence(
                "calendar cursor used before start".to_string(),
            ));
        };
        self.queue.push_back(time);

        if self.last_time.is_some_and(|last| time <= last) {
            date = rule.next_date(date, &self.week_slots)?;
        }
        self.date = Some(date);
        self.last_time = Some(time);
        self.week_slots[date.weekday().num_days_from_sunday() as usize] = Some(date);
        Ok(date.and_time(time))
    }
}

/// Compute the next occurrence strictly after `now`, applying `behavior` to
/// readings that fall in a daylight transition.
pub(crate) fn next_occurrence(
    rule: &impl DateRule,
    times: &TimesOfDay,
    behavior: RecurrenceBehavior,
    ctx: &TimezoneContext,
    cursor: &mut CalendarCursor,
    now: &DateTime<FixedOffset>,
) -> Result<DateTime<FixedOffset>> {
    if cursor.is_fresh() {
        cursor.start(rule, times, now.naive_local())?;
    }

    for _ in 0..MAX_CANDIDATES {
        let candidate = cursor.advance(rule)?;
        match resolve_candidate(ctx, behavior, &candidate) {
            Some(instant) if instant > *now => return Ok(instant),
            Some(_) => {}
            None => debug!(%candidate, timezone = %ctx, "skipping nonexistent local time"),
        }
    }
    Err(ChronosetError::OutOfRange(format!(
        "no occurrence after {now} within {MAX_CANDIDATES} candidates"
    )))
}

/// Pin a local candidate to an instant. `None` means the candidate is dropped.
pub(crate) fn resolve_candidate(
    ctx: &TimezoneContext,
    behavior: RecurrenceBehavior,
    candidate: &NaiveDateTime,
) -> Option<DateTime<FixedOffset>> {
    if ctx.is_invalid_time(candidate) {
        return match behavior.invalid_time {
            InvalidTimeBehavior::Skip => None,
            InvalidTimeBehavior::Shift => {
                let shifted = ctx.shift_invalid(candidate);
                debug!(%candidate, shifted = ?shifted, "shifting nonexistent local time");
                shifted
            }
        };
    }
    ctx.resolve(candidate, behavior.ambiguous_time)
}

/// First date on or after (`inclusive`) or strictly after `from` whose
/// weekday is in `days`.
pub(crate) fn next_matching_weekday(
    from: NaiveDate,
    days: WeekDays,
    inclusive: bool,
) -> Result<NaiveDate> {
    let start = if inclusive { 0 } else { 1 };
    (start..start + 7)
        .filter_map(|offset| from.checked_add_signed(TimeDelta::days(offset)))
        .find(|date| days.contains_weekday(date.weekday()))
        .ok_or_else(|| ChronosetError::OutOfRange(format!("no {days:?} after {from}")))
}

pub(crate) fn add_days(date: NaiveDate, days: i64) -> Result<NaiveDate> {
    date.checked_add_signed(TimeDelta::days(days))
        .ok_or_else(|| ChronosetError::OutOfRange(format!("{date} + {days} days")))
}

/// Whether `days` is a non-empty set made of defined weekday bits only.
pub(crate) fn validate_week_days(days: WeekDays) -> Result<()> {
    if days.is_empty() || WeekDays::from_bits(days.bits()).is_none() {
        return Err(ChronosetError::InvalidRecurrence(format!(
            "week days must name at least one day, got {:#b}",
            days.bits()
        )));
    }
    Ok(())
}
