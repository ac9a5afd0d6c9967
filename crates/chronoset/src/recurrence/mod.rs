//! Recurring schedules and the DST policies applied to their occurrences.
//!
//! A [`Recurrence`] is a long-lived scheduler: it pairs a [`RecurrenceKind`]
//! (the configuration) with the rotating state the calendar variants need to
//! walk their times of day. Every call to [`Recurrence::get_next_schedule`]
//! takes that state under a lock, so one recurrence can be shared between
//! threads. The timezone is never global: callers pass the
//! [`TimezoneContext`] the occurrence should be computed in.
//!
//! Asking with a "now" earlier than the last computed occurrence is a
//! discontinuity. It is logged and recovered from by resetting the rotating
//! state; it is never an error.

mod calendar;
pub mod daily;
pub mod monthly;
pub mod period;
pub mod weekly;

use std::fmt;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, FixedOffset, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::timezone::TimezoneContext;

pub use crate::dst::{AmbiguousTimeBehavior, InvalidTimeBehavior, RecurrenceBehavior};
pub use calendar::TimesOfDay;
pub use daily::{DailyRecurrence, DailySelection};
pub use monthly::{MonthlyRecurrence, MonthlySelection, WeekDaysOfMonth, WeekPosition};
pub use period::PeriodRecurrence;
pub use weekly::WeeklyRecurrence;

use calendar::{next_occurrence, CalendarCursor};

/// The shape of a recurrence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecurrenceKind {
    Period(PeriodRecurrence),
    Daily(DailyRecurrence),
    Weekly(WeeklyRecurrence),
    Monthly(MonthlyRecurrence),
}

impl From<PeriodRecurrence> for RecurrenceKind {
    fn from(period: PeriodRecurrence) -> Self {
        RecurrenceKind::Period(period)
    }
}

impl From<DailyRecurrence> for RecurrenceKind {
    fn from(daily: DailyRecurrence) -> Self {
        RecurrenceKind::Daily(daily)
    }
}

impl From<WeeklyRecurrence> for RecurrenceKind {
    fn from(weekly: WeeklyRecurrence) -> Self {
        RecurrenceKind::Weekly(weekly)
    }
}

impl From<MonthlyRecurrence> for RecurrenceKind {
    fn from(monthly: MonthlyRecurrence) -> Self {
        RecurrenceKind::Monthly(monthly)
    }
}

impl fmt::Display for RecurrenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecurrenceKind::Period(p) => p.fmt(f),
            RecurrenceKind::Daily(d) => d.fmt(f),
            RecurrenceKind::Weekly(w) => w.fmt(f),
            RecurrenceKind::Monthly(m) => m.fmt(f),
        }
    }
}

/// The declarative form of a recurrence, as found in configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub behavior: RecurrenceBehavior,
    #[serde(flatten)]
    pub kind: RecurrenceKind,
}

/// A computed occurrence and the real time left until it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccurrenceSchedule {
    occurs_on: DateTime<FixedOffset>,
    due_time: TimeDelta,
}

impl OccurrenceSchedule {
    /// `due_time` is measured on the universal timeline, so it includes any
    /// daylight jump between `now` and `occurs_on`.
    pub fn new(occurs_on: DateTime<FixedOffset>, now: &DateTime<FixedOffset>) -> Self {
        Self {
            occurs_on,
            due_time: occurs_on.signed_duration_since(*now),
        }
    }

    pub fn occurs_on(&self) -> DateTime<FixedOffset> {
        self.occurs_on
    }

    pub fn due_time(&self) -> TimeDelta {
        self.due_time
    }
}

impl fmt::Display for OccurrenceSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.due_time.num_seconds();
        write!(
            f,
            "{} (in {}h{:02}m{:02}s)",
            self.occurs_on.to_rfc3339(),
            secs / 3600,
            (secs % 3600) / 60,
            secs % 60
        )
    }
}

/// How many schedules [`Recurrence::schedule`] yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Occurrences {
    Bounded(u32),
    #[default]
    Unbounded,
}

/// Integer counts: zero and negatives mean "no limit".
impl From<i64> for Occurrences {
    fn from(count: i64) -> Self {
        if count <= 0 {
            Occurrences::Unbounded
        } else {
            Occurrences::Bounded(u32::try_from(count).unwrap_or(u32::MAX))
        }
    }
}

#[derive(Debug, Default)]
struct RecurrenceState {
    next_scheduled: Option<DateTime<FixedOffset>>,
    calendar: CalendarCursor,
}

/// A named recurrence with its DST behavior and rotating state.
#[derive(Debug, Serialize, Deserialize)]
#[serde(from = "RecurrenceDefinition", into = "RecurrenceDefinition")]
pub struct Recurrence {
    name: Option<String>,
    behavior: RecurrenceBehavior,
    kind: RecurrenceKind,
    state: Mutex<RecurrenceState>,
}

impl Recurrence {
    pub fn new(kind: impl Into<RecurrenceKind>) -> Self {
        Self {
            name: None,
            behavior: RecurrenceBehavior::default(),
            kind: kind.into(),
            state: Mutex::new(RecurrenceState::default()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_behavior(mut self, behavior: RecurrenceBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn behavior(&self) -> RecurrenceBehavior {
        self.behavior
    }

    pub fn kind(&self) -> &RecurrenceKind {
        &self.kind
    }

    /// The occurrence returned by the last call, if any since the last reset.
    pub fn next_scheduled_time(&self) -> Option<DateTime<FixedOffset>> {
        self.lock().next_scheduled
    }

    /// Forget the rotating state. The configuration is untouched.
    pub fn reset(&self) {
        *self.lock() = RecurrenceState::default();
    }

    /// Compute the next occurrence strictly after `now`, in `ctx`.
    ///
    /// # Errors
    /// Returns `ChronosetError::OutOfRange` when no occurrence exists within
    /// the representable calendar.
    pub fn get_next_schedule<Z: TimeZone>(
        &self,
        ctx: &TimezoneContext,
        now: &DateTime<Z>,
    ) -> Result<OccurrenceSchedule> {
        let now = ctx.convert_from_utc(now.with_timezone(&Utc));
        let mut state = self.lock();

        if let Some(previous) = state.next_scheduled.filter(|previous| now < *previous) {
            info!(
                recurrence = %self,
                %now,
                %previous,
                "discontinuous schedule sequence, resetting"
            );
            *state = RecurrenceState::default();
        }

        let cursor = &mut state.calendar;
        let occurs_on = match &self.kind {
            RecurrenceKind::Period(period) => period.next_time(self.behavior, ctx, &now)?,
            RecurrenceKind::Daily(daily) => {
                next_occurrence(daily, daily.times_of_day(), self.behavior, ctx, cursor, &now)?
            }
            RecurrenceKind::Weekly(weekly) => {
                next_occurrence(weekly, weekly.times_of_day(), self.behavior, ctx, cursor, &now)?
            }
            RecurrenceKind::Monthly(monthly) => {
                next_occurrence(monthly, monthly.times_of_day(), self.behavior, ctx, cursor, &now)?
            }
        };
        state.next_scheduled = Some(occurs_on);

        let schedule = OccurrenceSchedule::new(occurs_on, &now);
        debug!(recurrence = %self, timezone = %ctx, %schedule, "computed schedule");
        Ok(schedule)
    }

    /// Lazily compute successive schedules, each from the previous
    /// occurrence. Iteration stops after the first error.
    pub fn schedule<'a, Z: TimeZone>(
        &'a self,
        ctx: &'a TimezoneContext,
        occurrences: Occurrences,
        now: &DateTime<Z>,
    ) -> Schedule<'a> {
        Schedule {
            recurrence: self,
            ctx,
            remaining: match occurrences {
                Occurrences::Bounded(n) => Some(n),
                Occurrences::Unbounded => None,
            },
            now: ctx.convert_from_utc(now.with_timezone(&Utc)),
            failed: false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecurrenceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A copy starts with fresh rotating state.
impl Clone for Recurrence {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            behavior: self.behavior,
            kind: self.kind.clone(),
            state: Mutex::new(RecurrenceState::default()),
        }
    }
}

impl From<RecurrenceDefinition> for Recurrence {
    fn from(definition: RecurrenceDefinition) -> Self {
        Self {
            name: definition.name,
            behavior: definition.behavior,
            kind: definition.kind,
            state: Mutex::new(RecurrenceState::default()),
        }
    }
}

impl From<Recurrence> for RecurrenceDefinition {
    fn from(recurrence: Recurrence) -> Self {
        Self {
            name: recurrence.name,
            behavior: recurrence.behavior,
            kind: recurrence.kind,
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name}: {}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Iterator returned by [`Recurrence::schedule`].
pub struct Schedule<'a> {
    recurrence: &'a Recurrence,
    ctx: &'a TimezoneContext,
    remaining: Option<u32>,
    now: DateTime<FixedOffset>,
    failed: bool,
}

impl Iterator for Schedule<'_> {
    type Item = Result<OccurrenceSchedule>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining == Some(0) {
            return None;
        }
        match self.recurrence.get_next_schedule(self.ctx, &self.now) {
            Ok(schedule) => {
                self.now = schedule.occurs_on();
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining -= 1;
                }
                Some(Ok(schedule))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
