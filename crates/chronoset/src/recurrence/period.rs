//! A fixed period added to the local clock reading of "now".

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dst::{AmbiguousTimeBehavior, InvalidTimeBehavior, RecurrenceBehavior};
use crate::error::{ChronosetError, Result};
use crate::timezone::TimezoneContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PeriodRepr", into = "PeriodRepr")]
pub struct PeriodRecurrence {
    period: TimeDelta,
}

/// Whole-second periods serialize as `period_secs`, others as `period_ms`.
#[derive(Serialize, Deserialize)]
struct PeriodRepr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    period_secs: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    period_ms: Option<i64>,
}

impl TryFrom<PeriodRepr> for PeriodRecurrence {
    type Error = ChronosetError;

    fn try_from(repr: PeriodRepr) -> Result<Self> {
        let period = match (repr.period_secs, repr.period_ms) {
            (Some(secs), None) => TimeDelta::try_seconds(secs),
            (None, Some(ms)) => TimeDelta::try_milliseconds(ms),
            _ => {
                return Err(ChronosetError::InvalidRecurrence(
                    "exactly one of period_secs and period_ms is required".to_string(),
                ))
            }
        };
        Self::new(period.ok_or_else(|| {
            ChronosetError::InvalidRecurrence("period is out of range".to_string())
        })?)
    }
}

impl From<PeriodRecurrence> for PeriodRepr {
    fn from(period: PeriodRecurrence) -> Self {
        if period.period.subsec_nanos() == 0 {
            Self {
                period_secs: Some(period.period.num_seconds()),
                period_ms: None,
            }
        } else {
            Self {
                period_secs: None,
                period_ms: Some(period.period.num_milliseconds()),
            }
        }
    }
}

impl PeriodRecurrence {
    /// # Errors
    /// Returns `ChronosetError::InvalidRecurrence` when `period` is not
    /// positive or is not a whole number of milliseconds.
    pub fn new(period: TimeDelta) -> Result<Self> {
        if period <= TimeDelta::zero() {
            return Err(ChronosetError::InvalidRecurrence(format!(
                "period must be positive, got {period}"
            )));
        }
        if period.subsec_nanos() % 1_000_000 != 0 {
            return Err(ChronosetError::InvalidRecurrence(format!(
                "period must be a whole number of milliseconds, got {period}"
            )));
        }
        Ok(Self { period })
    }

    pub fn period(&self) -> TimeDelta {
        self.period
    }

    pub(crate) fn next_time(
        &self,
        behavior: RecurrenceBehavior,
        ctx: &TimezoneContext,
        now: &DateTime<FixedOffset>,
    ) -> Result<DateTime<FixedOffset>> {
        let now_local = now.naive_local();
        let naive = now_local
            .checked_add_signed(self.period)
            .ok_or_else(|| ChronosetError::OutOfRange(format!("{now} + {}", self.period)))?;
        let elapsed = || {
            now.with_timezone(&Utc)
                .checked_add_signed(self.period)
                .map(|utc| ctx.convert_from_utc(utc))
                .ok_or_else(|| ChronosetError::OutOfRange(format!("{now} + {}", self.period)))
        };

        let resolved = if ctx.is_invalid_time(&naive) {
            match behavior.invalid_time {
                InvalidTimeBehavior::Shift => ctx.shift_invalid(&naive),
                InvalidTimeBehavior::Skip => {
                    let candidate = self.clear_gap(ctx, now_local, naive)?;
                    debug!(%naive, %candidate, "skipping period over nonexistent local times");
                    ctx.resolve(&candidate, behavior.ambiguous_time)
                }
            }
        } else if ctx.is_ambiguous_time(&naive)
            && behavior.ambiguous_time == AmbiguousTimeBehavior::DaylightTime
        {
            Some(elapsed()?)
        } else {
            ctx.resolve(&naive, behavior.ambiguous_time)
        };

        match resolved {
            Some(next) if next > *now => Ok(next),
            // Local arithmetic can land behind `now` right after clocks fall
            // back; count the period in elapsed time instead.
            _ => elapsed(),
        }
    }

    /// The first reading `now_local + k * period` past the gap holding `naive`.
    fn clear_gap(
        &self,
        ctx: &TimezoneContext,
        now_local: NaiveDateTime,
        naive: NaiveDateTime,
    ) -> Result<NaiveDateTime> {
        let Some((_, gap)) = ctx.invalid_window(&naive) else {
            return Ok(naive);
        };
        let gap_end = gap
            .upper()
            .finite_value()
            .copied()
            .ok_or_else(|| ChronosetError::OutOfRange(format!("unbounded gap around {naive}")))?;

        let period_ms = self.period.num_milliseconds().max(1);
        let distance_ms = (gap_end - now_local).num_milliseconds();
        let mut steps = (distance_ms + period_ms - 1) / period_ms;
        let mut candidate = naive;
        while gap.contains(&candidate) {
            candidate = steps
                .checked_mul(period_ms)
                .and_then(TimeDelta::try_milliseconds)
                .and_then(|offset| now_local.checked_add_signed(offset))
                .ok_or_else(|| {
                    ChronosetError::OutOfRange(format!("{now_local} + {steps} periods"))
                })?;
            steps += 1;
        }
        Ok(candidate)
    }
}

impl fmt::Display for PeriodRecurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.period.subsec_nanos() != 0 {
            return write!(f, "every {}ms", self.period.num_milliseconds());
        }
        let secs = self.period.num_seconds();
        let (value, unit) = match secs {
            s if s % 86_400 == 0 => (s / 86_400, "d"),
            s if s % 3_600 == 0 => (s / 3_600, "h"),
            s if s % 60 == 0 => (s / 60, "m"),
            s => (s, "s"),
        };
        write!(f, "every {value}{unit}")
    }
}
