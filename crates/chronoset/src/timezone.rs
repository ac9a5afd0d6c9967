//! Timezone context: which local clock readings exist, which repeat, and
//! where the daylight-saving transitions of a year fall.
//!
//! A [`TimezoneContext`] is built once from an IANA identifier and then only
//! read, so a single value can be shared (by reference or `Arc`) across every
//! scheduling call. Transitions are discovered from the tz database offsets
//! rather than from rule descriptors: the UTC offset is sampled once per day
//! and each change is bisected down to the second it takes effect.

use std::fmt;

use chrono::{
    DateTime, Datelike, FixedOffset, Local, LocalResult, NaiveDate, NaiveDateTime, Offset,
    TimeDelta, TimeZone, Utc,
};
use chrono_tz::Tz;
use tracing::warn;

use crate::dst::AmbiguousTimeBehavior;
use crate::error::{ChronosetError, Result};
use crate::interval::Interval;

const HOST_ZONE_ID: &str = "local";

#[derive(Debug, Clone, Copy)]
enum Zone {
    Named(Tz),
    Host,
}

/// The active timezone plus transition queries over it.
#[derive(Debug, Clone)]
pub struct TimezoneContext {
    id: String,
    zone: Zone,
}

/// A change of UTC offset at a single instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// First instant governed by `offset_after`.
    pub at: DateTime<Utc>,
    pub offset_before: FixedOffset,
    pub offset_after: FixedOffset,
}

impl Transition {
    /// Size of the clock jump; positive when clocks move forward.
    pub fn delta(&self) -> TimeDelta {
        TimeDelta::seconds(i64::from(
            self.offset_after.local_minus_utc() - self.offset_before.local_minus_utc(),
        ))
    }

    pub fn is_forward(&self) -> bool {
        self.delta() > TimeDelta::zero()
    }

    /// The wall clock reading at the transition, on the old offset.
    pub fn local_before(&self) -> NaiveDateTime {
        self.at.naive_utc() + self.offset_before
    }

    /// The wall clock reading at the transition, on the new offset.
    pub fn local_after(&self) -> NaiveDateTime {
        self.at.naive_utc() + self.offset_after
    }

    /// The local readings this transition skips (forward) or repeats
    /// (backward), as a half-open interval.
    pub fn window(&self) -> Interval<NaiveDateTime> {
        let (start, end) = if self.is_forward() {
            (self.local_before(), self.local_after())
        } else {
            (self.local_after(), self.local_before())
        };
        Interval::closed_open(start, end).unwrap_or_else(|_| Interval::empty(start))
    }
}

/// The daylight-saving period of one year, in local clock readings.
///
/// `start` and `end` are the first forward and first backward transition of
/// the local calendar year. In the southern hemisphere daylight time spans
/// New Year, so `end` comes before `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaylightTime {
    /// Reading at which clocks jump forward (on standard time).
    pub start: NaiveDateTime,
    /// Reading at which clocks fall back (on daylight time).
    pub end: NaiveDateTime,
    /// Size of the jump.
    pub delta: TimeDelta,
}

impl fmt::Display for DaylightTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} ({:+} min)",
            self.start,
            self.end,
            self.delta.num_minutes()
        )
    }
}

impl TimezoneContext {
    /// Build a context for an IANA timezone identifier.
    ///
    /// An empty or unknown identifier falls back to the host timezone and logs
    /// a warning; it is never fatal.
    pub fn new(id: &str) -> Self {
        match Self::try_new(id) {
            Ok(context) => context,
            Err(e) => {
                warn!(timezone = %id, error = %e, "falling back to the host timezone");
                Self::host()
            }
        }
    }

    /// Build a context for an IANA timezone identifier.
    ///
    /// # Errors
    /// Returns `ChronosetError::InvalidTimezone` when the identifier is empty
    /// or not in the tz database.
    pub fn try_new(id: &str) -> Result<Self> {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ChronosetError::InvalidTimezone("empty identifier".to_string()));
        }
        let tz: Tz = trimmed
            .parse()
            .map_err(|_| ChronosetError::InvalidTimezone(trimmed.to_string()))?;
        Ok(Self::from_tz(tz))
    }

    pub fn from_tz(tz: Tz) -> Self {
        Self {
            id: tz.name().to_string(),
            zone: Zone::Named(tz),
        }
    }

    pub fn utc() -> Self {
        Self::from_tz(Tz::UTC)
    }

    /// The timezone the host is configured with.
    pub fn host() -> Self {
        Self {
            id: HOST_ZONE_ID.to_string(),
            zone: Zone::Host,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The tz database zone, or `None` for the host timezone.
    pub fn tz(&self) -> Option<Tz> {
        match self.zone {
            Zone::Named(tz) => Some(tz),
            Zone::Host => None,
        }
    }

    /// The current instant on the local clock.
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.convert_from_utc(Utc::now())
    }

    fn offset_at(&self, utc: &NaiveDateTime) -> FixedOffset {
        match self.zone {
            Zone::Named(tz) => tz.offset_from_utc_datetime(utc).fix(),
            Zone::Host => Local.offset_from_utc_datetime(utc).fix(),
        }
    }

    fn local_offsets(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
        match self.zone {
            Zone::Named(tz) => tz.offset_from_local_datetime(local).map(|o| o.fix()),
            Zone::Host => Local.offset_from_local_datetime(local),
        }
    }

    /// The reading does not exist: clocks jumped over it.
    pub fn is_invalid_time(&self, local: &NaiveDateTime) -> bool {
        matches!(self.local_offsets(local), LocalResult::None)
    }

    /// The reading occurs twice: clocks fell back over it.
    pub fn is_ambiguous_time(&self, local: &NaiveDateTime) -> bool {
        matches!(self.local_offsets(local), LocalResult::Ambiguous(_, _))
    }

    pub fn convert_from_utc(&self, utc: DateTime<Utc>) -> DateTime<FixedOffset> {
        utc.with_timezone(&self.offset_at(&utc.naive_utc()))
    }

    /// Convert a local reading to UTC, reading ambiguous times as standard
    /// time (the later instant).
    ///
    /// # Errors
    /// Returns `ChronosetError::InvalidTime` for a reading that does not exist.
    pub fn convert_to_utc(&self, local: &NaiveDateTime) -> Result<DateTime<Utc>> {
        self.resolve(local, AmbiguousTimeBehavior::StandardTime)
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| ChronosetError::InvalidTime(format!("{local} in {}", self.id)))
    }

    /// Pin a local reading to an instant. Ambiguous readings resolve per
    /// `ambiguous`; readings that do not exist yield `None`.
    pub fn resolve(
        &self,
        local: &NaiveDateTime,
        ambiguous: AmbiguousTimeBehavior,
    ) -> Option<DateTime<FixedOffset>> {
        let offset = match self.local_offsets(local) {
            LocalResult::Single(offset) => offset,
            LocalResult::Ambiguous(earliest, latest) => match ambiguous {
                AmbiguousTimeBehavior::DaylightTime => earliest,
                AmbiguousTimeBehavior::StandardTime => latest,
            },
            LocalResult::None => return None,
        };
        offset.from_local_datetime(local).single()
    }

    /// Pin a reading that falls in a forward gap to the instant it would denote
    /// on the pre-transition offset; the result reads `delta` later on the
    /// local clock. Readings outside a gap resolve as standard time.
    pub fn shift_invalid(&self, local: &NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self.invalid_window(local) {
            Some((transition, _)) => {
                let utc = (*local - transition.offset_before).and_utc();
                Some(self.convert_from_utc(utc))
            }
            None => self.resolve(local, AmbiguousTimeBehavior::StandardTime),
        }
    }

    /// The forward transition whose gap contains `local`, with the gap.
    pub fn invalid_window(
        &self,
        local: &NaiveDateTime,
    ) -> Option<(Transition, Interval<NaiveDateTime>)> {
        self.window_around(local, true)
    }

    /// The backward transition whose repeated hour contains `local`, with it.
    pub fn ambiguous_window(
        &self,
        local: &NaiveDateTime,
    ) -> Option<(Transition, Interval<NaiveDateTime>)> {
        self.window_around(local, false)
    }

    fn window_around(
        &self,
        local: &NaiveDateTime,
        forward: bool,
    ) -> Option<(Transition, Interval<NaiveDateTime>)> {
        let from = local.checked_sub_signed(TimeDelta::days(2))?;
        let to = local.checked_add_signed(TimeDelta::days(2))?;
        self.transitions_between(from, to)
            .into_iter()
            .filter(|t| t.is_forward() == forward)
            .map(|t| (t, t.window()))
            .find(|(_, window)| window.contains(local))
    }

    /// Every offset change between two UTC readings.
    pub fn transitions_between(&self, from: NaiveDateTime, to: NaiveDateTime) -> Vec<Transition> {
        let step = TimeDelta::days(1);
        let mut transitions = Vec::new();
        let mut cursor = from;
        while cursor < to {
            let next = match cursor.checked_add_signed(step) {
                Some(next) => next.min(to),
                None => break,
            };
            if self.offset_at(&cursor) != self.offset_at(&next) {
                transitions.push(self.bisect(cursor, next));
            }
            cursor = next;
        }
        transitions
    }

    /// Every offset change whose pre-transition local reading falls in `year`.
    pub fn transitions(&self, year: i32) -> Vec<Transition> {
        // Scan a few days past each end so changes near New Year in local
        // time are not lost to the UTC calendar.
        let bounds = NaiveDate::from_ymd_opt(year - 1, 12, 30)
            .zip(NaiveDate::from_ymd_opt(year + 1, 1, 3));
        match bounds {
            Some((start, end)) => self
                .transitions_between(
                    start.and_time(chrono::NaiveTime::MIN),
                    end.and_time(chrono::NaiveTime::MIN),
                )
                .into_iter()
                .filter(|t| t.local_before().year() == year)
                .collect(),
            None => Vec::new(),
        }
    }

    /// The daylight-saving period of `year`, or `None` when the zone does not
    /// observe daylight time that year.
    pub fn daylight_changes(&self, year: i32) -> Option<DaylightTime> {
        let transitions = self.transitions(year);
        let start = transitions.iter().find(|t| t.is_forward())?;
        let end = transitions.iter().find(|t| !t.is_forward())?;
        Some(DaylightTime {
            start: start.local_before(),
            end: end.local_before(),
            delta: start.delta(),
        })
    }

    /// Narrow `[lo, hi)` (UTC, offsets differ at the ends) to the second the
    /// new offset takes effect.
    fn bisect(&self, mut lo: NaiveDateTime, mut hi: NaiveDateTime) -> Transition {
        let before = self.offset_at(&lo);
        while hi - lo > TimeDelta::seconds(1) {
            let mid = lo + TimeDelta::seconds(((hi - lo).num_seconds() / 2).max(1));
            if self.offset_at(&mid) == before {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Transition {
            at: hi.and_utc(),
            offset_before: before,
            offset_after: self.offset_at(&hi),
        }
    }
}

impl Default for TimezoneContext {
    fn default() -> Self {
        Self::host()
    }
}

impl fmt::Display for TimezoneContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn unknown_identifier_falls_back_to_host() {
        let ctx = TimezoneContext::new("Mars/Olympus_Mons");
        assert_eq!(ctx.id(), "local");
        assert!(ctx.tz().is_none());
        assert!(TimezoneContext::try_new("").is_err());
    }

    #[test]
    fn spring_forward_gap_is_invalid() {
        let ctx = TimezoneContext::new("America/Los_Angeles");
        assert!(ctx.is_invalid_time(&local(2026, 3, 8, 2, 30)));
        assert!(!ctx.is_invalid_time(&local(2026, 3, 8, 3, 0)));
        assert!(!ctx.is_ambiguous_time(&local(2026, 3, 8, 2, 30)));
    }

    #[test]
    fn fall_back_hour_is_ambiguous() {
        let ctx = TimezoneContext::new("America/Los_Angeles");
        assert!(ctx.is_ambiguous_time(&local(2026, 11, 1, 1, 30)));
        assert!(!ctx.is_ambiguous_time(&local(2026, 11, 1, 2, 0)));
    }

    #[test]
    fn resolve_picks_offset_by_behavior() {
        let ctx = TimezoneContext::new("America/Los_Angeles");
        let reading = local(2026, 11, 1, 1, 30);
        let daylight = ctx
            .resolve(&reading, AmbiguousTimeBehavior::DaylightTime)
            .unwrap();
        let standard = ctx
            .resolve(&reading, AmbiguousTimeBehavior::StandardTime)
            .unwrap();
        assert_eq!(daylight.offset().local_minus_utc(), -7 * 3600);
        assert_eq!(standard.offset().local_minus_utc(), -8 * 3600);
        assert_eq!(standard - daylight, TimeDelta::hours(1));
    }

    #[test]
    fn strict_conversion_rejects_gap() {
        let ctx = TimezoneContext::new("America/Los_Angeles");
        assert!(matches!(
            ctx.convert_to_utc(&local(2026, 3, 8, 2, 30)),
            Err(ChronosetError::InvalidTime(_))
        ));
    }

    #[test]
    fn shift_moves_past_gap_by_delta() {
        let ctx = TimezoneContext::new("America/Los_Angeles");
        let shifted = ctx.shift_invalid(&local(2026, 3, 8, 2, 30)).unwrap();
        assert_eq!(shifted.naive_local(), local(2026, 3, 8, 3, 30));
    }

    #[test]
    fn daylight_window_for_los_angeles() {
        let ctx = TimezoneContext::new("America/Los_Angeles");
        let dst = ctx.daylight_changes(2026).unwrap();
        assert_eq!(dst.start, local(2026, 3, 8, 2, 0));
        assert_eq!(dst.end, local(2026, 11, 1, 2, 0));
        assert_eq!(dst.delta, TimeDelta::hours(1));
    }

    #[test]
    fn no_daylight_time_in_utc() {
        assert!(TimezoneContext::utc().daylight_changes(2026).is_none());
        assert!(TimezoneContext::new("Asia/Tokyo").daylight_changes(2026).is_none());
    }

    #[test]
    fn transition_windows() {
        let ctx = TimezoneContext::new("America/Los_Angeles");
        let (transition, gap) = ctx.invalid_window(&local(2026, 3, 8, 2, 15)).unwrap();
        assert!(transition.is_forward());
        assert_eq!(
            gap,
            Interval::closed_open(local(2026, 3, 8, 2, 0), local(2026, 3, 8, 3, 0)).unwrap()
        );

        let (_, repeated) = ctx.ambiguous_window(&local(2026, 11, 1, 1, 15)).unwrap();
        assert_eq!(
            repeated,
            Interval::closed_open(local(2026, 11, 1, 1, 0), local(2026, 11, 1, 2, 0)).unwrap()
        );
        assert!(ctx.invalid_window(&local(2026, 6, 1, 2, 15)).is_none());
    }
}
