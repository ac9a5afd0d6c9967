//! Recurrence scheduling: calendar variants, periods, daylight transitions and
//! the stateful schedule sequence.

use std::sync::Arc;
use std::thread;

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, TimeDelta, TimeZone, Timelike, Utc, Weekday,
};
use chronoset::recurrence::{
    DailyRecurrence, MonthlyRecurrence, PeriodRecurrence, TimesOfDay, WeekDaysOfMonth,
    WeekPosition, WeeklyRecurrence,
};
use chronoset::{
    AmbiguousTimeBehavior, InvalidTimeBehavior, Months, Occurrences, Recurrence,
    RecurrenceBehavior, TimezoneContext, WeekDays,
};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_york() -> TimezoneContext {
    TimezoneContext::try_new("America/New_York").unwrap()
}

fn los_angeles() -> TimezoneContext {
    TimezoneContext::try_new("America/Los_Angeles").unwrap()
}

/// A local reading in `ctx`, taking the daylight instant when ambiguous.
fn at(ctx: &TimezoneContext, y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
    let naive = NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap();
    ctx.resolve(&naive, AmbiguousTimeBehavior::DaylightTime).unwrap()
}

fn times(texts: &[&str]) -> TimesOfDay {
    TimesOfDay::parse(texts.iter().copied()).unwrap()
}

fn take(
    recurrence: &Recurrence,
    ctx: &TimezoneContext,
    n: u32,
    now: &DateTime<FixedOffset>,
) -> Vec<DateTime<FixedOffset>> {
    recurrence
        .schedule(ctx, Occurrences::Bounded(n), now)
        .map(|s| s.unwrap().occurs_on())
        .collect()
}

fn ymd_hm(dt: &DateTime<FixedOffset>) -> (i32, u32, u32, u32, u32) {
    (dt.year(), dt.month(), dt.day(), dt.hour(), dt.minute())
}

// ---------------------------------------------------------------------------
// Daily
// ---------------------------------------------------------------------------

#[test]
fn work_week_morning_before_and_after_the_slot() {
    let ctx = new_york();
    // 2026-06-01 is a Monday.
    let rule = DailyRecurrence::on_week_days(times(&["08:00"]), WeekDays::WORK_WEEK).unwrap();

    let early = Recurrence::new(rule.clone());
    let schedule = early.get_next_schedule(&ctx, &at(&ctx, 2026, 6, 1, 7, 0)).unwrap();
    assert_eq!(ymd_hm(&schedule.occurs_on()), (2026, 6, 1, 8, 0));
    assert_eq!(schedule.due_time(), TimeDelta::hours(1));

    let late = Recurrence::new(rule);
    let schedule = late.get_next_schedule(&ctx, &at(&ctx, 2026, 6, 1, 9, 0)).unwrap();
    assert_eq!(ymd_hm(&schedule.occurs_on()), (2026, 6, 2, 8, 0));
    assert_eq!(schedule.occurs_on().weekday(), Weekday::Tue);
}

#[test]
fn friday_evening_rolls_to_monday() {
    let ctx = new_york();
    let rule = DailyRecurrence::on_week_days(times(&["08:00"]), WeekDays::WORK_WEEK).unwrap();
    let recurrence = Recurrence::new(rule);
    let next = recurrence.get_next_schedule(&ctx, &at(&ctx, 2026, 6, 5, 18, 0)).unwrap();
    assert_eq!(ymd_hm(&next.occurs_on()), (2026, 6, 8, 8, 0));
}

#[test]
fn every_other_day_rotates_times() {
    let ctx = new_york();
    let rule = DailyRecurrence::every_days(times(&["20:00", "08:00"]), 2).unwrap();
    let recurrence = Recurrence::new(rule);
    let got: Vec<_> = take(&recurrence, &ctx, 4, &at(&ctx, 2026, 6, 1, 12, 0))
        .iter()
        .map(ymd_hm)
        .collect();
    assert_eq!(
        got,
        vec![
            (2026, 6, 1, 20, 0),
            (2026, 6, 3, 8, 0),
            (2026, 6, 3, 20, 0),
            (2026, 6, 5, 8, 0),
        ]
    );
}

// ---------------------------------------------------------------------------
// Weekly
// ---------------------------------------------------------------------------

#[test]
fn biweekly_alternates_active_weeks() {
    let ctx = new_york();
    let rule = WeeklyRecurrence::new(
        times(&["09:00"]),
        2,
        WeekDays::MONDAY | WeekDays::WEDNESDAY,
    )
    .unwrap();
    let recurrence = Recurrence::new(rule);
    // Tuesday 2026-06-02.
    let dates: Vec<_> = take(&recurrence, &ctx, 5, &at(&ctx, 2026, 6, 2, 10, 0))
        .iter()
        .map(|dt| (dt.month(), dt.day()))
        .collect();
    assert_eq!(dates, vec![(6, 3), (6, 15), (6, 17), (6, 29), (7, 1)]);
}

#[test]
fn weekly_with_one_week_visits_every_selected_day() {
    let ctx = new_york();
    let rule = WeeklyRecurrence::new(times(&["18:30"]), 1, WeekDays::WEEKEND).unwrap();
    let recurrence = Recurrence::new(rule);
    let days: Vec<_> = take(&recurrence, &ctx, 4, &at(&ctx, 2026, 6, 1, 0, 0))
        .iter()
        .map(|dt| dt.day())
        .collect();
    assert_eq!(days, vec![6, 7, 13, 14]);
}

// ---------------------------------------------------------------------------
// Monthly
// ---------------------------------------------------------------------------

#[test]
fn thirty_first_skips_short_months() {
    let ctx = new_york();
    let rule = MonthlyRecurrence::on_day(times(&["10:00"]), 31, Months::ALL_YEAR).unwrap();
    let recurrence = Recurrence::new(rule);
    let months: Vec<_> = take(&recurrence, &ctx, 3, &at(&ctx, 2026, 4, 1, 0, 0))
        .iter()
        .map(|dt| (dt.month(), dt.day()))
        .collect();
    assert_eq!(months, vec![(5, 31), (7, 31), (8, 31)]);
}

#[test]
fn second_tuesday_of_each_month() {
    let ctx = new_york();
    let rule = MonthlyRecurrence::on_week_days(
        times(&["09:00"]),
        WeekDaysOfMonth {
            position: WeekPosition::Second,
            week_days: WeekDays::TUESDAY,
            any_week_days: false,
        },
        Months::ALL_YEAR,
    )
    .unwrap();
    let recurrence = Recurrence::new(rule);
    let dates: Vec<_> = take(&recurrence, &ctx, 2, &at(&ctx, 2026, 6, 1, 0, 0))
        .iter()
        .map(|dt| (dt.month(), dt.day()))
        .collect();
    assert_eq!(dates, vec![(6, 9), (7, 14)]);
}

#[test]
fn quarterly_first_work_day() {
    let ctx = new_york();
    let quarters = Months::JANUARY | Months::APRIL | Months::JULY | Months::OCTOBER;
    let rule = MonthlyRecurrence::on_week_days(
        times(&["07:00"]),
        WeekDaysOfMonth {
            position: WeekPosition::First,
            week_days: WeekDays::WORK_WEEK,
            any_week_days: true,
        },
        quarters,
    )
    .unwrap();
    let recurrence = Recurrence::new(rule);
    let dates: Vec<_> = take(&recurrence, &ctx, 3, &at(&ctx, 2026, 5, 1, 0, 0))
        .iter()
        .map(|dt| (dt.year(), dt.month(), dt.day()))
        .collect();
    // 2026-07-01 Wednesday, 2026-10-01 Thursday, 2027-01-01 Friday.
    assert_eq!(dates, vec![(2026, 7, 1), (2026, 10, 1), (2027, 1, 1)]);
}

#[test]
fn day_beyond_selected_months_is_rejected_at_construction() {
    assert!(MonthlyRecurrence::on_day(times(&["09:00"]), 31, Months::SEPTEMBER).is_err());
    assert!(MonthlyRecurrence::on_day(times(&["09:00"]), 32, Months::ALL_YEAR).is_err());
}

// ---------------------------------------------------------------------------
// Daylight transitions
// ---------------------------------------------------------------------------

#[test]
fn period_skip_lands_after_the_gap() {
    let ctx = los_angeles();
    let behavior =
        RecurrenceBehavior::new(InvalidTimeBehavior::Skip, AmbiguousTimeBehavior::StandardTime);
    let recurrence = Recurrence::new(PeriodRecurrence::new(TimeDelta::minutes(30)).unwrap())
        .with_behavior(behavior);

    let now = at(&ctx, 2026, 3, 8, 1, 40);
    let next = recurrence.get_next_schedule(&ctx, &now).unwrap().occurs_on();
    let gap_end = at(&ctx, 2026, 3, 8, 3, 0);
    assert!(next > gap_end);
    assert!(!ctx.is_invalid_time(&next.naive_local()));
    assert_eq!(ymd_hm(&next), (2026, 3, 8, 3, 10));
}

#[test]
fn calendar_skip_drops_the_missing_reading() {
    let ctx = los_angeles();
    let behavior =
        RecurrenceBehavior::new(InvalidTimeBehavior::Skip, AmbiguousTimeBehavior::StandardTime);
    let rule = DailyRecurrence::every_days(times(&["02:30"]), 1).unwrap();
    let recurrence = Recurrence::new(rule).with_behavior(behavior);
    let next = recurrence.get_next_schedule(&ctx, &at(&ctx, 2026, 3, 7, 12, 0)).unwrap();
    assert_eq!(ymd_hm(&next.occurs_on()), (2026, 3, 9, 2, 30));
}

#[test]
fn calendar_shift_moves_the_missing_reading_forward() {
    let ctx = los_angeles();
    let rule = DailyRecurrence::every_days(times(&["02:30"]), 1).unwrap();
    let recurrence = Recurrence::new(rule);
    let next = recurrence.get_next_schedule(&ctx, &at(&ctx, 2026, 3, 7, 12, 0)).unwrap();
    assert_eq!(ymd_hm(&next.occurs_on()), (2026, 3, 8, 3, 30));
}

#[test]
fn ambiguous_reading_follows_behavior() {
    let ctx = los_angeles();
    let rule = DailyRecurrence::every_days(times(&["01:30"]), 1).unwrap();
    let now = at(&ctx, 2026, 10, 31, 12, 0);

    let daylight = Recurrence::new(rule.clone()).with_behavior(RecurrenceBehavior::new(
        InvalidTimeBehavior::Shift,
        AmbiguousTimeBehavior::DaylightTime,
    ));
    let standard = Recurrence::new(rule);

    let early = daylight.get_next_schedule(&ctx, &now).unwrap();
    let late = standard.get_next_schedule(&ctx, &now).unwrap();
    assert_eq!(early.occurs_on().naive_local(), late.occurs_on().naive_local());
    assert_eq!(early.occurs_on().offset().local_minus_utc(), -7 * 3600);
    assert_eq!(late.occurs_on().offset().local_minus_utc(), -8 * 3600);
    assert_eq!(late.due_time() - early.due_time(), TimeDelta::hours(1));
}

#[test]
fn due_time_is_real_elapsed_time_across_spring_forward() {
    let ctx = los_angeles();
    let rule = DailyRecurrence::every_days(times(&["12:00"]), 1).unwrap();
    let recurrence = Recurrence::new(rule);
    let next = recurrence.get_next_schedule(&ctx, &at(&ctx, 2026, 3, 7, 12, 0)).unwrap();
    assert_eq!(ymd_hm(&next.occurs_on()), (2026, 3, 8, 12, 0));
    assert_eq!(next.due_time(), TimeDelta::hours(23));
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[test]
fn earlier_now_resets_instead_of_failing() {
    let ctx = new_york();
    let rule = DailyRecurrence::every_days(times(&["08:00"]), 1).unwrap();
    let recurrence = Recurrence::new(rule);

    let first = recurrence.get_next_schedule(&ctx, &at(&ctx, 2026, 6, 1, 7, 30)).unwrap();
    assert_eq!(ymd_hm(&first.occurs_on()), (2026, 6, 1, 8, 0));

    let again = recurrence.get_next_schedule(&ctx, &at(&ctx, 2026, 6, 1, 6, 30)).unwrap();
    assert_eq!(ymd_hm(&again.occurs_on()), (2026, 6, 1, 8, 0));
    assert_eq!(again.due_time(), TimeDelta::minutes(90));
}

#[test]
fn now_in_another_zone_is_normalized() {
    let ctx = new_york();
    let rule = DailyRecurrence::every_days(times(&["08:00"]), 1).unwrap();
    let recurrence = Recurrence::new(rule);
    // 11:00 UTC is 07:00 in New York during daylight time.
    let now = Utc.with_ymd_and_hms(2026, 6, 1, 11, 0, 0).unwrap();
    let next = recurrence.get_next_schedule(&ctx, &now).unwrap();
    assert_eq!(ymd_hm(&next.occurs_on()), (2026, 6, 1, 8, 0));
    assert_eq!(next.due_time(), TimeDelta::hours(1));
}

#[test]
fn unbounded_schedule_is_lazy() {
    let ctx = new_york();
    let recurrence = Recurrence::new(PeriodRecurrence::new(TimeDelta::hours(6)).unwrap());
    let count = recurrence
        .schedule(&ctx, Occurrences::from(0), &at(&ctx, 2026, 6, 1, 0, 0))
        .take(100)
        .filter(Result::is_ok)
        .count();
    assert_eq!(count, 100);
}

#[test]
fn shared_recurrence_serializes_callers() {
    let ctx = Arc::new(new_york());
    let rule = DailyRecurrence::every_days(times(&["08:00", "12:00", "16:00"]), 1).unwrap();
    let recurrence = Arc::new(Recurrence::new(rule));
    let now = at(&ctx, 2026, 6, 1, 0, 0);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            let recurrence = Arc::clone(&recurrence);
            thread::spawn(move || recurrence.get_next_schedule(&ctx, &now).is_ok())
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert!(recurrence.next_scheduled_time().is_some());
}

// ---------------------------------------------------------------------------
// Declarative definitions
// ---------------------------------------------------------------------------

#[test]
fn definition_from_json() {
    let json = r#"{
        "name": "standup",
        "type": "daily",
        "times_of_day": ["09:15"],
        "week_days": "WORK_WEEK",
        "behavior": { "invalid_time": "skip" }
    }"#;
    let recurrence: Recurrence = serde_json::from_str(json).unwrap();
    assert_eq!(recurrence.name(), Some("standup"));
    assert_eq!(recurrence.behavior().invalid_time, InvalidTimeBehavior::Skip);
    assert_eq!(recurrence.behavior().ambiguous_time, AmbiguousTimeBehavior::StandardTime);
    assert_eq!(
        recurrence.to_string(),
        "standup: daily on MONDAY | TUESDAY | WEDNESDAY | THURSDAY | FRIDAY at 09:15"
    );
}

#[test]
fn definitions_round_trip_with_sub_second_precision() {
    let heartbeat =
        Recurrence::new(PeriodRecurrence::new(TimeDelta::milliseconds(500)).unwrap())
            .with_name("heartbeat");
    let json = serde_json::to_string(&heartbeat).unwrap();
    assert!(json.contains(r#""period_ms":500"#), "{json}");
    let back: Recurrence = serde_json::from_str(&json).unwrap();
    assert_eq!(back.kind(), heartbeat.kind());
    assert_eq!(back.name(), Some("heartbeat"));

    let offsets = [
        TimeDelta::hours(8) + TimeDelta::milliseconds(200),
        TimeDelta::hours(8) + TimeDelta::milliseconds(700),
    ];
    let daily =
        DailyRecurrence::every_days(TimesOfDay::from_offsets(offsets).unwrap(), 1).unwrap();
    let recurrence = Recurrence::new(daily);
    let back: Recurrence =
        serde_json::from_str(&serde_json::to_string(&recurrence).unwrap()).unwrap();
    assert_eq!(back.kind(), recurrence.kind());
}

#[test]
fn invalid_definitions_fail_to_load() {
    for json in [
        r#"{"type": "period", "period_secs": 0}"#,
        r#"{"type": "daily", "times_of_day": []}"#,
        r#"{"type": "daily", "times_of_day": ["24:00"]}"#,
        r#"{"type": "weekly", "times_of_day": ["09:00"], "weeks": 0, "week_days": "MONDAY"}"#,
        r#"{"type": "monthly", "times_of_day": ["09:00"], "day_of_month": 30, "months": "FEBRUARY"}"#,
    ] {
        assert!(serde_json::from_str::<Recurrence>(json).is_err(), "{json}");
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

fn arb_zone() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("UTC"),
        Just("America/New_York"),
        Just("America/Los_Angeles"),
        Just("Europe/London"),
        Just("Australia/Sydney"),
    ]
}

fn arb_behavior() -> impl Strategy<Value = RecurrenceBehavior> {
    (any::<bool>(), any::<bool>()).prop_map(|(skip, daylight)| {
        RecurrenceBehavior::new(
            if skip { InvalidTimeBehavior::Skip } else { InvalidTimeBehavior::Shift },
            if daylight {
                AmbiguousTimeBehavior::DaylightTime
            } else {
                AmbiguousTimeBehavior::StandardTime
            },
        )
    })
}

proptest! {
    #[test]
    fn daily_schedules_strictly_increase(
        zone in arb_zone(),
        behavior in arb_behavior(),
        hours in proptest::collection::btree_set(0u32..24, 1..4),
        days in 1u32..4,
        start_day in 1u32..=28,
        start_month in 1u32..=12,
    ) {
        let ctx = TimezoneContext::try_new(zone).unwrap();
        let texts: Vec<String> = hours.iter().map(|h| format!("{h:02}:30")).collect();
        let rule = DailyRecurrence::every_days(TimesOfDay::parse(&texts).unwrap(), days).unwrap();
        let recurrence = Recurrence::new(rule).with_behavior(behavior);

        let now = at(&ctx, 2026, start_month, start_day, 0, 0);
        let mut previous = now;
        for schedule in recurrence.schedule(&ctx, Occurrences::Bounded(12), &now) {
            let schedule = schedule.unwrap();
            prop_assert!(schedule.occurs_on() > previous);
            prop_assert!(schedule.due_time() > TimeDelta::zero());
            previous = schedule.occurs_on();
        }
    }

    #[test]
    fn period_schedules_strictly_increase(
        zone in arb_zone(),
        behavior in arb_behavior(),
        minutes in 1i64..240,
        start_month in 1u32..=12,
    ) {
        let ctx = TimezoneContext::try_new(zone).unwrap();
        let period = PeriodRecurrence::new(TimeDelta::minutes(minutes)).unwrap();
        let recurrence = Recurrence::new(period).with_behavior(behavior);

        let now = at(&ctx, 2026, start_month, 1, 0, 0);
        let mut previous = now;
        for schedule in recurrence.schedule(&ctx, Occurrences::Bounded(50), &now) {
            let schedule = schedule.unwrap();
            prop_assert!(schedule.occurs_on() > previous);
            previous = schedule.occurs_on();
        }
    }
}
