//! # chronoset
//!
//! Bounded-interval algebra and DST-aware calendar recurrence scheduling.
//!
//! The interval half is a small set theory over any totally ordered value:
//! intervals with open or closed edges and infinite ends, unioned into a
//! canonical disjoint form, intersected and complemented. The recurrence half
//! computes the next occurrence of periodic and calendar schedules in a given
//! timezone, deciding explicitly what happens to clock readings that a
//! daylight transition skips or repeats.
//!
//! ## Modules
//!
//! - [`bound`]: interval edges, their ordering and per-type limits
//! - [`interval`]: single intervals and their textual form
//! - [`collection`]: unions, intersections and complements of intervals
//! - [`flags`]: bit-flag helpers and the `WeekDays`/`Months` sets
//! - [`timezone`]: timezone context and daylight transitions
//! - [`recurrence`]: period, daily, weekly and monthly recurrences
//! - [`dst`]: policies for invalid and ambiguous local times
//! - [`error`]: Error types

pub mod bound;
pub mod collection;
pub mod dst;
pub mod error;
pub mod flags;
pub mod interval;
pub mod recurrence;
pub mod timezone;

pub use bound::{Bound, BoundValue, Direction, Domain, Limits, Side};
pub use collection::IntervalCollection;
pub use dst::{AmbiguousTimeBehavior, InvalidTimeBehavior, RecurrenceBehavior};
pub use error::{ChronosetError, Result};
pub use flags::{Months, WeekDays};
pub use interval::{Denominator, Interval};
pub use recurrence::{
    OccurrenceSchedule, Occurrences, Recurrence, RecurrenceDefinition, RecurrenceKind, Schedule,
};
pub use timezone::{DaylightTime, TimezoneContext, Transition};
