//! Bit-flag helpers and the calendar flag sets used by the recurrences.
//!
//! The helpers are generic over any [`bitflags::Flags`] type whose bits fit in
//! a `u64`. *Single* flags are the defined values with exactly one bit set;
//! *composite* flags are named unions such as [`WeekDays::WORK_WEEK`].

use bitflags::{bitflags, Flags};
use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::error::{ChronosetError, Result};

bitflags! {
    /// Days of the week, Sunday first.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct WeekDays: u8 {
        const SUNDAY = 1;
        const MONDAY = 1 << 1;
        const TUESDAY = 1 << 2;
        const WEDNESDAY = 1 << 3;
        const THURSDAY = 1 << 4;
        const FRIDAY = 1 << 5;
        const SATURDAY = 1 << 6;

        const WORK_WEEK = Self::MONDAY.bits()
            | Self::TUESDAY.bits()
            | Self::WEDNESDAY.bits()
            | Self::THURSDAY.bits()
            | Self::FRIDAY.bits();
        const WEEKEND = Self::SATURDAY.bits() | Self::SUNDAY.bits();
        const ALL_WEEK = Self::WORK_WEEK.bits() | Self::WEEKEND.bits();
    }
}

bitflags! {
    /// Months of the year, January first.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Months: u16 {
        const JANUARY = 1;
        const FEBRUARY = 1 << 1;
        const MARCH = 1 << 2;
        const APRIL = 1 << 3;
        const MAY = 1 << 4;
        const JUNE = 1 << 5;
        const JULY = 1 << 6;
        const AUGUST = 1 << 7;
        const SEPTEMBER = 1 << 8;
        const OCTOBER = 1 << 9;
        const NOVEMBER = 1 << 10;
        const DECEMBER = 1 << 11;

        const ALL_YEAR = (1 << 12) - 1;
    }
}

const WEEKDAYS_FROM_SUNDAY: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

impl WeekDays {
    pub fn from_weekday(weekday: Weekday) -> Self {
        Self::from_bits_retain(1 << weekday.num_days_from_sunday())
    }

    pub fn contains_weekday(self, weekday: Weekday) -> bool {
        self.contains(Self::from_weekday(weekday))
    }

    /// The selected weekdays, Sunday first.
    pub fn weekdays(self) -> Vec<Weekday> {
        WEEKDAYS_FROM_SUNDAY
            .into_iter()
            .filter(|day| self.contains_weekday(*day))
            .collect()
    }
}

impl Months {
    /// `month` is 1-based, as in [`chrono::Datelike::month`].
    pub fn from_month(month: u32) -> Option<Self> {
        (1..=12)
            .contains(&month)
            .then(|| Self::from_bits_retain(1 << (month - 1)))
    }

    pub fn contains_month(self, month: u32) -> bool {
        Self::from_month(month).is_some_and(|m| self.contains(m))
    }

    /// The selected months as 1-based numbers.
    pub fn months(self) -> Vec<u32> {
        (1..=12).filter(|m| self.contains_month(*m)).collect()
    }
}

fn bits_of<F>(value: &F) -> u64
where
    F: Flags,
    F::Bits: Into<u64>,
{
    value.bits().into()
}

/// The defined single-bit flag whose bit is `2^exponent`.
///
/// # Errors
/// Returns `ChronosetError::InvalidFlag` when no defined flag has that bit.
pub fn power_of_two<F>(exponent: u32) -> Result<F>
where
    F: Flags + Copy,
    F::Bits: Into<u64>,
{
    let bits = 1u64
        .checked_shl(exponent)
        .ok_or_else(|| ChronosetError::InvalidFlag(format!("exponent {exponent} out of range")))?;
    F::FLAGS
        .iter()
        .map(|flag| *flag.value())
        .find(|value| bits_of(value) == bits)
        .ok_or_else(|| ChronosetError::InvalidFlag(format!("no flag defined for 2^{exponent}")))
}

/// The exponent of a defined single-bit flag.
///
/// # Errors
/// Returns `ChronosetError::InvalidFlag` when `value` is not exactly one bit or
/// that bit is not a defined flag.
pub fn power_of_two_exponent<F>(value: F) -> Result<u32>
where
    F: Flags + Copy,
    F::Bits: Into<u64>,
{
    let bits = bits_of(&value);
    if !bits.is_power_of_two() {
        return Err(ChronosetError::InvalidFlag(format!(
            "{bits:#b} is not a power of two"
        )));
    }
    let defined = F::FLAGS.iter().any(|flag| bits_of(flag.value()) == bits);
    if !defined {
        return Err(ChronosetError::InvalidFlag(format!(
            "{bits:#b} is not a defined flag"
        )));
    }
    Ok(bits.trailing_zeros())
}

/// Every defined single-bit flag, in ascending bit order.
pub fn flag_values<F>() -> Vec<F>
where
    F: Flags + Copy,
    F::Bits: Into<u64>,
{
    let mut values: Vec<F> = F::FLAGS
        .iter()
        .map(|flag| *flag.value())
        .filter(|value| bits_of(value).is_power_of_two())
        .collect();
    values.sort_by_key(|value| bits_of(value));
    values
}

/// Every defined composite flag (named unions of single flags).
pub fn flagged_values<F>() -> Vec<F>
where
    F: Flags + Copy,
    F::Bits: Into<u64>,
{
    F::FLAGS
        .iter()
        .map(|flag| *flag.value())
        .filter(|value| !bits_of(value).is_power_of_two())
        .collect()
}

/// Split `value` into the single flags it contains, in ascending bit order.
/// Undefined bits are ignored.
pub fn decompose<F>(value: F) -> Vec<F>
where
    F: Flags + Copy,
    F::Bits: Into<u64>,
{
    let bits = bits_of(&value);
    flag_values::<F>()
        .into_iter()
        .filter(|single| bits & bits_of(single) != 0)
        .collect()
}

/// Whether the single flags of `value` form one unbroken run when the defined
/// single flags are laid out on a circle.
///
/// `{FRIDAY, SATURDAY, SUNDAY, MONDAY, TUESDAY}` is continuous: starting at
/// Friday and stepping one flag at a time (wrapping after Saturday) visits
/// exactly those days. `{MONDAY, WEDNESDAY, FRIDAY}` is not.
pub fn continuous_flag_values<F>(value: F) -> bool
where
    F: Flags + Copy,
    F::Bits: Into<u64>,
{
    continuous_run_start(value).is_some()
}

/// The single flag that opens the cyclic run formed by `value`, or `None` when
/// `value` is empty or not continuous. A full set starts at its lowest flag.
pub fn continuous_run_start<F>(value: F) -> Option<F>
where
    F: Flags + Copy,
    F::Bits: Into<u64>,
{
    let all = flag_values::<F>();
    let members = decompose(value);
    if members.is_empty() || all.is_empty() {
        return None;
    }

    let position = |flag: &F| all.iter().position(|f| bits_of(f) == bits_of(flag));
    (0..members.len()).find_map(|start| {
        let mut pos = position(&members[start])?;
        for step in 1..members.len() {
            pos = (pos + 1) % all.len();
            let expected = &members[(start + step) % members.len()];
            if bits_of(&all[pos]) != bits_of(expected) {
                return None;
            }
        }
        Some(members[start])
    })
}
