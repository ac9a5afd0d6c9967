//! Contiguous ranges between a lower and an upper [`Bound`].
//!
//! An interval is well-formed when its lower bound does not exceed its upper
//! bound and, when both edges sit on the same finite value, both share the same
//! direction. That leaves two degenerate shapes: the singleton `[v, v]` and the
//! empty set `(v, v)`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::bound::{Bound, BoundValue, Direction, Domain, Side};
use crate::collection::IntervalCollection;
use crate::error::{ChronosetError, Result};

/// Merge policy used when unioning intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Denominator {
    /// Coarsest partition: overlapping or touching intervals fuse into one.
    #[default]
    Highest,
    /// Finest partition: overlapping intervals are split at every boundary
    /// any of them contributes.
    Lowest,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    try_from = "IntervalRepr<T>",
    bound(deserialize = "T: Deserialize<'de> + Ord")
)]
pub struct Interval<T> {
    lower: Bound<T>,
    upper: Bound<T>,
}

#[derive(Deserialize)]
struct IntervalRepr<T> {
    lower: Bound<T>,
    upper: Bound<T>,
}

impl<T: Ord> TryFrom<IntervalRepr<T>> for Interval<T> {
    type Error = ChronosetError;

    fn try_from(repr: IntervalRepr<T>) -> Result<Self> {
        Interval::new(repr.lower, repr.upper)
    }
}

impl<T: Ord> Interval<T> {
    /// Build an interval from two bounds.
    ///
    /// # Errors
    /// Returns `ChronosetError::InvalidInterval` when the bounds are on the
    /// wrong sides, when the lower value exceeds the upper value, or when both
    /// sit on the same value with different directions (e.g. `[3, 3)`).
    pub fn new(lower: Bound<T>, upper: Bound<T>) -> Result<Self> {
        if lower.side() != Side::Lower || upper.side() != Side::Upper {
            return Err(ChronosetError::InvalidInterval(
                "expected a lower bound followed by an upper bound".to_string(),
            ));
        }
        match lower.value().cmp(upper.value()) {
            Ordering::Greater => Err(ChronosetError::InvalidInterval(
                "lower bound exceeds upper bound".to_string(),
            )),
            Ordering::Equal if lower.direction() != upper.direction() => {
                Err(ChronosetError::InvalidInterval(
                    "bounds on the same value must share a direction".to_string(),
                ))
            }
            _ => Ok(Self { lower, upper }),
        }
    }

    /// `[lower, upper]`
    pub fn closed(lower: T, upper: T) -> Result<Self> {
        Self::new(
            Bound::lower(Direction::Closed, lower),
            Bound::upper(Direction::Closed, upper),
        )
    }

    /// `(lower, upper)`
    pub fn open(lower: T, upper: T) -> Result<Self> {
        Self::new(
            Bound::lower(Direction::Open, lower),
            Bound::upper(Direction::Open, upper),
        )
    }

    /// `[lower, upper)`
    pub fn closed_open(lower: T, upper: T) -> Result<Self> {
        Self::new(
            Bound::lower(Direction::Closed, lower),
            Bound::upper(Direction::Open, upper),
        )
    }

    /// `(lower, upper]`
    pub fn open_closed(lower: T, upper: T) -> Result<Self> {
        Self::new(
            Bound::lower(Direction::Open, lower),
            Bound::upper(Direction::Closed, upper),
        )
    }

    pub fn lower(&self) -> &Bound<T> {
        &self.lower
    }

    pub fn upper(&self) -> &Bound<T> {
        &self.upper
    }

    pub fn into_bounds(self) -> (Bound<T>, Bound<T>) {
        (self.lower, self.upper)
    }

    /// No value lies between the bounds.
    pub fn is_empty(&self) -> bool {
        self.lower.cut_cmp(&self.upper) != Ordering::Less
    }

    /// Exactly one value lies between the bounds: `[v, v]`.
    pub fn is_singleton(&self) -> bool {
        match (self.lower.value(), self.upper.value()) {
            (BoundValue::Finite(l), BoundValue::Finite(u)) => {
                l == u && self.lower.is_closed() && self.upper.is_closed()
            }
            _ => false,
        }
    }

    pub fn contains(&self, value: &T) -> bool {
        self.lower.admits(value) && self.upper.admits(value)
    }
}

impl<T: Ord + Clone> Interval<T> {
    /// `[value, value]`
    pub fn singleton(value: T) -> Self {
        Self {
            lower: Bound::lower(Direction::Closed, value.clone()),
            upper: Bound::upper(Direction::Closed, value),
        }
    }

    /// `(value, value)` -- the empty set, anchored at `value`.
    pub fn empty(value: T) -> Self {
        Self {
            lower: Bound::lower(Direction::Open, value.clone()),
            upper: Bound::upper(Direction::Open, value),
        }
    }

    /// The values shared by both intervals.
    ///
    /// Disjoint operands produce an empty interval anchored at the lower edge
    /// of the would-be intersection.
    pub fn intersection_with(&self, other: &Self) -> Self {
        let lower = self.lower.clone().max(other.lower.clone());
        let upper = self.upper.clone().min(other.upper.clone());

        if lower.cut_cmp(&upper) == Ordering::Less {
            return Self { lower, upper };
        }

        let anchor = lower.finite_value().or_else(|| upper.finite_value()).cloned();
        match anchor {
            Some(value) => Self::empty(value),
            None => Self { lower, upper },
        }
    }

    pub fn intersects_with(&self, other: &Self) -> bool {
        !self.intersection_with(other).is_empty()
    }
}

impl<T: Domain> Interval<T> {
    /// Every value of the domain, `(-inf, +inf)` unless [`Limits`](crate::Limits)
    /// narrowed it for `T`.
    pub fn universe() -> Self {
        Self {
            lower: Bound::lowest(),
            upper: Bound::upmost(),
        }
    }

    pub fn is_universe(&self) -> bool {
        self.lower.is_lowest() && self.upper.is_upmost()
    }

    /// `[value, +inf)`, or up to the upmost bound when [`Limits`](crate::Limits)
    /// narrow `T`.
    pub fn at_least(value: T) -> Self {
        Self {
            lower: Bound::lower(Direction::Closed, value),
            upper: Bound::upmost(),
        }
        .clipped()
    }

    /// `(value, +inf)`, clipped to the domain.
    pub fn greater_than(value: T) -> Self {
        Self {
            lower: Bound::lower(Direction::Open, value),
            upper: Bound::upmost(),
        }
        .clipped()
    }

    /// `(-inf, value]`, clipped to the domain.
    pub fn at_most(value: T) -> Self {
        Self {
            lower: Bound::lowest(),
            upper: Bound::upper(Direction::Closed, value),
        }
        .clipped()
    }

    /// `(-inf, value)`, clipped to the domain.
    pub fn less_than(value: T) -> Self {
        Self {
            lower: Bound::lowest(),
            upper: Bound::upper(Direction::Open, value),
        }
        .clipped()
    }

    /// The part of `self` inside the domain of `T`.
    pub fn clipped(&self) -> Self {
        self.intersection_with(&Self::universe())
    }

    /// Union of the two intervals under `denominator`.
    ///
    /// Intervals that neither overlap nor touch come back unchanged, ordered by
    /// lower bound.
    pub fn union_with(&self, denominator: Denominator, other: &Self) -> IntervalCollection<T> {
        IntervalCollection::new(vec![self.clone(), other.clone()]).union(denominator)
    }

    /// Values of `self` that are not in `other`.
    pub fn difference_with(&self, other: &Self) -> IntervalCollection<T> {
        other
            .complement()
            .iter()
            .map(|piece| self.intersection_with(piece))
            .filter(|piece| !piece.is_empty())
            .collect()
    }

    /// Values of the domain outside this interval: at most two intervals.
    pub fn complement(&self) -> IntervalCollection<T> {
        IntervalCollection::new(vec![self.clone()]).complement()
    }
}

impl<T: fmt::Display> fmt::Display for Interval<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.lower, self.upper)
    }
}

/// Parses interval notation: `[1, 2)`, `(-inf, 3)`, `[0, +inf)`.
impl<T> FromStr for Interval<T>
where
    T: FromStr + Ord,
    T::Err: fmt::Display,
{
    type Err = ChronosetError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let parse_err = |msg: &str| ChronosetError::Parse(format!("'{s}': {msg}"));

        let lower_direction = match s.chars().next() {
            Some('[') => Direction::Closed,
            Some('(') => Direction::Open,
            _ => return Err(parse_err("expected '[' or '('")),
        };
        let upper_direction = match s.chars().last() {
            Some(']') => Direction::Closed,
            Some(')') => Direction::Open,
            _ => return Err(parse_err("expected ']' or ')'")),
        };
        if s.len() < 2 {
            return Err(parse_err("missing bounds"));
        }

        let inner = &s[1..s.len() - 1];
        let (lo, hi) = inner
            .split_once(',')
            .ok_or_else(|| parse_err("expected two comma-separated bounds"))?;

        let lower_value = match lo.trim() {
            "-inf" | "-∞" => BoundValue::NegativeInfinity,
            text => BoundValue::Finite(
                text.parse::<T>()
                    .map_err(|e| parse_err(&format!("bad lower bound: {e}")))?,
            ),
        };
        let upper_value = match hi.trim() {
            "inf" | "+inf" | "∞" | "+∞" => BoundValue::PositiveInfinity,
            text => BoundValue::Finite(
                text.parse::<T>()
                    .map_err(|e| parse_err(&format!("bad upper bound: {e}")))?,
            ),
        };

        let lower = Bound::try_new(Side::Lower, lower_direction, lower_value)?;
        let upper = Bound::try_new(Side::Upper, upper_direction, upper_value)?;
        Self::new(lower, upper)
    }
}
