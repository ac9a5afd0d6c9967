//! Interval boundaries -- a value, the side it closes, and whether it admits
//! the boundary value itself.
//!
//! Infinity is an explicit [`BoundValue`] variant rather than a sentinel of
//! `T`, so types whose default value is meaningful (`0`, midnight, the epoch)
//! never silently turn into an unbounded edge.
//!
//! The outermost bounds of a value domain default to `(-inf` and `+inf)`.
//! They can be narrowed per type with [`Limits::configure`], which affects every
//! interval of that type created or combined afterwards.

use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::{LazyLock, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{ChronosetError, Result};

/// Value types an interval can range over.
///
/// Blanket-implemented for every `Ord + Clone` type that can live in the
/// process-wide [`Limits`] registry.
pub trait Domain: Ord + Clone + Send + Sync + 'static {}

impl<T: Ord + Clone + Send + Sync + 'static> Domain for T {}

/// Which edge of an interval a bound closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Lower,
    Upper,
}

impl Side {
    pub fn reverse(self) -> Self {
        match self {
            Side::Lower => Side::Upper,
            Side::Upper => Side::Lower,
        }
    }
}

/// Whether the boundary value belongs to the interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Open,
    Closed,
}

impl Direction {
    pub fn reverse(self) -> Self {
        match self {
            Direction::Open => Direction::Closed,
            Direction::Closed => Direction::Open,
        }
    }
}

/// A boundary value: finite, or one of the two infinities.
///
/// Variant order gives the total order `-inf < Finite(_) < +inf`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundValue<T> {
    NegativeInfinity,
    Finite(T),
    PositiveInfinity,
}

impl<T> BoundValue<T> {
    pub fn is_infinite(&self) -> bool {
        !matches!(self, BoundValue::Finite(_))
    }

    pub fn finite(&self) -> Option<&T> {
        match self {
            BoundValue::Finite(v) => Some(v),
            _ => None,
        }
    }
}

impl<T: fmt::Display> fmt::Display for BoundValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundValue::NegativeInfinity => write!(f, "-inf"),
            BoundValue::Finite(v) => write!(f, "{v}"),
            BoundValue::PositiveInfinity => write!(f, "+inf"),
        }
    }
}

/// One edge of an interval.
///
/// Bounds are totally ordered by the *cut* they make in the value line: a
/// closed lower bound at `v` cuts just before `v`, an open lower bound just
/// after it; an open upper bound cuts just before `v`, a closed upper bound
/// just after it. At equal values this keeps inclusive bounds wider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "BoundRepr<T>")]
pub struct Bound<T> {
    side: Side,
    direction: Direction,
    value: BoundValue<T>,
}

#[derive(Deserialize)]
struct BoundRepr<T> {
    side: Side,
    direction: Direction,
    value: BoundValue<T>,
}

impl<T> TryFrom<BoundRepr<T>> for Bound<T> {
    type Error = ChronosetError;

    fn try_from(repr: BoundRepr<T>) -> Result<Self> {
        Bound::try_new(repr.side, repr.direction, repr.value)
    }
}

impl<T> Bound<T> {
    /// Build a bound, rejecting combinations that cannot describe an edge.
    ///
    /// # Errors
    /// Returns `ChronosetError::InvalidBound` when an infinite bound is closed,
    /// or when the infinity points away from the side (`+inf` as a lower bound,
    /// `-inf` as an upper bound).
    pub fn try_new(side: Side, direction: Direction, value: BoundValue<T>) -> Result<Self> {
        if value.is_infinite() && direction == Direction::Closed {
            return Err(ChronosetError::InvalidBound(
                "an infinite bound cannot be closed".to_string(),
            ));
        }
        match (side, &value) {
            (Side::Lower, BoundValue::PositiveInfinity) => Err(ChronosetError::InvalidBound(
                "a lower bound cannot be +inf".to_string(),
            )),
            (Side::Upper, BoundValue::NegativeInfinity) => Err(ChronosetError::InvalidBound(
                "an upper bound cannot be -inf".to_string(),
            )),
            _ => Ok(Self {
                side,
                direction,
                value,
            }),
        }
    }

    pub fn lower(direction: Direction, value: T) -> Self {
        Self {
            side: Side::Lower,
            direction,
            value: BoundValue::Finite(value),
        }
    }

    pub fn upper(direction: Direction, value: T) -> Self {
        Self {
            side: Side::Upper,
            direction,
            value: BoundValue::Finite(value),
        }
    }

    pub fn negative_infinity() -> Self {
        Self {
            side: Side::Lower,
            direction: Direction::Open,
            value: BoundValue::NegativeInfinity,
        }
    }

    pub fn positive_infinity() -> Self {
        Self {
            side: Side::Upper,
            direction: Direction::Open,
            value: BoundValue::PositiveInfinity,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn value(&self) -> &BoundValue<T> {
        &self.value
    }

    pub fn finite_value(&self) -> Option<&T> {
        self.value.finite()
    }

    pub fn is_infinite(&self) -> bool {
        self.value.is_infinite()
    }

    pub fn is_open(&self) -> bool {
        self.direction == Direction::Open
    }

    pub fn is_closed(&self) -> bool {
        self.direction == Direction::Closed
    }

    /// 0 when the bound cuts just before its value, 1 when just after.
    fn cut_rank(&self) -> u8 {
        match (self.side, self.direction) {
            (Side::Lower, Direction::Closed) | (Side::Upper, Direction::Open) => 0,
            (Side::Lower, Direction::Open) | (Side::Upper, Direction::Closed) => 1,
        }
    }
}

impl<T: Clone> Bound<T> {
    /// The bound on the other side of the same cut: `[3` becomes `3)`,
    /// `3]` becomes `(3`. Infinite bounds have no counterpart.
    pub fn reverse(&self) -> Option<Self> {
        match &self.value {
            BoundValue::Finite(v) => Some(Self {
                side: self.side.reverse(),
                direction: self.direction.reverse(),
                value: BoundValue::Finite(v.clone()),
            }),
            _ => None,
        }
    }
}

impl<T: Ord> Bound<T> {
    /// Compare the cut positions of two bounds, ignoring their sides.
    ///
    /// `a.cut_cmp(&b) == Equal` means the bounds split the value line at the
    /// same place, e.g. `3)` and `[3`.
    pub fn cut_cmp(&self, other: &Self) -> Ordering {
        self.value
            .cmp(&other.value)
            .then_with(|| match (&self.value, &other.value) {
                (BoundValue::Finite(_), BoundValue::Finite(_)) => {
                    self.cut_rank().cmp(&other.cut_rank())
                }
                _ => Ordering::Equal,
            })
    }

    /// Whether `value` lies on the inner side of this bound.
    pub fn admits(&self, value: &T) -> bool {
        match (&self.value, self.side) {
            (BoundValue::NegativeInfinity, _) | (BoundValue::PositiveInfinity, _) => {
                // Only -inf lower and +inf upper exist; both admit everything.
                true
            }
            (BoundValue::Finite(b), Side::Lower) => match value.cmp(b) {
                Ordering::Greater => true,
                Ordering::Equal => self.is_closed(),
                Ordering::Less => false,
            },
            (BoundValue::Finite(b), Side::Upper) => match value.cmp(b) {
                Ordering::Less => true,
                Ordering::Equal => self.is_closed(),
                Ordering::Greater => false,
            },
        }
    }
}

impl<T: Ord> PartialOrd for Bound<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Ord> Ord for Bound<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cut_cmp(other)
            .then_with(|| self.side.cmp(&other.side))
            .then_with(|| self.direction.cmp(&other.direction))
    }
}

impl<T: Domain> Bound<T> {
    /// The lowest bound of `T`'s domain (see [`Limits`]).
    pub fn lowest() -> Self {
        Limits::lowest::<T>()
    }

    /// The upmost bound of `T`'s domain (see [`Limits`]).
    pub fn upmost() -> Self {
        Limits::upmost::<T>()
    }

    pub fn is_lowest(&self) -> bool {
        *self == Self::lowest()
    }

    pub fn is_upmost(&self) -> bool {
        *self == Self::upmost()
    }
}

impl<T: fmt::Display> fmt::Display for Bound<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.side, self.direction) {
            (Side::Lower, Direction::Open) => write!(f, "({}", self.value),
            (Side::Lower, Direction::Closed) => write!(f, "[{}", self.value),
            (Side::Upper, Direction::Open) => write!(f, "{})", self.value),
            (Side::Upper, Direction::Closed) => write!(f, "{}]", self.value),
        }
    }
}

type LimitsEntry = Box<dyn Any + Send + Sync>;

static LIMITS: LazyLock<RwLock<HashMap<TypeId, LimitsEntry>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Process-wide, per-type registry of the outermost bounds of a value domain.
///
/// Without configuration a type ranges over `(-inf, +inf)`. Configuring a type
/// changes what [`Interval::universe`](crate::Interval::universe) and every
/// complement of that type produce from then on.
pub struct Limits;

impl Limits {
    /// Narrow the domain of `T` to `lowest ..= upmost`.
    ///
    /// # Errors
    /// Returns `ChronosetError::InvalidBound` when `lowest` is not a lower
    /// bound, `upmost` is not an upper bound, or `lowest` does not sit below
    /// `upmost`.
    pub fn configure<T: Domain>(lowest: Bound<T>, upmost: Bound<T>) -> Result<()> {
        if lowest.side() != Side::Lower || upmost.side() != Side::Upper {
            return Err(ChronosetError::InvalidBound(
                "domain limits must be a lower and an upper bound".to_string(),
            ));
        }
        if lowest.cut_cmp(&upmost) != Ordering::Less {
            return Err(ChronosetError::InvalidBound(
                "the lowest bound must sit below the upmost bound".to_string(),
            ));
        }
        LIMITS
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeId::of::<T>(), Box::new((lowest, upmost)));
        Ok(())
    }

    /// Restore the unbounded default domain for `T`.
    pub fn clear<T: Domain>() {
        LIMITS
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&TypeId::of::<T>());
    }

    pub fn lowest<T: Domain>() -> Bound<T> {
        Self::get::<T>()
            .map(|(lowest, _)| lowest)
            .unwrap_or_else(Bound::negative_infinity)
    }

    pub fn upmost<T: Domain>() -> Bound<T> {
        Self::get::<T>()
            .map(|(_, upmost)| upmost)
            .unwrap_or_else(Bound::positive_infinity)
    }

    fn get<T: Domain>() -> Option<(Bound<T>, Bound<T>)> {
        LIMITS
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<(Bound<T>, Bound<T>)>())
            .cloned()
    }
}
