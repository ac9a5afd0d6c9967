//! Ordered, read-only sequences of intervals and their set operations.
//!
//! Construction keeps the intervals as given. [`IntervalCollection::union`]
//! returns the canonical form: sorted by lower bound and pairwise disjoint.

use std::cmp::Ordering;
use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::bound::{Bound, Domain, Side};
use crate::interval::{Denominator, Interval};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent, bound(deserialize = "T: Deserialize<'de> + Ord"))]
pub struct IntervalCollection<T> {
    intervals: Vec<Interval<T>>,
}

impl<T> Default for IntervalCollection<T> {
    fn default() -> Self {
        Self {
            intervals: Vec::new(),
        }
    }
}

impl<T> IntervalCollection<T> {
    pub fn new(intervals: Vec<Interval<T>>) -> Self {
        Self { intervals }
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Interval<T>> {
        self.intervals.iter()
    }

    pub fn as_slice(&self) -> &[Interval<T>] {
        &self.intervals
    }

    pub fn into_vec(self) -> Vec<Interval<T>> {
        self.intervals
    }
}

impl<T: Ord> IntervalCollection<T> {
    /// Whether any member interval contains `value`.
    pub fn contains(&self, value: &T) -> bool {
        self.intervals.iter().any(|i| i.contains(value))
    }
}

impl<T: Domain> IntervalCollection<T> {
    /// Values shared by every member. An empty collection yields the universe.
    pub fn intersection(&self) -> Interval<T> {
        self.intervals
            .iter()
            .fold(Interval::universe(), |acc, i| acc.intersection_with(i))
    }

    /// Canonical union of the members under `denominator`.
    ///
    /// Members are sorted by lower bound and swept left to right; every run of
    /// overlapping or touching members becomes one component. With
    /// [`Denominator::Highest`] a component is emitted as a single interval; with
    /// [`Denominator::Lowest`] it is split at every boundary its members carry.
    /// Members are clipped to the domain of `T` first; empty members
    /// contribute nothing.
    pub fn union(&self, denominator: Denominator) -> Self {
        let mut sorted: Vec<Interval<T>> = self
            .intervals
            .iter()
            .map(Interval::clipped)
            .filter(|i| !i.is_empty())
            .collect();
        sorted.sort_by(|a, b| {
            a.lower()
                .cmp(b.lower())
                .then_with(|| a.upper().cmp(b.upper()))
        });

        let mut components: Vec<(Vec<&Interval<T>>, Bound<T>)> = Vec::new();
        for interval in &sorted {
            // Touching counts: `3)` followed by `[3` cut at the same spot.
            let joins = components
                .last()
                .is_some_and(|(_, reach)| interval.lower().cut_cmp(reach) != Ordering::Greater);
            if !joins {
                components.push((vec![interval], interval.upper().clone()));
            } else if let Some((members, reach)) = components.last_mut() {
                members.push(interval);
                if interval.upper() > &*reach {
                    *reach = interval.upper().clone();
                }
            }
        }

        let mut result = Vec::new();
        for (members, reach) in components {
            match denominator {
                Denominator::Highest => {
                    if let Ok(merged) = Interval::new(members[0].lower().clone(), reach) {
                        result.push(merged);
                    }
                }
                Denominator::Lowest => result.extend(partition(&members)),
            }
        }
        Self::new(result)
    }

    /// Values of the domain outside every member.
    pub fn complement(&self) -> Self {
        let canonical = self.union(Denominator::Highest);
        let upmost = Bound::upmost();

        let mut result = Vec::new();
        // Lower bound of the next gap; `None` once a member reaches +inf.
        let mut cursor = Some(Bound::lowest());
        for interval in canonical.iter() {
            if let Some(start) = &cursor {
                if start.cut_cmp(interval.lower()) == Ordering::Less {
                    if let Some(end) = interval.lower().reverse() {
                        if let Ok(gap) = Interval::new(start.clone(), end) {
                            result.push(gap);
                        }
                    }
                }
            }
            let next = interval.upper().reverse();
            cursor = match (cursor, next) {
                (Some(current), Some(next)) => Some(current.max(next)),
                (_, next) => next,
            };
        }
        if let Some(start) = cursor {
            if start.cut_cmp(&upmost) == Ordering::Less {
                if let Ok(gap) = Interval::new(start, upmost) {
                    result.push(gap);
                }
            }
        }
        Self::new(result)
    }
}

/// Split a connected run of intervals at every cut its members introduce.
fn partition<T: Domain>(members: &[&Interval<T>]) -> Vec<Interval<T>> {
    let mut cuts: Vec<&Bound<T>> = members
        .iter()
        .flat_map(|i| [i.lower(), i.upper()])
        .collect();
    cuts.sort_by(|a, b| a.cut_cmp(b));
    cuts.dedup_by(|a, b| a.cut_cmp(b) == Ordering::Equal);

    cuts.windows(2)
        .filter_map(|pair| {
            let lower = as_side(pair[0], Side::Lower)?;
            let upper = as_side(pair[1], Side::Upper)?;
            Interval::new(lower, upper).ok()
        })
        .collect()
}

fn as_side<T: Clone>(bound: &Bound<T>, side: Side) -> Option<Bound<T>> {
    if bound.side() == side {
        Some(bound.clone())
    } else {
        bound.reverse()
    }
}

impl<T> Index<usize> for IntervalCollection<T> {
    type Output = Interval<T>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.intervals[index]
    }
}

impl<T> From<Vec<Interval<T>>> for IntervalCollection<T> {
    fn from(intervals: Vec<Interval<T>>) -> Self {
        Self::new(intervals)
    }
}

impl<T> FromIterator<Interval<T>> for IntervalCollection<T> {
    fn from_iter<I: IntoIterator<Item = Interval<T>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<T> IntoIterator for IntervalCollection<T> {
    type Item = Interval<T>;
    type IntoIter = std::vec::IntoIter<Interval<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.intervals.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a IntervalCollection<T> {
    type Item = &'a Interval<T>;
    type IntoIter = std::slice::Iter<'a, Interval<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.intervals.iter()
    }
}
