//! Interval and collection algebra over integers, dates and custom domains.

use chrono::NaiveDate;
use chronoset::{
    Bound, BoundValue, ChronosetError, Denominator, Direction, Interval, IntervalCollection,
    Limits, Side,
};

fn iv(s: &str) -> Interval<i64> {
    s.parse().unwrap()
}

fn collection(items: &[&str]) -> IntervalCollection<i64> {
    items.iter().map(|s| iv(s)).collect()
}

// ---------------------------------------------------------------------------
// Union denominators
// ---------------------------------------------------------------------------

#[test]
fn worked_example_highest_is_one_interval() {
    let result = collection(&["(-inf, 3)", "(0, 5)", "[1, 2]"]).union(Denominator::Highest);
    assert_eq!(result.len(), 1);
    assert_eq!(result[0], iv("(-inf, 5)"));
}

#[test]
fn worked_example_lowest_is_five_intervals() {
    let result = collection(&["(-inf, 3)", "(0, 5)", "[1, 2]"]).union(Denominator::Lowest);
    let rendered: Vec<String> = result.iter().map(ToString::to_string).collect();
    assert_eq!(
        rendered,
        vec!["(-inf, 0]", "(0, 1)", "[1, 2]", "(2, 3)", "[3, 5)"]
    );
}

#[test]
fn union_order_of_input_does_not_matter() {
    let a = collection(&["[1, 2]", "(0, 5)", "(-inf, 3)"]).union(Denominator::Lowest);
    let b = collection(&["(-inf, 3)", "(0, 5)", "[1, 2]"]).union(Denominator::Lowest);
    assert_eq!(a, b);
}

#[test]
fn closed_edges_touching_at_a_point_merge() {
    let result = iv("[0, 3]").union_with(Denominator::Highest, &iv("[3, 6)"));
    assert_eq!(result.as_slice(), &[iv("[0, 6)")]);
}

#[test]
fn lowest_union_of_disjoint_members_keeps_them() {
    let result = collection(&["[8, 9]", "[0, 1]"]).union(Denominator::Lowest);
    assert_eq!(result.as_slice(), &[iv("[0, 1]"), iv("[8, 9]")]);
}

#[test]
fn lowest_union_isolates_shared_point() {
    let result = collection(&["[0, 3]", "[3, 6]"]).union(Denominator::Lowest);
    assert_eq!(
        result.as_slice(),
        &[iv("[0, 3)"), Interval::singleton(3), iv("(3, 6]")]
    );
}

#[test]
fn highest_union_is_disjoint_and_sorted() {
    let result = collection(&["[10, 12]", "(2, 4)", "[4, 5]", "(-inf, -3]", "[11, 20)"])
        .union(Denominator::Highest);
    assert_eq!(
        result.as_slice(),
        &[iv("(-inf, -3]"), iv("(2, 5]"), iv("[10, 20)")]
    );
}

// ---------------------------------------------------------------------------
// Complement and difference
// ---------------------------------------------------------------------------

#[test]
fn complement_round_trip_restores_interval() {
    for text in ["[1, 4)", "(-inf, 2]", "(0, +inf)", "[5, 5]"] {
        let original = iv(text);
        let back = IntervalCollection::new(original.complement().into_vec())
            .complement()
            .union(Denominator::Highest);
        assert_eq!(back.as_slice(), &[original], "round trip of {text}");
    }
}

#[test]
fn complement_of_singleton_is_two_open_rays() {
    let result = Interval::singleton(7i64).complement();
    assert_eq!(result.as_slice(), &[iv("(-inf, 7)"), iv("(7, +inf)")]);
}

#[test]
fn collection_complement_follows_de_morgan() {
    let members = collection(&["[0, 2]", "[1, 3)", "(5, 6]"]);
    let complement = members.complement();
    assert_eq!(
        complement.as_slice(),
        &[iv("(-inf, 0)"), iv("[3, 5]"), iv("(6, +inf)")]
    );
    for value in -2..9 {
        assert_ne!(members.contains(&value), complement.contains(&value), "{value}");
    }
}

#[test]
fn difference_with_disjoint_is_self() {
    let result = iv("[0, 2]").difference_with(&iv("[5, 6]"));
    assert_eq!(result.as_slice(), &[iv("[0, 2]")]);
}

#[test]
fn difference_with_superset_is_empty() {
    assert!(iv("[1, 2]").difference_with(&iv("(0, 3)")).is_empty());
}

// ---------------------------------------------------------------------------
// Other domains
// ---------------------------------------------------------------------------

#[test]
fn date_intervals() {
    let d = |m, day| NaiveDate::from_ymd_opt(2026, m, day).unwrap();
    let march = Interval::closed_open(d(3, 1), d(4, 1)).unwrap();
    let spring = Interval::closed(d(3, 20), d(6, 20)).unwrap();
    let overlap = march.intersection_with(&spring);
    assert_eq!(overlap, Interval::closed_open(d(3, 20), d(4, 1)).unwrap());
    assert!(overlap.contains(&d(3, 31)));
    assert!(!overlap.contains(&d(4, 1)));
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Minute(u16);

#[test]
fn configured_limits_bound_the_universe() {
    Limits::configure(
        Bound::lower(Direction::Closed, Minute(0)),
        Bound::upper(Direction::Open, Minute(1440)),
    )
    .unwrap();

    let busy = Interval::closed_open(Minute(540), Minute(1020)).unwrap();
    let free = busy.complement();
    assert_eq!(
        free.as_slice(),
        &[
            Interval::closed_open(Minute(0), Minute(540)).unwrap(),
            Interval::closed_open(Minute(1020), Minute(1440)).unwrap(),
        ]
    );
    assert!(Interval::<Minute>::universe().is_universe());

    Limits::clear::<Minute>();
    assert_eq!(Interval::<Minute>::universe().lower(), &Bound::negative_infinity());
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Percent(u8);

#[test]
fn configured_limits_clip_rays_unions_and_complements() {
    Limits::configure(
        Bound::lower(Direction::Closed, Percent(0)),
        Bound::upper(Direction::Closed, Percent(100)),
    )
    .unwrap();
    let pct = |lo, hi| Interval::closed(Percent(lo), Percent(hi)).unwrap();

    assert_eq!(Interval::at_least(Percent(50)), pct(50, 100));
    assert_eq!(Interval::at_most(Percent(150)), pct(0, 100));
    assert!(Interval::greater_than(Percent(100)).is_empty());

    let pieces =
        IntervalCollection::new(vec![Interval::at_least(Percent(50)), Interval::universe()])
            .union(Denominator::Lowest);
    assert_eq!(
        pieces.as_slice(),
        &[
            Interval::closed_open(Percent(0), Percent(50)).unwrap(),
            pct(50, 100),
        ]
    );

    // Members beyond the domain clip to nothing.
    let outside = pct(200, 250);
    assert_eq!(outside.complement().as_slice(), &[pct(0, 100)]);
    assert!(IntervalCollection::new(vec![outside])
        .union(Denominator::Highest)
        .is_empty());

    Limits::clear::<Percent>();
}

// ---------------------------------------------------------------------------
// Construction and text form
// ---------------------------------------------------------------------------

#[test]
fn closed_infinite_bound_fails_to_construct() {
    let result =
        Bound::<i64>::try_new(Side::Upper, Direction::Closed, BoundValue::PositiveInfinity);
    assert!(matches!(result, Err(ChronosetError::InvalidBound(_))));
    assert!("[-inf, 0)".parse::<Interval<i64>>().is_err());
}

#[test]
fn unicode_infinity_is_accepted() {
    assert_eq!(iv("(-∞, +∞)"), Interval::universe());
    assert_eq!(iv("[0, ∞)"), Interval::at_least(0));
}

#[test]
fn serde_rejects_malformed_intervals() {
    let good = r#"{"lower":{"side":"lower","direction":"closed","value":{"finite":1}},
                   "upper":{"side":"upper","direction":"open","value":{"finite":4}}}"#;
    let parsed: Interval<i64> = serde_json::from_str(good).unwrap();
    assert_eq!(parsed, iv("[1, 4)"));

    let reversed = r#"{"lower":{"side":"lower","direction":"closed","value":{"finite":9}},
                       "upper":{"side":"upper","direction":"open","value":{"finite":4}}}"#;
    assert!(serde_json::from_str::<Interval<i64>>(reversed).is_err());
}

#[test]
fn serde_collection_validates_every_member() {
    let json = r#"[
        {"lower":{"side":"lower","direction":"closed","value":{"finite":5}},
         "upper":{"side":"upper","direction":"closed","value":{"finite":6}}},
        {"lower":{"side":"lower","direction":"open","value":"negative_infinity"},
         "upper":{"side":"upper","direction":"open","value":{"finite":2}}}
    ]"#;
    let parsed: IntervalCollection<i64> = serde_json::from_str(json).unwrap();
    assert_eq!(parsed.as_slice(), &[iv("[5, 6]"), iv("(-inf, 2)")]);

    let back: IntervalCollection<i64> =
        serde_json::from_str(&serde_json::to_string(&parsed).unwrap()).unwrap();
    assert_eq!(back, parsed);

    let bad = r#"[{"lower":{"side":"lower","direction":"closed","value":{"finite":3}},
                   "upper":{"side":"upper","direction":"open","value":{"finite":3}}}]"#;
    assert!(serde_json::from_str::<IntervalCollection<i64>>(bad).is_err());
}
