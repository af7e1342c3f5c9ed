//! Comparison semantics for constraints.
//!
//! Every function here is pure and total: no hidden state, no panics. A
//! comparison against a value of the wrong kind is simply `false`; the
//! engine checks [`Comparator::accepts`] first and reports a type mismatch
//! instead of ever relying on that.
//!
//! Margins are signed so that a positive distance always means "comfortably
//! passing" and a negative one means "this far into violation".

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::candidate::{Interval, PropertyValue, ValueKind};

/// observed > limit
pub fn greater_than(observed: f64, limit: f64) -> bool {
    observed > limit
}

/// observed < limit
pub fn less_than(observed: f64, limit: f64) -> bool {
    observed < limit
}

/// observed ≥ limit
pub fn at_least(observed: f64, limit: f64) -> bool {
    observed >= limit
}

/// observed ≤ limit
pub fn at_most(observed: f64, limit: f64) -> bool {
    observed <= limit
}

/// low ≤ observed ≤ high
pub fn within_range(observed: f64, low: f64, high: f64) -> bool {
    low <= observed && observed <= high
}

/// observed < low or observed > high
pub fn outside_range(observed: f64, low: f64, high: f64) -> bool {
    observed < low || observed > high
}

/// Exact equality; values of different kinds are never equal.
pub fn equals(observed: &PropertyValue, expected: &PropertyValue) -> bool {
    observed == expected
}

/// The closed set of comparison semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    GreaterThan,
    LessThan,
    AtLeast,
    AtMost,
    WithinRange,
    OutsideRange,
    Equals,
}

/// How many threshold values a comparator takes, and of what kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// One numeric bound
    Bound,
    /// Two numeric bounds, low < high
    Range,
    /// One value of any kind
    Exact,
}

impl Arity {
    pub fn value_count(&self) -> usize {
        match self {
            Arity::Bound | Arity::Exact => 1,
            Arity::Range => 2,
        }
    }
}

/// Which side of a single bound is acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Values above the bound pass (`greater_than`, `at_least`).
    Lower,
    /// Values below the bound pass (`less_than`, `at_most`).
    Upper,
}

/// Threshold values, shaped by the comparator that interprets them.
#[derive(Debug, Clone, PartialEq)]
pub enum Threshold {
    Bound(f64),
    Range { low: f64, high: f64 },
    Exact(PropertyValue),
}

impl Threshold {
    /// Flatten into the value list used by documents.
    pub fn to_values(&self) -> Vec<PropertyValue> {
        match self {
            Threshold::Bound(limit) => vec![PropertyValue::Number(*limit)],
            Threshold::Range { low, high } => {
                vec![PropertyValue::Number(*low), PropertyValue::Number(*high)]
            }
            Threshold::Exact(value) => vec![value.clone()],
        }
    }

    /// Apply `f` to every numeric bound. Exact thresholds are returned unchanged.
    pub fn map_bounds(&self, f: impl Fn(f64) -> f64) -> Threshold {
        match self {
            Threshold::Bound(limit) => Threshold::Bound(f(*limit)),
            Threshold::Range { low, high } => Threshold::Range {
                low: f(*low),
                high: f(*high),
            },
            Threshold::Exact(value) => Threshold::Exact(value.clone()),
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::Bound(limit) => write!(f, "{}", limit),
            Threshold::Range { low, high } => write!(f, "[{}, {}]", low, high),
            Threshold::Exact(value) => write!(f, "{}", value),
        }
    }
}

impl Comparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::GreaterThan => "greater_than",
            Comparator::LessThan => "less_than",
            Comparator::AtLeast => "at_least",
            Comparator::AtMost => "at_most",
            Comparator::WithinRange => "within_range",
            Comparator::OutsideRange => "outside_range",
            Comparator::Equals => "equals",
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            Comparator::GreaterThan
            | Comparator::LessThan
            | Comparator::AtLeast
            | Comparator::AtMost => Arity::Bound,
            Comparator::WithinRange | Comparator::OutsideRange => Arity::Range,
            Comparator::Equals => Arity::Exact,
        }
    }

    /// Acceptable side for single-bound comparators.
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Comparator::GreaterThan | Comparator::AtLeast => Some(Direction::Lower),
            Comparator::LessThan | Comparator::AtMost => Some(Direction::Upper),
            _ => None,
        }
    }

    /// Whether `observed` is of a kind this comparator can test against `threshold`.
    pub fn accepts(&self, observed: &PropertyValue, threshold: &Threshold) -> bool {
        match (self.arity(), threshold) {
            (Arity::Exact, Threshold::Exact(expected)) => observed.kind() == expected.kind(),
            (Arity::Bound, Threshold::Bound(_)) | (Arity::Range, Threshold::Range { .. }) => {
                observed.kind() == ValueKind::Number
            }
            _ => false,
        }
    }

    /// Test an observed value. Values the comparator does not accept never hold.
    pub fn holds(&self, observed: &PropertyValue, threshold: &Threshold) -> bool {
        match (self, threshold) {
            (Comparator::Equals, Threshold::Exact(expected)) => equals(observed, expected),
            _ => match observed.as_number() {
                Some(x) => self.holds_number(x, threshold),
                None => false,
            },
        }
    }

    fn holds_number(&self, x: f64, threshold: &Threshold) -> bool {
        match (self, threshold) {
            (Comparator::GreaterThan, Threshold::Bound(limit)) => greater_than(x, *limit),
            (Comparator::LessThan, Threshold::Bound(limit)) => less_than(x, *limit),
            (Comparator::AtLeast, Threshold::Bound(limit)) => at_least(x, *limit),
            (Comparator::AtMost, Threshold::Bound(limit)) => at_most(x, *limit),
            (Comparator::WithinRange, Threshold::Range { low, high }) => {
                within_range(x, *low, *high)
            }
            (Comparator::OutsideRange, Threshold::Range { low, high }) => {
                outside_range(x, *low, *high)
            }
            (Comparator::Equals, Threshold::Exact(expected)) => {
                equals(&PropertyValue::Number(x), expected)
            }
            _ => false,
        }
    }

    /// Signed distance between `observed` and the threshold, positive when passing.
    ///
    /// `None` unless both sides are numeric and the result is finite.
    pub fn distance(&self, observed: &PropertyValue, threshold: &Threshold) -> Option<f64> {
        let x = observed.as_number()?;
        let d = match (self, threshold) {
            (Comparator::GreaterThan | Comparator::AtLeast, Threshold::Bound(limit)) => x - limit,
            (Comparator::LessThan | Comparator::AtMost, Threshold::Bound(limit)) => limit - x,
            (Comparator::WithinRange, Threshold::Range { low, high }) => (x - low).min(high - x),
            (Comparator::OutsideRange, Threshold::Range { low, high }) => (low - x).max(x - high),
            (Comparator::Equals, Threshold::Exact(PropertyValue::Number(expected))) => {
                -(x - expected).abs()
            }
            _ => return None,
        };
        d.is_finite().then_some(d)
    }

    /// The end of `interval` a single-bound comparator is judged on: the
    /// lower end for lower bounds, the upper end for upper bounds.
    pub fn pessimistic_value(&self, interval: &Interval) -> Option<f64> {
        match self.direction()? {
            Direction::Lower => Some(interval.lower),
            Direction::Upper => Some(interval.upper),
        }
    }

    /// Test the pessimistic end of an uncertainty interval.
    ///
    /// Lower-bound comparators look at `interval.lower`, upper-bound ones at
    /// `interval.upper`, and range comparators require the whole interval to
    /// satisfy them. Returns `(holds, margin)`.
    pub fn holds_worst_case(
        &self,
        interval: &Interval,
        threshold: &Threshold,
    ) -> (bool, Option<f64>) {
        let finite = |d: f64| d.is_finite().then_some(d);
        match (self, threshold) {
            (_, Threshold::Bound(_)) => match self.pessimistic_value(interval) {
                Some(x) => {
                    let value = PropertyValue::Number(x);
                    (self.holds(&value, threshold), self.distance(&value, threshold))
                }
                None => (false, None),
            },
            (Comparator::WithinRange, Threshold::Range { low, high }) => (
                within_range(interval.lower, *low, *high)
                    && within_range(interval.upper, *low, *high),
                finite((interval.lower - low).min(high - interval.upper)),
            ),
            (Comparator::OutsideRange, Threshold::Range { low, high }) => (
                interval.upper < *low || interval.lower > *high,
                finite((low - interval.upper).max(interval.lower - high)),
            ),
            _ => (false, None),
        }
    }

    /// Whether every value accepted under `tightened` is also accepted under `base`.
    ///
    /// Both thresholds are interpreted with this comparator.
    pub fn is_at_least_as_strict(&self, tightened: &Threshold, base: &Threshold) -> bool {
        match (self, tightened, base) {
            (_, Threshold::Bound(new), Threshold::Bound(old)) => match self.direction() {
                Some(Direction::Lower) => new >= old,
                Some(Direction::Upper) => new <= old,
                None => false,
            },
            (
                Comparator::WithinRange,
                Threshold::Range { low: nl, high: nh },
                Threshold::Range { low: ol, high: oh },
            ) => nl >= ol && nh <= oh,
            (
                Comparator::OutsideRange,
                Threshold::Range { low: nl, high: nh },
                Threshold::Range { low: ol, high: oh },
            ) => nl <= ol && nh >= oh,
            (Comparator::Equals, Threshold::Exact(new), Threshold::Exact(old)) => new == old,
            _ => false,
        }
    }

    /// Human-readable requirement, e.g. `≥ 10` or `within [300, 550]`.
    pub fn requirement(&self, threshold: &Threshold) -> String {
        match self {
            Comparator::GreaterThan => format!("> {}", threshold),
            Comparator::LessThan => format!("< {}", threshold),
            Comparator::AtLeast => format!("≥ {}", threshold),
            Comparator::AtMost => format!("≤ {}", threshold),
            Comparator::WithinRange => format!("within {}", threshold),
            Comparator::OutsideRange => format!("outside {}", threshold),
            Comparator::Equals => format!("= {}", threshold),
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(x: f64) -> PropertyValue {
        PropertyValue::Number(x)
    }

    #[test]
    fn test_scalar_comparators() {
        assert!(greater_than(5.0, 4.0));
        assert!(!greater_than(4.0, 4.0));
        assert!(less_than(3.0, 4.0));
        assert!(!less_than(4.0, 4.0));
        assert!(at_least(4.0, 4.0));
        assert!(at_most(4.0, 4.0));
        assert!(!at_most(4.1, 4.0));
    }

    #[test]
    fn test_range_comparators_are_inclusive() {
        assert!(within_range(300.0, 300.0, 550.0));
        assert!(within_range(550.0, 300.0, 550.0));
        assert!(!within_range(550.1, 300.0, 550.0));
        assert!(outside_range(299.9, 300.0, 550.0));
        assert!(!outside_range(300.0, 300.0, 550.0));
    }

    #[test]
    fn test_nan_never_passes_numeric_comparators() {
        let nan = num(f64::NAN);
        for comparator in [Comparator::AtLeast, Comparator::AtMost, Comparator::GreaterThan] {
            assert!(!comparator.holds(&nan, &Threshold::Bound(1.0)));
            assert_eq!(comparator.distance(&nan, &Threshold::Bound(1.0)), None);
        }
        let range = Threshold::Range { low: 1.0, high: 2.0 };
        assert!(!Comparator::WithinRange.holds(&nan, &range));
        assert!(!Comparator::OutsideRange.holds(&nan, &range));
    }

    #[test]
    fn test_at_least_margin() {
        let t = Threshold::Bound(10.0);
        assert_eq!(Comparator::AtLeast.distance(&num(15.0), &t), Some(5.0));
        assert_eq!(Comparator::AtLeast.distance(&num(3.0), &t), Some(-7.0));
        assert_eq!(Comparator::AtMost.distance(&num(3.0), &t), Some(7.0));
    }

    #[test]
    fn test_range_margins() {
        let t = Threshold::Range { low: 300.0, high: 550.0 };
        assert_eq!(Comparator::WithinRange.distance(&num(500.0), &t), Some(50.0));
        assert_eq!(Comparator::WithinRange.distance(&num(600.0), &t), Some(-50.0));
        assert_eq!(Comparator::OutsideRange.distance(&num(600.0), &t), Some(50.0));
        assert_eq!(Comparator::OutsideRange.distance(&num(310.0), &t), Some(-10.0));
    }

    #[test]
    fn test_equals_is_kind_strict() {
        let expected = Threshold::Exact(PropertyValue::Text("oral".into()));
        assert!(Comparator::Equals.holds(&"oral".into(), &expected));
        assert!(!Comparator::Equals.holds(&"iv".into(), &expected));
        assert!(!Comparator::Equals.accepts(&num(1.0), &expected));
        assert_eq!(Comparator::Equals.distance(&"oral".into(), &expected), None);
    }

    #[test]
    fn test_accepts_rejects_text_for_numeric_comparators() {
        let t = Threshold::Bound(10.0);
        assert!(Comparator::AtLeast.accepts(&num(1.0), &t));
        assert!(!Comparator::AtLeast.accepts(&"15.0".into(), &t));
        assert!(!Comparator::AtLeast.holds(&"15.0".into(), &t));
    }

    #[test]
    fn test_worst_case_uses_pessimistic_bound() {
        let interval = Interval::new(8.0, 12.0);
        let t = Threshold::Bound(10.0);
        assert_eq!(Comparator::AtLeast.holds_worst_case(&interval, &t), (false, Some(-2.0)));
        assert_eq!(Comparator::AtMost.holds_worst_case(&interval, &t), (false, Some(-2.0)));
        assert!(Comparator::AtMost.holds_worst_case(&interval, &Threshold::Bound(12.0)).0);

        let range = Threshold::Range { low: 5.0, high: 15.0 };
        assert!(Comparator::WithinRange.holds_worst_case(&interval, &range).0);
        let spanning = Threshold::Range { low: 9.0, high: 11.0 };
        assert!(!Comparator::OutsideRange.holds_worst_case(&interval, &spanning).0);
    }

    #[test]
    fn test_pessimistic_value_by_direction() {
        let interval = Interval::new(8.0, 12.0);
        assert_eq!(Comparator::GreaterThan.pessimistic_value(&interval), Some(8.0));
        assert_eq!(Comparator::LessThan.pessimistic_value(&interval), Some(12.0));
        assert_eq!(Comparator::WithinRange.pessimistic_value(&interval), None);
    }

    #[test]
    fn test_strictness_by_direction() {
        let base = Threshold::Bound(100.0);
        assert!(Comparator::AtLeast.is_at_least_as_strict(&Threshold::Bound(200.0), &base));
        assert!(!Comparator::AtLeast.is_at_least_as_strict(&Threshold::Bound(50.0), &base));
        assert!(Comparator::AtMost.is_at_least_as_strict(&Threshold::Bound(50.0), &base));
        assert!(!Comparator::AtMost.is_at_least_as_strict(&Threshold::Bound(200.0), &base));

        let range = Threshold::Range { low: 2.0, high: 4.0 };
        let narrower = Threshold::Range { low: 2.5, high: 3.8 };
        assert!(Comparator::WithinRange.is_at_least_as_strict(&narrower, &range));
        assert!(!Comparator::OutsideRange.is_at_least_as_strict(&narrower, &range));
        assert!(Comparator::OutsideRange.is_at_least_as_strict(&range, &narrower));
    }

    #[test]
    fn test_requirement_text() {
        assert_eq!(Comparator::AtLeast.requirement(&Threshold::Bound(10.0)), "≥ 10");
        assert_eq!(
            Comparator::WithinRange.requirement(&Threshold::Range { low: 300.0, high: 550.0 }),
            "within [300, 550]"
        );
    }
}
