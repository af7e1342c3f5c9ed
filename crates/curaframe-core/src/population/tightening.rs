//! Tightening functions: pure maps from a base threshold to a stricter one.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::comparator::{Comparator, Direction, Threshold};

/// A pure transform from a base threshold to a (supposedly) stricter one.
///
/// Implementations are never trusted: every result goes through the
/// registry's strictness check before it is used.
pub trait Tightening: Send + Sync {
    /// Derive the new threshold. `comparator` tells which side is acceptable.
    fn tighten(&self, comparator: Comparator, threshold: &Threshold) -> Threshold;

    /// Short description for audit trails, e.g. `scale ×2`.
    fn describe(&self) -> String;
}

/// Declarative tightening functions, loadable from population documents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum Adjustment {
    /// Multiply every numeric bound.
    Scale { factor: f64 },
    /// Add to every numeric bound.
    Offset { delta: f64 },
    /// Move every bound towards the stricter side by a fraction of its
    /// magnitude (single bounds) or of the range width (ranges).
    Margin { fraction: f64 },
    /// Replace a single bound.
    SetBound { bound: f64 },
    /// Replace both range bounds.
    SetRange { low: f64, high: f64 },
}

impl Tightening for Adjustment {
    fn tighten(&self, comparator: Comparator, threshold: &Threshold) -> Threshold {
        match *self {
            Adjustment::Scale { factor } => threshold.map_bounds(|b| b * factor),
            Adjustment::Offset { delta } => threshold.map_bounds(|b| b + delta),
            Adjustment::Margin { fraction } => margin(comparator, threshold, fraction),
            Adjustment::SetBound { bound } => Threshold::Bound(bound),
            Adjustment::SetRange { low, high } => Threshold::Range { low, high },
        }
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

fn margin(comparator: Comparator, threshold: &Threshold, fraction: f64) -> Threshold {
    match (comparator, threshold) {
        (_, Threshold::Bound(limit)) => match comparator.direction() {
            Some(Direction::Lower) => Threshold::Bound(limit + limit.abs() * fraction),
            Some(Direction::Upper) => Threshold::Bound(limit - limit.abs() * fraction),
            None => threshold.clone(),
        },
        (Comparator::WithinRange, Threshold::Range { low, high }) => {
            let shift = (high - low) * fraction / 2.0;
            Threshold::Range {
                low: low + shift,
                high: high - shift,
            }
        }
        (Comparator::OutsideRange, Threshold::Range { low, high }) => {
            let shift = (high - low) * fraction / 2.0;
            Threshold::Range {
                low: low - shift,
                high: high + shift,
            }
        }
        _ => threshold.clone(),
    }
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Adjustment::Scale { factor } => write!(f, "scale ×{}", factor),
            Adjustment::Offset { delta } => write!(f, "offset {:+}", delta),
            Adjustment::Margin { fraction } => write!(f, "margin {}%", fraction * 100.0),
            Adjustment::SetBound { bound } => write!(f, "set bound {}", bound),
            Adjustment::SetRange { low, high } => write!(f, "set range [{}, {}]", low, high),
        }
    }
}

/// Wraps an arbitrary closure as a [`Tightening`].
pub struct CustomTightening<F> {
    label: String,
    f: F,
}

impl<F> CustomTightening<F>
where
    F: Fn(&Threshold) -> Threshold + Send + Sync,
{
    pub fn new(label: impl Into<String>, f: F) -> Self {
        Self {
            label: label.into(),
            f,
        }
    }
}

impl<F> Tightening for CustomTightening<F>
where
    F: Fn(&Threshold) -> Threshold + Send + Sync,
{
    fn tighten(&self, _comparator: Comparator, threshold: &Threshold) -> Threshold {
        (self.f)(threshold)
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}
