//! Candidates: the hypothetical items under evaluation.
//!
//! A candidate is a name plus a bag of observed property values. It knows
//! nothing about constraint sets and is never validated against one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// An observed (or expected) property value.
///
/// Values are taken as supplied. The text `"15.0"` is text, not a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Number(f64),
    Flag(bool),
    Text(String),
}

/// Coarse kind of a [`PropertyValue`], used for type checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Number,
    Flag,
    Text,
}

impl PropertyValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            PropertyValue::Number(_) => ValueKind::Number,
            PropertyValue::Flag(_) => ValueKind::Flag,
            PropertyValue::Text(_) => ValueKind::Text,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Number(n) => write!(f, "{}", n),
            PropertyValue::Flag(b) => write!(f, "{}", b),
            PropertyValue::Text(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Number(f64::from(value))
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Flag(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

/// Uncertainty bounds around a nominal numeric value, serialized as `[lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

impl Interval {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Finite and not inverted.
    pub fn is_well_formed(&self) -> bool {
        self.lower.is_finite() && self.upper.is_finite() && self.lower <= self.upper
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    /// Well formed and bracketing the nominal value it qualifies.
    pub fn is_well_formed_around(&self, nominal: f64) -> bool {
        self.is_well_formed() && self.contains(nominal)
    }
}

impl From<[f64; 2]> for Interval {
    fn from([lower, upper]: [f64; 2]) -> Self {
        Self { lower, upper }
    }
}

impl From<Interval> for [f64; 2] {
    fn from(interval: Interval) -> Self {
        [interval.lower, interval.upper]
    }
}

/// A hypothetical design concept described purely by its properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Human-readable identifier
    pub name: String,

    /// property_key -> observed value
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,

    /// property_key -> uncertainty interval around the observed value
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub uncertainty: BTreeMap<String, Interval>,

    /// How these properties were obtained (predicted, assayed, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<String>,
}

impl Candidate {
    /// Create a candidate with no properties.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
            uncertainty: BTreeMap::new(),
            provenance: None,
        }
    }

    /// Add or replace a property value.
    pub fn with_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Attach an uncertainty interval to a property.
    pub fn with_uncertainty(mut self, key: impl Into<String>, lower: f64, upper: f64) -> Self {
        self.uncertainty.insert(key.into(), Interval::new(lower, upper));
        self
    }

    pub fn with_provenance(mut self, provenance: impl Into<String>) -> Self {
        self.provenance = Some(provenance.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn uncertainty_for(&self, key: &str) -> Option<&Interval> {
        self.uncertainty.get(key)
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let props: Vec<String> = self
            .properties
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        write!(f, "Candidate({}: {})", self.name, props.join(", "))
    }
}
