//! The constraint record and its validation.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::candidate::PropertyValue;
use crate::comparator::{Arity, Comparator, Threshold};
use crate::types::Severity;

lazy_static! {
    static ref PROPERTY_KEY_PATTERN: Regex =
        Regex::new(r"^[A-Za-z][A-Za-z0-9_.\-]*$").unwrap();
}

/// Errors raised while defining constraints and constraint sets.
///
/// These are configuration errors: they surface when a constraint is built,
/// never while a candidate is being evaluated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstraintDefinitionError {
    #[error("constraint on '{property_key}': {comparator} takes {expected} threshold value(s), got {actual}")]
    ArityMismatch {
        property_key: String,
        comparator: Comparator,
        expected: usize,
        actual: usize,
    },

    #[error("constraint on '{property_key}': {comparator} requires numeric bounds, got {value}")]
    NonNumericBound {
        property_key: String,
        comparator: Comparator,
        value: String,
    },

    #[error("constraint on '{property_key}': bound {value} is not finite")]
    NonFiniteBound { property_key: String, value: f64 },

    #[error("constraint on '{property_key}': range low ({low}) must be below high ({high})")]
    InvalidRange {
        property_key: String,
        low: f64,
        high: f64,
    },

    #[error("constraint on '{property_key}': confidence {value} is outside [0, 1]")]
    ConfidenceOutOfRange { property_key: String, value: f64 },

    #[error("invalid property key: '{0}'")]
    InvalidPropertyKey(String),

    #[error("constraint on '{0}': rationale must not be empty")]
    MissingRationale(String),

    #[error("constraint on '{0}': missing {1}")]
    MissingField(String, &'static str),

    #[error("constraint set '{set}': duplicate {comparator} constraint on '{property_key}'")]
    Duplicate {
        set: String,
        property_key: String,
        comparator: Comparator,
    },
}

/// Qualitative confidence tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    Low,
    Moderate,
    High,
}

/// Epistemic trust in a threshold: a score in [0, 1] or a qualitative tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Confidence {
    Score(f64),
    Tier(ConfidenceTier),
}

impl Confidence {
    /// Numeric score. Tiers map to 0.5 / 0.7 / 0.9.
    pub fn score(&self) -> f64 {
        match self {
            Confidence::Score(s) => *s,
            Confidence::Tier(ConfidenceTier::Low) => 0.5,
            Confidence::Tier(ConfidenceTier::Moderate) => 0.7,
            Confidence::Tier(ConfidenceTier::High) => 0.9,
        }
    }

    fn is_valid(&self) -> bool {
        let s = self.score();
        s.is_finite() && (0.0..=1.0).contains(&s)
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Confidence::Score(1.0)
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.score())
    }
}

/// Where a threshold comes from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Provenance {
    /// Source identifier (e.g. "clinical_cardiology", "ICH_S7B")
    pub source: String,

    /// Citations, DOIs, guideline identifiers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,

    /// When the threshold was last checked against its sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_validated: Option<NaiveDate>,
}

impl Provenance {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.references.push(reference.into());
        self
    }

    pub fn validated_on(mut self, date: NaiveDate) -> Self {
        self.last_validated = Some(date);
        self
    }
}

/// Record of a population modifier having produced this constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tightened {
    pub population: String,
    pub modifier: String,
    pub base_threshold: Vec<PropertyValue>,
}

/// One non-negotiable limit on one candidate property.
///
/// Fields are private: a constraint is immutable once built. Population
/// tightening produces a new constraint via [`Constraint::tightened`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConstraintSpec", into = "ConstraintSpec")]
pub struct Constraint {
    property_key: String,
    comparator: Comparator,
    threshold: Threshold,
    severity: Severity,
    rationale: String,
    confidence: Confidence,
    provenance: Option<Provenance>,
    tightened: Option<Tightened>,
}

impl Constraint {
    /// Start building a constraint on `property_key`.
    pub fn builder(property_key: impl Into<String>, comparator: Comparator) -> ConstraintBuilder {
        ConstraintBuilder::new(property_key, comparator)
    }

    pub fn property_key(&self) -> &str {
        &self.property_key
    }

    pub fn comparator(&self) -> Comparator {
        self.comparator
    }

    pub fn threshold(&self) -> &Threshold {
        &self.threshold
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn rationale(&self) -> &str {
        &self.rationale
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    pub fn provenance(&self) -> Option<&Provenance> {
        self.provenance.as_ref()
    }

    /// Set when this constraint came out of a population modifier.
    pub fn tightening(&self) -> Option<&Tightened> {
        self.tightened.as_ref()
    }

    /// Requirement text, e.g. `≥ 10`.
    pub fn requirement(&self) -> String {
        self.comparator.requirement(&self.threshold)
    }

    /// Requirement text of the threshold this constraint was tightened from.
    pub fn base_requirement(&self) -> Option<String> {
        let record = self.tightened.as_ref()?;
        let base =
            validate_threshold(&self.property_key, self.comparator, &record.base_threshold)
                .ok()?;
        Some(self.comparator.requirement(&base))
    }

    /// Short identifier used in messages, e.g. `hERG_IC50 at_least 10`.
    pub fn label(&self) -> String {
        format!("{} {} {}", self.property_key, self.comparator, self.threshold)
    }

    /// Confidence ≥ `min_confidence` and at least `min_references` references.
    pub fn is_well_established(&self, min_confidence: f64, min_references: usize) -> bool {
        let references = self.provenance.as_ref().map_or(0, |p| p.references.len());
        self.confidence.score() >= min_confidence && references >= min_references
    }

    /// Confidence below `threshold`.
    pub fn requires_verification(&self, threshold: f64) -> bool {
        self.confidence.score() < threshold
    }

    /// Build the population-adjusted copy of this constraint.
    ///
    /// The new threshold goes through the same validation as any other
    /// constraint; strictness is checked by the caller.
    pub fn tightened(
        &self,
        threshold: Threshold,
        population: impl Into<String>,
        modifier: impl Into<String>,
    ) -> Result<Constraint, ConstraintDefinitionError> {
        let modifier = modifier.into();
        let (base_threshold, modifier) = match &self.tightened {
            Some(previous) => (
                previous.base_threshold.clone(),
                format!("{}; {}", previous.modifier, modifier),
            ),
            None => (self.threshold.to_values(), modifier),
        };
        let threshold = validate_threshold(
            &self.property_key,
            self.comparator,
            &threshold.to_values(),
        )?;
        Ok(Constraint {
            threshold,
            tightened: Some(Tightened {
                population: population.into(),
                modifier,
                base_threshold,
            }),
            ..self.clone()
        })
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}",
            self.severity,
            self.property_key,
            self.requirement()
        )
    }
}

/// Check arity, kind, finiteness and ordering of threshold values.
pub(crate) fn validate_threshold(
    property_key: &str,
    comparator: Comparator,
    values: &[PropertyValue],
) -> Result<Threshold, ConstraintDefinitionError> {
    let arity = comparator.arity();
    if values.len() != arity.value_count() {
        return Err(ConstraintDefinitionError::ArityMismatch {
            property_key: property_key.to_string(),
            comparator,
            expected: arity.value_count(),
            actual: values.len(),
        });
    }

    if arity == Arity::Exact {
        if let PropertyValue::Number(n) = &values[0] {
            if !n.is_finite() {
                return Err(ConstraintDefinitionError::NonFiniteBound {
                    property_key: property_key.to_string(),
                    value: *n,
                });
            }
        }
        return Ok(Threshold::Exact(values[0].clone()));
    }

    let mut bounds = Vec::with_capacity(values.len());
    for value in values {
        let n = value
            .as_number()
            .ok_or_else(|| ConstraintDefinitionError::NonNumericBound {
                property_key: property_key.to_string(),
                comparator,
                value: value.to_string(),
            })?;
        if !n.is_finite() {
            return Err(ConstraintDefinitionError::NonFiniteBound {
                property_key: property_key.to_string(),
                value: n,
            });
        }
        bounds.push(n);
    }

    match bounds.as_slice() {
        [limit] => Ok(Threshold::Bound(*limit)),
        [low, high] if low < high => Ok(Threshold::Range {
            low: *low,
            high: *high,
        }),
        [low, high] => Err(ConstraintDefinitionError::InvalidRange {
            property_key: property_key.to_string(),
            low: *low,
            high: *high,
        }),
        other => Err(ConstraintDefinitionError::ArityMismatch {
            property_key: property_key.to_string(),
            comparator,
            expected: arity.value_count(),
            actual: other.len(),
        }),
    }
}

/// Builder for constraints. All validation happens in [`ConstraintBuilder::build`].
#[derive(Debug, Clone)]
pub struct ConstraintBuilder {
    property_key: String,
    comparator: Comparator,
    threshold: Vec<PropertyValue>,
    severity: Option<Severity>,
    rationale: String,
    confidence: Confidence,
    provenance: Option<Provenance>,
}

impl ConstraintBuilder {
    pub fn new(property_key: impl Into<String>, comparator: Comparator) -> Self {
        Self {
            property_key: property_key.into(),
            comparator,
            threshold: Vec::new(),
            severity: None,
            rationale: String::new(),
            confidence: Confidence::default(),
            provenance: None,
        }
    }

    /// Raw threshold values; arity is checked at build time.
    pub fn threshold(mut self, values: impl IntoIterator<Item = PropertyValue>) -> Self {
        self.threshold = values.into_iter().collect();
        self
    }

    /// Single numeric bound.
    pub fn bound(self, limit: f64) -> Self {
        self.threshold([PropertyValue::Number(limit)])
    }

    /// Two numeric bounds.
    pub fn range(self, low: f64, high: f64) -> Self {
        self.threshold([PropertyValue::Number(low), PropertyValue::Number(high)])
    }

    /// Expected value for `equals`.
    pub fn expected(self, value: impl Into<PropertyValue>) -> Self {
        self.threshold([value.into()])
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = Confidence::Score(confidence);
        self
    }

    pub fn confidence_tier(mut self, tier: ConfidenceTier) -> Self {
        self.confidence = Confidence::Tier(tier);
        self
    }

    pub fn provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = Some(provenance);
        self
    }

    /// Validate and build the constraint.
    pub fn build(self) -> Result<Constraint, ConstraintDefinitionError> {
        if !PROPERTY_KEY_PATTERN.is_match(&self.property_key) {
            return Err(ConstraintDefinitionError::InvalidPropertyKey(
                self.property_key,
            ));
        }

        let threshold = validate_threshold(&self.property_key, self.comparator, &self.threshold)?;

        let severity = self.severity.ok_or_else(|| {
            ConstraintDefinitionError::MissingField(self.property_key.clone(), "severity")
        })?;

        if self.rationale.trim().is_empty() {
            return Err(ConstraintDefinitionError::MissingRationale(
                self.property_key,
            ));
        }

        if !self.confidence.is_valid() {
            return Err(ConstraintDefinitionError::ConfidenceOutOfRange {
                property_key: self.property_key,
                value: self.confidence.score(),
            });
        }

        Ok(Constraint {
            property_key: self.property_key,
            comparator: self.comparator,
            threshold,
            severity,
            rationale: self.rationale,
            confidence: self.confidence,
            provenance: self.provenance,
            tightened: None,
        })
    }
}

/// One threshold value or a list of them, as written in documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThresholdSpec {
    Many(Vec<PropertyValue>),
    One(PropertyValue),
}

impl ThresholdSpec {
    pub fn into_values(self) -> Vec<PropertyValue> {
        match self {
            ThresholdSpec::Many(values) => values,
            ThresholdSpec::One(value) => vec![value],
        }
    }
}

impl From<&Threshold> for ThresholdSpec {
    fn from(threshold: &Threshold) -> Self {
        match threshold.to_values().as_slice() {
            [single] => ThresholdSpec::One(single.clone()),
            values => ThresholdSpec::Many(values.to_vec()),
        }
    }
}

/// Serialized form of a [`Constraint`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstraintSpec {
    pub property: String,
    pub comparator: Comparator,
    pub threshold: ThresholdSpec,
    pub severity: Severity,
    pub rationale: String,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tightened: Option<Tightened>,
}

impl TryFrom<ConstraintSpec> for Constraint {
    type Error = ConstraintDefinitionError;

    fn try_from(spec: ConstraintSpec) -> Result<Self, Self::Error> {
        let mut builder = Constraint::builder(spec.property, spec.comparator)
            .threshold(spec.threshold.into_values())
            .severity(spec.severity)
            .rationale(spec.rationale);
        builder.confidence = spec.confidence;
        builder.provenance = spec.provenance;
        let mut constraint = builder.build()?;
        constraint.tightened = spec.tightened;
        Ok(constraint)
    }
}

impl From<Constraint> for ConstraintSpec {
    fn from(constraint: Constraint) -> Self {
        ConstraintSpec {
            threshold: ThresholdSpec::from(&constraint.threshold),
            property: constraint.property_key,
            comparator: constraint.comparator,
            severity: constraint.severity,
            rationale: constraint.rationale,
            confidence: constraint.confidence,
            provenance: constraint.provenance,
            tightened: constraint.tightened,
        }
    }
}
