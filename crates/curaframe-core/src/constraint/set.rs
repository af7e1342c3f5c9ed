//! Ordered, named collections of constraints.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

use super::model::{Constraint, ConstraintDefinitionError};
use crate::types::Severity;

/// Confidence below which a constraint is flagged for verification.
pub const DEFAULT_VERIFICATION_THRESHOLD: f64 = 0.6;

/// An ordered set of constraints evaluated together (a "bundle").
///
/// No two constraints may share a (`property_key`, `comparator`) pair. A
/// property can still carry several constraints, e.g. a floor and a ceiling.
/// Sets are immutable; [`ConstraintSet::with_constraint`] returns a new set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConstraintSetSpec", into = "ConstraintSetSpec")]
pub struct ConstraintSet {
    name: String,
    description: Option<String>,
    constraints: Vec<Constraint>,
}

impl ConstraintSet {
    /// Build a set, rejecting duplicate (property, comparator) pairs.
    pub fn new(
        name: impl Into<String>,
        constraints: Vec<Constraint>,
    ) -> Result<Self, ConstraintDefinitionError> {
        Self::checked(name.into(), None, constraints)
    }

    fn checked(
        name: String,
        description: Option<String>,
        constraints: Vec<Constraint>,
    ) -> Result<Self, ConstraintDefinitionError> {
        let set = Self {
            name,
            description,
            constraints,
        };
        set.validate()?;
        set.flag_unverified_critical();
        Ok(set)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// New set with `constraint` appended.
    pub fn with_constraint(
        &self,
        constraint: Constraint,
    ) -> Result<Self, ConstraintDefinitionError> {
        let mut constraints = self.constraints.clone();
        constraints.push(constraint);
        Self::checked(self.name.clone(), self.description.clone(), constraints)
    }

    /// Same name and description, different constraints.
    ///
    /// Used by population resolution, which derives constraints one-for-one
    /// from an already validated set.
    pub(crate) fn derive(&self, constraints: Vec<Constraint>) -> Self {
        Self {
            name: self.name.clone(),
            description: self.description.clone(),
            constraints,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Constraint> {
        self.constraints.iter()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// All constraints on `property_key`, in declared order.
    pub fn for_property<'a>(
        &'a self,
        property_key: &'a str,
    ) -> impl Iterator<Item = &'a Constraint> + 'a {
        self.constraints
            .iter()
            .filter(move |c| c.property_key() == property_key)
    }

    /// Distinct property keys, in first-declared order.
    pub fn property_keys(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.constraints
            .iter()
            .map(|c| c.property_key())
            .filter(|k| seen.insert(*k))
            .collect()
    }

    fn validate(&self) -> Result<(), ConstraintDefinitionError> {
        let mut seen = HashSet::new();
        for constraint in &self.constraints {
            if !seen.insert((constraint.property_key(), constraint.comparator())) {
                return Err(ConstraintDefinitionError::Duplicate {
                    set: self.name.clone(),
                    property_key: constraint.property_key().to_string(),
                    comparator: constraint.comparator(),
                });
            }
        }
        Ok(())
    }

    /// CRITICAL constraints whose confidence requires verification.
    pub fn unverified_critical(&self) -> Vec<&Constraint> {
        self.constraints
            .iter()
            .filter(|c| {
                c.severity() == Severity::Critical
                    && c.requires_verification(DEFAULT_VERIFICATION_THRESHOLD)
            })
            .collect()
    }

    fn flag_unverified_critical(&self) {
        for constraint in self.unverified_critical() {
            warn!(
                set = %self.name,
                constraint = %constraint.label(),
                confidence = constraint.confidence().score(),
                "CRITICAL constraint has low confidence; consider additional validation"
            );
        }
    }
}

impl<'a> IntoIterator for &'a ConstraintSet {
    type Item = &'a Constraint;
    type IntoIter = std::slice::Iter<'a, Constraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.constraints.iter()
    }
}

/// Serialized form of a [`ConstraintSet`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintSetSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

impl TryFrom<ConstraintSetSpec> for ConstraintSet {
    type Error = ConstraintDefinitionError;

    fn try_from(spec: ConstraintSetSpec) -> Result<Self, Self::Error> {
        let set = ConstraintSet::new(spec.name, spec.constraints)?;
        Ok(match spec.description {
            Some(description) => set.with_description(description),
            None => set,
        })
    }
}

impl From<ConstraintSet> for ConstraintSetSpec {
    fn from(set: ConstraintSet) -> Self {
        ConstraintSetSpec {
            name: set.name,
            description: set.description,
            constraints: set.constraints,
        }
    }
}
