//! Population registry: named lists of tightening modifiers.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use super::tightening::{Adjustment, Tightening};
use crate::constraint::{Constraint, ConstraintDefinitionError, ConstraintSet};

/// Errors raised while registering or applying population modifiers.
#[derive(Error, Debug)]
pub enum PopulationError {
    #[error("unknown population '{name}' (available: {})", .available.join(", "))]
    UnknownPopulation { name: String, available: Vec<String> },

    #[error("population '{population}': modifier '{modifier}' loosens '{property_key}' from {base} to {modified}")]
    ViolatesConservatism {
        population: String,
        property_key: String,
        modifier: String,
        base: String,
        modified: String,
    },

    #[error("population '{population}': {source}")]
    Definition {
        population: String,
        #[source]
        source: ConstraintDefinitionError,
    },

    #[error("invalid population name: '{0}'")]
    InvalidName(String),

    #[error("Failed to read populations file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse populations document: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Which constraints a modifier applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyMatch {
    /// Constraints on exactly this property.
    Key(String),
    /// Every constraint in the set (`*` in documents).
    Any,
}

impl PropertyMatch {
    pub fn matches(&self, property_key: &str) -> bool {
        match self {
            PropertyMatch::Key(key) => key == property_key,
            PropertyMatch::Any => true,
        }
    }
}

impl From<&str> for PropertyMatch {
    fn from(key: &str) -> Self {
        if key == "*" {
            PropertyMatch::Any
        } else {
            PropertyMatch::Key(key.to_string())
        }
    }
}

impl From<String> for PropertyMatch {
    fn from(key: String) -> Self {
        PropertyMatch::from(key.as_str())
    }
}

impl fmt::Display for PropertyMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyMatch::Key(key) => f.write_str(key),
            PropertyMatch::Any => f.write_str("*"),
        }
    }
}

#[derive(Clone)]
struct Modifier {
    target: PropertyMatch,
    tightening: Arc<dyn Tightening>,
}

/// A named population and its modifiers, in registration order.
#[derive(Clone, Default)]
pub struct Population {
    description: Option<String>,
    modifiers: Vec<Modifier>,
}

impl Population {
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// `(target, description)` for each modifier, in application order.
    pub fn modifiers(&self) -> Vec<(&PropertyMatch, String)> {
        self.modifiers
            .iter()
            .map(|m| (&m.target, m.tightening.describe()))
            .collect()
    }
}

/// Registry of population modifiers.
///
/// Built up front and read-only during evaluation. Registration is additive:
/// modifiers registered for the same population and property compose in
/// registration order.
#[derive(Clone, Default)]
pub struct PopulationRegistry {
    populations: BTreeMap<String, Population>,
}

impl PopulationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tightening for `property` (or `*`) under `population`.
    pub fn register(
        &mut self,
        population: &str,
        property: impl Into<PropertyMatch>,
        tightening: impl Tightening + 'static,
    ) -> Result<&mut Self, PopulationError> {
        self.register_arc(population, property.into(), Arc::new(tightening))
    }

    fn register_arc(
        &mut self,
        population: &str,
        target: PropertyMatch,
        tightening: Arc<dyn Tightening>,
    ) -> Result<&mut Self, PopulationError> {
        let name = validate_name(population)?;
        debug!(
            population = %name,
            property = %target,
            modifier = %tightening.describe(),
            "registered population modifier"
        );
        self.populations
            .entry(name)
            .or_default()
            .modifiers
            .push(Modifier { target, tightening });
        Ok(self)
    }

    /// Attach a human-readable description to a population.
    pub fn describe(
        &mut self,
        population: &str,
        description: impl Into<String>,
    ) -> Result<&mut Self, PopulationError> {
        let name = validate_name(population)?;
        self.populations.entry(name).or_default().description = Some(description.into());
        Ok(self)
    }

    /// Add every population of `other` to this registry.
    pub fn extend(&mut self, other: PopulationRegistry) {
        for (name, population) in other.populations {
            let entry = self.populations.entry(name).or_default();
            if population.description.is_some() {
                entry.description = population.description;
            }
            entry.modifiers.extend(population.modifiers);
        }
    }

    /// Registered population names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.populations.keys().map(String::as_str).collect()
    }

    pub fn get(&self, population: &str) -> Option<&Population> {
        self.populations.get(population.trim())
    }

    pub fn contains(&self, population: &str) -> bool {
        self.get(population).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.populations.is_empty()
    }

    /// Derive the population-adjusted version of `set`.
    ///
    /// Every matching modifier is applied in registration order and each
    /// step must be at least as strict as the one before it. Constraints no
    /// modifier targets are carried over unchanged. The input set is never
    /// modified.
    pub fn apply(
        &self,
        set: &ConstraintSet,
        population: &str,
    ) -> Result<ConstraintSet, PopulationError> {
        let population = population.trim();
        let entry = self
            .populations
            .get(population)
            .ok_or_else(|| PopulationError::UnknownPopulation {
                name: population.to_string(),
                available: self.populations.keys().cloned().collect(),
            })?;

        let constraints = set
            .iter()
            .map(|constraint| apply_modifiers(constraint, population, &entry.modifiers))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            population = %population,
            set = %set.name(),
            tightened = constraints.iter().filter(|c| c.tightening().is_some()).count(),
            "resolved population constraint set"
        );

        Ok(set.derive(constraints))
    }

    /// Load populations from a YAML (or JSON) document.
    ///
    /// ```yaml
    /// populations:
    ///   asthmatic:
    ///     description: "Patients with reactive airway disease"
    ///     modifiers:
    ///       - property: beta1_selectivity
    ///         adjustment: { kind: scale, factor: 2.0 }
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self, PopulationError> {
        let document: PopulationsDocument = serde_yaml::from_str(yaml)?;
        let mut registry = Self::new();
        for (name, spec) in document.populations {
            if let Some(description) = spec.description {
                registry.describe(&name, description)?;
            }
            for modifier in spec.modifiers {
                registry.register(&name, modifier.property, modifier.adjustment)?;
            }
        }
        Ok(registry)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, PopulationError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }
}

fn validate_name(population: &str) -> Result<String, PopulationError> {
    let name = population.trim();
    if name.is_empty() || name == "*" {
        return Err(PopulationError::InvalidName(population.to_string()));
    }
    Ok(name.to_string())
}

fn apply_modifiers(
    constraint: &Constraint,
    population: &str,
    modifiers: &[Modifier],
) -> Result<Constraint, PopulationError> {
    let mut current = constraint.clone();
    for modifier in modifiers
        .iter()
        .filter(|m| m.target.matches(constraint.property_key()))
    {
        let description = modifier.tightening.describe();
        let proposed = modifier
            .tightening
            .tighten(current.comparator(), current.threshold());
        let next = current
            .tightened(proposed, population, description.clone())
            .map_err(|source| PopulationError::Definition {
                population: population.to_string(),
                source,
            })?;

        if !current
            .comparator()
            .is_at_least_as_strict(next.threshold(), current.threshold())
        {
            return Err(PopulationError::ViolatesConservatism {
                population: population.to_string(),
                property_key: current.property_key().to_string(),
                modifier: description,
                base: current.requirement(),
                modified: next.requirement(),
            });
        }

        debug!(
            population = %population,
            constraint = %current.label(),
            from = %current.requirement(),
            to = %next.requirement(),
            "applied population modifier"
        );
        current = next;
    }
    Ok(current)
}

impl fmt::Debug for PopulationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, population) in &self.populations {
            let modifiers: Vec<String> = population
                .modifiers
                .iter()
                .map(|m| format!("{}: {}", m.target, m.tightening.describe()))
                .collect();
            map.entry(name, &modifiers);
        }
        map.finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PopulationsDocument {
    #[serde(default)]
    populations: BTreeMap<String, PopulationSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PopulationSpec {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    modifiers: Vec<ModifierSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModifierSpec {
    property: String,
    adjustment: Adjustment,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::PropertyValue;
    use crate::comparator::{Comparator, Threshold};
    use crate::population::CustomTightening;
    use crate::types::Severity;

    fn constraint(key: &str, comparator: Comparator, values: &[f64]) -> Constraint {
        Constraint::builder(key, comparator)
            .threshold(values.iter().map(|v| PropertyValue::Number(*v)))
            .severity(Severity::Severe)
            .rationale("test limit")
            .build()
            .unwrap()
    }

    fn cardiac_set() -> ConstraintSet {
        ConstraintSet::new(
            "cardiac",
            vec![
                constraint("beta1_selectivity", Comparator::AtLeast, &[100.0]),
                constraint("logP", Comparator::AtMost, &[4.0]),
                constraint("molecular_weight", Comparator::WithinRange, &[300.0, 550.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_asthmatic_doubles_selectivity_floor() {
        let mut registry = PopulationRegistry::new();
        registry
            .register("asthmatic", "beta1_selectivity", Adjustment::Scale { factor: 2.0 })
            .unwrap();

        let base = cardiac_set();
        let adjusted = registry.apply(&base, "asthmatic").unwrap();

        let beta1 = &adjusted.constraints()[0];
        assert_eq!(beta1.threshold(), &Threshold::Bound(200.0));
        let record = beta1.tightening().unwrap();
        assert_eq!(record.population, "asthmatic");
        assert_eq!(record.base_threshold, vec![PropertyValue::Number(100.0)]);

        assert_eq!(adjusted.constraints()[1], base.constraints()[1]);
        assert_eq!(base.constraints()[0].threshold(), &Threshold::Bound(100.0));
    }

    #[test]
    fn test_loosening_modifier_is_rejected() {
        let mut registry = PopulationRegistry::new();
        registry
            .register("lenient", "logP", Adjustment::Offset { delta: 1.0 })
            .unwrap();
        let err = registry.apply(&cardiac_set(), "lenient").unwrap_err();
        match err {
            PopulationError::ViolatesConservatism {
                property_key,
                base,
                modified,
                ..
            } => {
                assert_eq!(property_key, "logP");
                assert_eq!(base, "≤ 4");
                assert_eq!(modified, "≤ 5");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_population_lists_available() {
        let mut registry = PopulationRegistry::new();
        registry
            .register("elderly", "hERG_IC50", Adjustment::Scale { factor: 1.5 })
            .unwrap();
        let err = registry.apply(&cardiac_set(), "pediatric").unwrap_err();
        assert!(matches!(err, PopulationError::UnknownPopulation { .. }));
        assert!(err.to_string().contains("elderly"));
    }

    #[test]
    fn test_modifiers_compose_in_registration_order() {
        let mut registry = PopulationRegistry::new();
        registry
            .register("frail", "beta1_selectivity", Adjustment::Offset { delta: 10.0 })
            .unwrap()
            .register("frail", "beta1_selectivity", Adjustment::Scale { factor: 2.0 })
            .unwrap();
        let adjusted = registry.apply(&cardiac_set(), "frail").unwrap();
        assert_eq!(adjusted.constraints()[0].threshold(), &Threshold::Bound(220.0));
        assert_eq!(
            adjusted.constraints()[0].tightening().unwrap().modifier,
            "offset +10; scale ×2"
        );
    }

    #[test]
    fn test_wildcard_margin_applies_to_every_constraint() {
        let mut registry = PopulationRegistry::new();
        registry
            .register("cautious", "*", Adjustment::Margin { fraction: 0.1 })
            .unwrap();
        let adjusted = registry.apply(&cardiac_set(), "cautious").unwrap();
        assert_eq!(adjusted.constraints()[0].threshold(), &Threshold::Bound(110.0));
        assert!(adjusted.iter().all(|c| c.tightening().is_some()));
    }

    #[test]
    fn test_set_bound_on_range_constraint_is_a_definition_error() {
        let mut registry = PopulationRegistry::new();
        registry
            .register("broken", "molecular_weight", Adjustment::SetBound { bound: 400.0 })
            .unwrap();
        assert!(matches!(
            registry.apply(&cardiac_set(), "broken"),
            Err(PopulationError::Definition { .. })
        ));
    }

    #[test]
    fn test_custom_tightening_is_checked() {
        let mut registry = PopulationRegistry::new();
        registry
            .register(
                "sneaky",
                "beta1_selectivity",
                CustomTightening::new("halve", |t: &Threshold| t.map_bounds(|b| b / 2.0)),
            )
            .unwrap();
        assert!(matches!(
            registry.apply(&cardiac_set(), "sneaky"),
            Err(PopulationError::ViolatesConservatism { .. })
        ));
    }

    #[test]
    fn test_invalid_population_name() {
        let mut registry = PopulationRegistry::new();
        assert!(matches!(
            registry.register("  ", "logP", Adjustment::Scale { factor: 0.5 }),
            Err(PopulationError::InvalidName(_))
        ));
    }

    #[test]
    fn test_names_are_trimmed_on_lookup() {
        let mut registry = PopulationRegistry::new();
        registry
            .register(" elderly ", "logP", Adjustment::Scale { factor: 0.5 })
            .unwrap();
        assert_eq!(registry.names(), vec!["elderly"]);
        assert!(registry.contains(" elderly "));

        let adjusted = registry.apply(&cardiac_set(), " elderly ").unwrap();
        let record = adjusted.constraints()[1].tightening().unwrap();
        assert_eq!(record.population, "elderly");
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
populations:
  asthmatic:
    description: "Reactive airway disease"
    modifiers:
      - property: beta1_selectivity
        adjustment: { kind: scale, factor: 2.0 }
  cautious:
    modifiers:
      - property: "*"
        adjustment: { kind: margin, fraction: 0.05 }
"#;
        let registry = PopulationRegistry::from_yaml(yaml).unwrap();
        assert_eq!(registry.names(), vec!["asthmatic", "cautious"]);
        let asthmatic = registry.get("asthmatic").unwrap();
        assert_eq!(asthmatic.description(), Some("Reactive airway disease"));
        let modifiers = asthmatic.modifiers();
        assert_eq!(modifiers[0].0, &PropertyMatch::Key("beta1_selectivity".into()));
        assert_eq!(modifiers[0].1, "scale ×2");
        assert_eq!(registry.get("cautious").unwrap().modifiers()[0].0, &PropertyMatch::Any);
    }

    #[test]
    fn test_from_yaml_rejects_unknown_adjustment() {
        let yaml = r#"
populations:
  lenient:
    modifiers:
      - property: logP
        adjustment: { kind: relax, amount: 1 }
"#;
        assert!(matches!(
            PopulationRegistry::from_yaml(yaml),
            Err(PopulationError::YamlError(_))
        ));
    }

    #[test]
    fn test_extend_is_additive() {
        let mut a = PopulationRegistry::new();
        a.register("elderly", "hERG_IC50", Adjustment::Scale { factor: 1.5 })
            .unwrap();
        let mut b = PopulationRegistry::new();
        b.register("elderly", "logP", Adjustment::Offset { delta: -0.5 })
            .unwrap();
        a.extend(b);
        assert_eq!(a.get("elderly").unwrap().modifiers().len(), 2);
    }
}
