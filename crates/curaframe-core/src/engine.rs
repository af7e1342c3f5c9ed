//! The evaluation engine.
//!
//! `evaluate` is a pure function of its inputs: it resolves the effective
//! constraint set for the population, classifies the candidate against every
//! constraint in declared order, and hands the outcomes to the synthesizer.
//! Configuration errors surface before any property is examined; data
//! problems become INDETERMINATE outcomes.

use std::borrow::Cow;
use tracing::{debug, info};

use crate::candidate::{Candidate, Interval, PropertyValue};
use crate::comparator::Arity;
use crate::config::{EngineConfig, UncertaintyPolicy};
use crate::constraint::{Constraint, ConstraintSet};
use crate::evidence::Evidence;
use crate::outcome::{EvaluationResult, Outcome};
use crate::population::PopulationRegistry;
use crate::synthesizer::Synthesizer;
use crate::types::{Classification, IndeterminateReason};
use crate::EvaluationError;

/// Evaluates candidates against constraint sets.
///
/// Immutable once built, so one engine can serve concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    registry: PopulationRegistry,
    config: EngineConfig,
}

impl Engine {
    /// Engine with no populations and default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_populations(registry: PopulationRegistry) -> Self {
        Self {
            registry,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn populations(&self) -> &PopulationRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The constraint set that `evaluate` would use for `population`.
    pub fn resolve<'a>(
        &self,
        constraint_set: &'a ConstraintSet,
        population: Option<&str>,
    ) -> Result<Cow<'a, ConstraintSet>, EvaluationError> {
        match population {
            Some(name) => Ok(Cow::Owned(self.registry.apply(constraint_set, name)?)),
            None => Ok(Cow::Borrowed(constraint_set)),
        }
    }

    /// Evaluate `candidate` against `constraint_set`, optionally under a population.
    pub fn evaluate(
        &self,
        candidate: &Candidate,
        constraint_set: &ConstraintSet,
        population: Option<&str>,
    ) -> Result<EvaluationResult, EvaluationError> {
        let effective = self.resolve(constraint_set, population)?;

        let outcomes: Vec<Outcome> = effective
            .iter()
            .enumerate()
            .map(|(index, constraint)| {
                self.evaluate_constraint(candidate, effective.name(), index, constraint)
            })
            .collect();

        let result = Synthesizer::from_config(&self.config).synthesize(
            &candidate.name,
            effective.name(),
            population,
            outcomes,
        );

        info!(
            candidate = %candidate.name,
            constraint_set = %effective.name(),
            population = population.unwrap_or("-"),
            verdict = %result.verdict,
            violations = result.violations().len(),
            indeterminate = result.indeterminates().len(),
            "evaluation complete"
        );

        Ok(result)
    }

    fn evaluate_constraint(
        &self,
        candidate: &Candidate,
        set_name: &str,
        index: usize,
        constraint: &Constraint,
    ) -> Outcome {
        let key = constraint.property_key();
        let mut evidence = vec![Evidence::from_constraint(
            format!("requires {} {}", key, constraint.requirement()),
            set_name,
            index,
        )];
        if let Some(record) = constraint.tightening() {
            evidence.push(Evidence::from_population(
                record.modifier.clone(),
                &record.population,
                key,
            ));
        }

        let (observed, judgement) = match candidate.get(key) {
            None => {
                evidence.push(Evidence::from_candidate(
                    format!("no value supplied for {}", key),
                    key,
                ));
                (
                    None,
                    Judgement::indeterminate(IndeterminateReason::MissingProperty),
                )
            }
            Some(value) => {
                evidence.push(Evidence::from_candidate(format!("observed {}", value), key));
                let judgement = self.classify(candidate, constraint, value, &mut evidence);
                (Some(value.clone()), judgement)
            }
        };
        let Judgement {
            classification,
            margin,
            worst_case,
        } = judgement;

        debug!(
            candidate = %candidate.name,
            constraint = %constraint.label(),
            classification = %classification,
            margin = ?margin,
            "classified constraint"
        );

        Outcome {
            constraint: constraint.clone(),
            observed,
            classification,
            margin,
            worst_case,
            evidence,
        }
    }

    fn classify(
        &self,
        candidate: &Candidate,
        constraint: &Constraint,
        value: &PropertyValue,
        evidence: &mut Vec<Evidence>,
    ) -> Judgement {
        let comparator = constraint.comparator();
        let threshold = constraint.threshold();

        if !comparator.accepts(value, threshold) {
            return Judgement::indeterminate(IndeterminateReason::TypeMismatch);
        }

        // A NaN nominal is judged as-is and fails every numeric comparator.
        let interval = match (self.config.uncertainty_policy, value.as_number()) {
            (UncertaintyPolicy::WorstCase, Some(nominal))
                if comparator.arity() != Arity::Exact && !nominal.is_nan() =>
            {
                candidate
                    .uncertainty_for(constraint.property_key())
                    .map(|interval| (*interval, nominal))
            }
            _ => None,
        };

        match interval {
            Some((interval, nominal)) if !interval.is_well_formed_around(nominal) => {
                evidence.push(Evidence::from_uncertainty(
                    format!(
                        "interval [{}, {}] is not a valid range around observed {}",
                        interval.lower, interval.upper, nominal
                    ),
                    constraint.property_key(),
                ));
                Judgement::indeterminate(IndeterminateReason::InvalidUncertainty)
            }
            Some((interval, _)) => {
                evidence.push(Evidence::from_uncertainty(
                    format!("worst case over [{}, {}]", interval.lower, interval.upper),
                    constraint.property_key(),
                ));
                let (holds, margin) = comparator.holds_worst_case(&interval, threshold);
                Judgement::decided(holds, margin, Some(interval))
            }
            None => Judgement::decided(
                comparator.holds(value, threshold),
                comparator.distance(value, threshold),
                None,
            ),
        }
    }
}

/// What `classify` concluded for one constraint.
struct Judgement {
    classification: Classification,
    margin: Option<f64>,
    worst_case: Option<Interval>,
}

impl Judgement {
    fn indeterminate(reason: IndeterminateReason) -> Self {
        Self {
            classification: Classification::Indeterminate { reason },
            margin: None,
            worst_case: None,
        }
    }

    fn decided(holds: bool, margin: Option<f64>, worst_case: Option<Interval>) -> Self {
        let classification = if holds {
            Classification::Pass
        } else {
            Classification::Violation
        };
        Self {
            classification,
            margin,
            worst_case,
        }
    }
}
