//! # curaframe-core
//!
//! Deterministic constraint evaluation engine for candidate safety screening.
//!
//! This crate answers one question for a described candidate: does it
//! satisfy every non-negotiable limit in a constraint set, and if not, which
//! limits did it break, by how much, and how sure are we of the limits?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same input always produces same output
//! 2. **Conservative**: Population modifiers may only tighten limits
//! 3. **Traceable**: Every outcome cites the constraint, the observed value, and evidence
//! 4. **No coercion**: Missing or mistyped properties are INDETERMINATE, never guessed
//!
//! ## Example
//!
//! ```rust,ignore
//! use curaframe_core::{Candidate, ConstraintBundle, Engine};
//!
//! let bundle = ConstraintBundle::from_yaml_file("core_safety.yaml")?;
//! let candidate = Candidate::new("CF-001")
//!     .with_property("hERG_IC50", 15.0)
//!     .with_property("logP", 3.1);
//! let result = Engine::new().evaluate(&candidate, &bundle.set, None)?;
//!
//! println!("{}", result.summary());
//! ```

pub mod candidate;
pub mod comparator;
pub mod config;
pub mod constraint;
pub mod engine;
pub mod evidence;
pub mod outcome;
pub mod population;
pub mod synthesizer;
pub mod types;

// Re-export main types at crate root
pub use candidate::{Candidate, Interval, PropertyValue, ValueKind};
pub use comparator::{Arity, Comparator, Direction, Threshold};
pub use config::{ConfigError, EngineConfig, UncertaintyPolicy};
pub use constraint::{
    BundleError, Confidence, ConfidenceTier, Constraint, ConstraintBuilder, ConstraintBundle,
    ConstraintDefinitionError, ConstraintSet, Provenance, Tightened,
    DEFAULT_VERIFICATION_THRESHOLD,
};
pub use engine::Engine;
pub use evidence::Evidence;
pub use outcome::{EvaluationResult, Outcome};
pub use population::{
    Adjustment, CustomTightening, PopulationError, PopulationRegistry, PropertyMatch, Tightening,
};
pub use synthesizer::Synthesizer;
pub use types::{Classification, EvidenceSource, IndeterminateReason, Severity, Verdict};

use thiserror::Error;

/// Errors that stop an evaluation before any candidate property is examined.
///
/// Data problems in the candidate are never errors; they are reported as
/// INDETERMINATE outcomes.
#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("Constraint definition error: {0}")]
    ConstraintDefinition(#[from] ConstraintDefinitionError),

    #[error("Unknown population '{name}' (available: {})", .available.join(", "))]
    UnknownPopulation { name: String, available: Vec<String> },

    #[error("Population '{population}' modifier '{modifier}' loosens '{property_key}' from {base} to {modified}")]
    PopulationModifierViolatesConservatism {
        population: String,
        property_key: String,
        modifier: String,
        base: String,
        modified: String,
    },

    #[error("Population error: {0}")]
    Population(PopulationError),
}

impl From<PopulationError> for EvaluationError {
    fn from(err: PopulationError) -> Self {
        match err {
            PopulationError::UnknownPopulation { name, available } => {
                EvaluationError::UnknownPopulation { name, available }
            }
            PopulationError::ViolatesConservatism {
                population,
                property_key,
                modifier,
                base,
                modified,
            } => EvaluationError::PopulationModifierViolatesConservatism {
                population,
                property_key,
                modifier,
                base,
                modified,
            },
            PopulationError::Definition { source, .. } => {
                EvaluationError::ConstraintDefinition(source)
            }
            other => EvaluationError::Population(other),
        }
    }
}

/// Evaluate a candidate against a constraint set with no population context.
///
/// Uses a default [`Engine`]. For populations or worst-case uncertainty,
/// build an engine and call [`Engine::evaluate`].
pub fn evaluate(
    candidate: &Candidate,
    constraint_set: &ConstraintSet,
) -> Result<EvaluationResult, EvaluationError> {
    Engine::new().evaluate(candidate, constraint_set, None)
}
