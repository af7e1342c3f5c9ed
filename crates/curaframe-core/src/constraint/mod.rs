//! Constraint model, constraint sets, and bundle documents.
//!
//! Constraints are immutable records validated at construction time. Bundle
//! documents (YAML/JSON) are checked against an embedded JSON Schema before
//! any constraint is built.

mod model;
mod parser;
mod schema;
mod set;

pub use model::{
    Confidence, ConfidenceTier, Constraint, ConstraintBuilder, ConstraintDefinitionError,
    ConstraintSpec, Provenance, ThresholdSpec, Tightened,
};
pub use parser::{BundleError, ConstraintBundle, BUNDLE_VERSION};
pub use schema::validate_bundle_schema;
pub use set::{ConstraintSet, ConstraintSetSpec, DEFAULT_VERIFICATION_THRESHOLD};
