//! Population-specific tightening of constraint sets.
//!
//! A population (e.g. "asthmatic", "elderly") carries modifiers that derive
//! stricter thresholds from a base set. Resolution never loosens a limit: any
//! modifier whose result accepts a value the base rejected is a hard error.

mod registry;
mod tightening;

pub use registry::{Population, PopulationError, PopulationRegistry, PropertyMatch};
pub use tightening::{Adjustment, CustomTightening, Tightening};
