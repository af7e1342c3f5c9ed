//! Evidence linking for evaluation outcomes.
//!
//! Every outcome is supported by evidence that points to specific locations
//! in the candidate, the constraint set, or the population that tightened it.

use serde::{Deserialize, Serialize};

use crate::types::EvidenceSource;

/// A piece of evidence supporting an outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evidence {
    /// What this evidence supports
    pub claim: String,

    /// Where the evidence comes from
    pub source: EvidenceSource,

    /// Pointer to the location (e.g., "candidate.properties.logP")
    pub pointer: String,
}

impl Evidence {
    /// Create evidence from a candidate property.
    pub fn from_candidate(claim: impl Into<String>, property_key: &str) -> Self {
        Self {
            claim: claim.into(),
            source: EvidenceSource::Candidate,
            pointer: format!("candidate.properties.{}", property_key),
        }
    }

    /// Create evidence from a candidate's uncertainty interval.
    pub fn from_uncertainty(claim: impl Into<String>, property_key: &str) -> Self {
        Self {
            claim: claim.into(),
            source: EvidenceSource::Candidate,
            pointer: format!("candidate.uncertainty.{}", property_key),
        }
    }

    /// Create evidence from a constraint set entry.
    pub fn from_constraint(claim: impl Into<String>, set: &str, index: usize) -> Self {
        Self {
            claim: claim.into(),
            source: EvidenceSource::ConstraintSet,
            pointer: format!("{}.constraints[{}]", set, index),
        }
    }

    /// Create evidence from a population modifier.
    pub fn from_population(
        claim: impl Into<String>,
        population: &str,
        property_key: &str,
    ) -> Self {
        Self {
            claim: claim.into(),
            source: EvidenceSource::Population,
            pointer: format!("populations.{}.{}", population, property_key),
        }
    }
}
