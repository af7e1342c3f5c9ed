//! Shared enums used across the constraint model and evaluation results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Criticality tier of a constraint.
///
/// Ordered `Warning < Severe < Critical`, so aggregation can compare tiers
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Caution advised, not grounds for rejection.
    Warning,
    /// Rejects the candidate when violated.
    Severe,
    /// Rejects the candidate when violated or when it cannot be evaluated.
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Severe => "severe",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

/// Why a constraint could not be evaluated against a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndeterminateReason {
    /// The candidate has no value for the constraint's property.
    MissingProperty,
    /// The value exists but is not of the kind the comparator requires.
    TypeMismatch,
    /// Worst-case evaluation was requested but the supplied interval is unusable.
    InvalidUncertainty,
}

impl IndeterminateReason {
    /// Machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            IndeterminateReason::MissingProperty => "missing_property",
            IndeterminateReason::TypeMismatch => "type_mismatch",
            IndeterminateReason::InvalidUncertainty => "invalid_uncertainty",
        }
    }
}

impl fmt::Display for IndeterminateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Classification of one candidate against one constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Classification {
    Pass,
    Violation,
    Indeterminate { reason: IndeterminateReason },
}

impl Classification {
    pub fn is_pass(&self) -> bool {
        matches!(self, Classification::Pass)
    }

    pub fn is_violation(&self) -> bool {
        matches!(self, Classification::Violation)
    }

    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Classification::Indeterminate { .. })
    }

    /// Returns the reason when indeterminate.
    pub fn reason(&self) -> Option<IndeterminateReason> {
        match self {
            Classification::Indeterminate { reason } => Some(*reason),
            _ => None,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Pass => f.write_str("PASS"),
            Classification::Violation => f.write_str("VIOLATION"),
            Classification::Indeterminate { reason } => write!(f, "INDETERMINATE ({})", reason),
        }
    }
}

/// Final accept/reject decision for a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Accepted,
    Rejected,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Accepted => f.write_str("ACCEPTED"),
            Verdict::Rejected => f.write_str("REJECTED"),
        }
    }
}

/// Where a piece of evidence points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSource {
    Candidate,
    ConstraintSet,
    Population,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_total_order() {
        assert!(Severity::Warning < Severity::Severe);
        assert!(Severity::Severe < Severity::Critical);
        assert_eq!(
            [Severity::Critical, Severity::Warning, Severity::Severe]
                .iter()
                .max(),
            Some(&Severity::Critical)
        );
    }

    #[test]
    fn test_reason_codes() {
        assert_eq!(IndeterminateReason::MissingProperty.code(), "missing_property");
        assert_eq!(IndeterminateReason::TypeMismatch.code(), "type_mismatch");
    }

    #[test]
    fn test_classification_serializes_with_reason() {
        let c = Classification::Indeterminate {
            reason: IndeterminateReason::MissingProperty,
        };
        let json = serde_json::to_value(c).unwrap();
        assert_eq!(json["status"], "indeterminate");
        assert_eq!(json["reason"], "missing_property");
    }
}
