//! Per-constraint outcomes and the frozen evaluation result.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

use crate::candidate::{Interval, PropertyValue};
use crate::constraint::Constraint;
use crate::evidence::Evidence;
use crate::types::{Classification, Severity, Verdict};

/// Classification of one candidate against one (possibly tightened) constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// The constraint as evaluated, after any population tightening
    pub constraint: Constraint,

    /// The value that was compared, if the property was present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed: Option<PropertyValue>,

    pub classification: Classification,

    /// Signed distance to the threshold, positive when passing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<f64>,

    /// Uncertainty interval the outcome was judged on, under the worst-case policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worst_case: Option<Interval>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<Evidence>,
}

impl Outcome {
    pub fn severity(&self) -> Severity {
        self.constraint.severity()
    }

    /// Whether this outcome alone forces a REJECTED verdict.
    ///
    /// Violations block at SEVERE and above; indeterminate outcomes only
    /// block at CRITICAL.
    pub fn is_blocking(&self) -> bool {
        match self.classification {
            Classification::Pass => false,
            Classification::Violation => self.severity() >= Severity::Severe,
            Classification::Indeterminate { .. } => self.severity() == Severity::Critical,
        }
    }

    fn report_line(&self) -> String {
        let constraint = &self.constraint;
        let observed = match (&self.observed, self.classification.reason()) {
            (None, Some(reason)) => reason.to_string(),
            (Some(value), Some(reason)) => format!("observed {} ({})", value, reason),
            (Some(value), None) => match self.worst_case {
                Some(interval) => format!(
                    "observed {} ({})",
                    value,
                    self.worst_case_note(&interval)
                ),
                None => format!("observed {}", value),
            },
            (None, None) => "no observation".to_string(),
        };
        let mut line = format!(
            "[{}] {}: {}, required {}",
            constraint.severity(),
            constraint.property_key(),
            observed,
            constraint.requirement()
        );
        if let Some(margin) = self.margin {
            line.push_str(&format!(" (margin {:+.3})", margin));
        }
        line.push_str(&format!("\n    Rationale: {}", constraint.rationale()));
        line.push_str(&format!("\n    Confidence: {}", constraint.confidence()));
        if let (Some(record), Some(base)) =
            (constraint.tightening(), constraint.base_requirement())
        {
            line.push_str(&format!(
                "\n    Tightened for {} from {} ({})",
                record.population, base, record.modifier
            ));
        }
        line
    }

    fn worst_case_note(&self, interval: &Interval) -> String {
        match self.constraint.comparator().pessimistic_value(interval) {
            Some(compared) => format!(
                "worst case {} over [{}, {}]",
                compared, interval.lower, interval.upper
            ),
            None => format!("worst case over [{}, {}]", interval.lower, interval.upper),
        }
    }
}

/// The full evaluation record for one candidate.
///
/// Built once by the engine and never modified afterwards. Carries no
/// timestamps: identical inputs always produce identical results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Name of the evaluated candidate
    pub candidate: String,

    /// Name of the constraint set
    pub constraint_set: String,

    /// Population context, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population: Option<String>,

    /// One outcome per constraint, in declared order
    pub outcomes: Vec<Outcome>,

    pub verdict: Verdict,

    /// Minimum confidence across evaluated constraints (1.0 when there are none)
    pub confidence: f64,

    /// Notes that qualify the verdict without changing it
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub advisories: Vec<String>,
}

impl EvaluationResult {
    pub fn is_accepted(&self) -> bool {
        self.verdict == Verdict::Accepted
    }

    pub fn is_rejected(&self) -> bool {
        self.verdict == Verdict::Rejected
    }

    /// All violations, most severe first; ties keep declaration order.
    pub fn violations(&self) -> Vec<&Outcome> {
        let mut violations: Vec<&Outcome> = self
            .outcomes
            .iter()
            .filter(|o| o.classification.is_violation())
            .collect();
        violations.sort_by_key(|o| Reverse(o.severity()));
        violations
    }

    /// Violations of WARNING constraints. Reported, never blocking.
    pub fn warnings(&self) -> Vec<&Outcome> {
        self.outcomes
            .iter()
            .filter(|o| o.classification.is_violation() && o.severity() == Severity::Warning)
            .collect()
    }

    pub fn indeterminates(&self) -> Vec<&Outcome> {
        self.outcomes
            .iter()
            .filter(|o| o.classification.is_indeterminate())
            .collect()
    }

    pub fn passes(&self) -> Vec<&Outcome> {
        self.outcomes
            .iter()
            .filter(|o| o.classification.is_pass())
            .collect()
    }

    /// Outcomes responsible for a REJECTED verdict.
    pub fn blocking(&self) -> Vec<&Outcome> {
        self.outcomes.iter().filter(|o| o.is_blocking()).collect()
    }

    pub fn has_critical_violations(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| o.classification.is_violation() && o.severity() == Severity::Critical)
    }

    /// Multi-line report listing every non-PASS outcome.
    ///
    /// Deterministic for a given result, suitable for audit logs.
    pub fn summary(&self) -> String {
        let mut lines = vec![format!("Evaluation: {}", self.verdict)];
        lines.push(format!("Candidate: {}", self.candidate));
        lines.push(format!("Constraint set: {}", self.constraint_set));
        if let Some(population) = &self.population {
            lines.push(format!("Population: {}", population));
        }
        lines.push(format!(
            "Passed: {} of {} constraints",
            self.passes().len(),
            self.outcomes.len()
        ));
        lines.push(format!("Confidence: {:.2}", self.confidence));

        let violations = self.violations();
        if !violations.is_empty() {
            lines.push(format!("\nViolations ({}):", violations.len()));
            for outcome in violations {
                lines.push(format!("  • {}", outcome.report_line()));
            }
        }

        let indeterminates = self.indeterminates();
        if !indeterminates.is_empty() {
            lines.push(format!("\nIndeterminate ({}):", indeterminates.len()));
            for outcome in indeterminates {
                lines.push(format!("  • {}", outcome.report_line()));
            }
        }

        if !self.advisories.is_empty() {
            lines.push(format!("\nAdvisories ({}):", self.advisories.len()));
            for note in &self.advisories {
                lines.push(format!("  • {}", note));
            }
        }

        lines.join("\n")
    }
}
