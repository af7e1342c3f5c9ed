//! Synthesizer: Aggregates per-constraint outcomes into the final result.
//!
//! The synthesizer applies strict, non-configurable policy rules:
//! 1. If ANY constraint at SEVERE or CRITICAL is violated → REJECTED
//! 2. Else if ANY constraint at CRITICAL is indeterminate → REJECTED
//! 3. Else → ACCEPTED
//!
//! WARNING violations and lower-severity indeterminates are reported but
//! never change the verdict. Configuration only affects advisories.

use crate::config::EngineConfig;
use crate::outcome::{EvaluationResult, Outcome};
use crate::types::{Classification, Severity, Verdict};

/// The Synthesizer aggregates outcomes into a verdict, confidence, and advisories.
pub struct Synthesizer {
    well_established_confidence: f64,
    well_established_references: usize,
    verification_threshold: f64,
}

impl Synthesizer {
    pub fn new() -> Self {
        Self::from_config(&EngineConfig::default())
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            well_established_confidence: config.well_established_confidence,
            well_established_references: config.well_established_references,
            verification_threshold: config.verification_threshold,
        }
    }

    /// Build the frozen result for one candidate.
    pub fn synthesize(
        &self,
        candidate: &str,
        constraint_set: &str,
        population: Option<&str>,
        outcomes: Vec<Outcome>,
    ) -> EvaluationResult {
        let verdict = verdict_for(&outcomes);
        let confidence = self.calculate_confidence(&outcomes);
        let advisories = self.build_advisories(&outcomes);

        EvaluationResult {
            candidate: candidate.to_string(),
            constraint_set: constraint_set.to_string(),
            population: population.map(str::to_string),
            outcomes,
            verdict,
            confidence,
            advisories,
        }
    }

    /// Minimum constraint confidence; 1.0 for an empty set.
    fn calculate_confidence(&self, outcomes: &[Outcome]) -> f64 {
        outcomes
            .iter()
            .map(|o| o.constraint.confidence().score())
            .fold(1.0, f64::min)
            .clamp(0.0, 1.0)
    }

    fn build_advisories(&self, outcomes: &[Outcome]) -> Vec<String> {
        let mut advisories = Vec::new();
        for outcome in outcomes {
            let constraint = &outcome.constraint;
            match outcome.classification {
                Classification::Violation
                    if !constraint.is_well_established(
                        self.well_established_confidence,
                        self.well_established_references,
                    ) =>
                {
                    let note = if constraint.requires_verification(self.verification_threshold) {
                        "requires independent verification"
                    } else {
                        "is not well established"
                    };
                    advisories.push(format!(
                        "Violation of {} rests on a constraint that {} (confidence {}, {} reference(s))",
                        constraint.label(),
                        note,
                        constraint.confidence(),
                        constraint.provenance().map_or(0, |p| p.references.len())
                    ));
                }
                Classification::Indeterminate { reason }
                    if constraint.severity() == Severity::Critical =>
                {
                    advisories.push(format!(
                        "CRITICAL constraint {} could not be evaluated ({}); treated as a rejection",
                        constraint.label(),
                        reason
                    ));
                }
                _ => {}
            }
        }
        advisories
    }
}

/// REJECTED iff any outcome is blocking.
pub fn verdict_for(outcomes: &[Outcome]) -> Verdict {
    if outcomes.iter().any(|o| o.is_blocking()) {
        Verdict::Rejected
    } else {
        Verdict::Accepted
    }
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::Comparator;
    use crate::constraint::{Constraint, Provenance};
    use crate::types::IndeterminateReason;

    fn outcome(severity: Severity, classification: Classification, confidence: f64) -> Outcome {
        Outcome {
            constraint: Constraint::builder("hERG_IC50", Comparator::AtLeast)
                .bound(10.0)
                .severity(severity)
                .rationale("QT prolongation risk")
                .confidence(confidence)
                .build()
                .unwrap(),
            observed: None,
            classification,
            margin: None,
            worst_case: None,
            evidence: vec![],
        }
    }

    fn missing() -> Classification {
        Classification::Indeterminate {
            reason: IndeterminateReason::MissingProperty,
        }
    }

    #[test]
    fn test_all_pass_yields_accepted() {
        let outcomes = vec![
            outcome(Severity::Critical, Classification::Pass, 0.9),
            outcome(Severity::Severe, Classification::Pass, 0.9),
        ];
        let result = Synthesizer::new().synthesize("c1", "set", None, outcomes);
        assert_eq!(result.verdict, Verdict::Accepted);
    }

    #[test]
    fn test_severe_violation_yields_rejected() {
        let outcomes = vec![
            outcome(Severity::Critical, Classification::Pass, 0.9),
            outcome(Severity::Severe, Classification::Violation, 0.9),
        ];
        assert_eq!(verdict_for(&outcomes), Verdict::Rejected);
    }

    #[test]
    fn test_warning_violation_does_not_reject() {
        let outcomes = vec![outcome(Severity::Warning, Classification::Violation, 0.9)];
        assert_eq!(verdict_for(&outcomes), Verdict::Accepted);
    }

    #[test]
    fn test_indeterminate_blocks_only_at_critical() {
        assert_eq!(
            verdict_for(&[outcome(Severity::Severe, missing(), 0.9)]),
            Verdict::Accepted
        );
        assert_eq!(
            verdict_for(&[outcome(Severity::Warning, missing(), 0.9)]),
            Verdict::Accepted
        );
        assert_eq!(
            verdict_for(&[outcome(Severity::Critical, missing(), 0.9)]),
            Verdict::Rejected
        );
    }

    #[test]
    fn test_confidence_is_minimum() {
        let outcomes = vec![
            outcome(Severity::Critical, Classification::Pass, 0.9),
            outcome(Severity::Severe, Classification::Pass, 0.5),
        ];
        let result = Synthesizer::new().synthesize("c1", "set", None, outcomes);
        assert_eq!(result.confidence, 0.5);

        let empty = Synthesizer::new().synthesize("c1", "set", None, vec![]);
        assert_eq!(empty.confidence, 1.0);
        assert_eq!(empty.verdict, Verdict::Accepted);
    }

    #[test]
    fn test_advisory_for_weakly_supported_violation() {
        let result = Synthesizer::new().synthesize(
            "c1",
            "set",
            None,
            vec![outcome(Severity::Severe, Classification::Violation, 0.5)],
        );
        assert_eq!(result.advisories.len(), 1);
        assert!(result.advisories[0].contains("requires independent verification"));
    }

    #[test]
    fn test_no_advisory_for_well_established_violation() {
        let mut o = outcome(Severity::Severe, Classification::Violation, 0.9);
        o.constraint = Constraint::builder("hERG_IC50", Comparator::AtLeast)
            .bound(10.0)
            .severity(Severity::Severe)
            .rationale("QT prolongation risk")
            .confidence(0.9)
            .provenance(
                Provenance::new("ICH_S7B")
                    .with_reference("a")
                    .with_reference("b")
                    .with_reference("c"),
            )
            .build()
            .unwrap();
        let result = Synthesizer::new().synthesize("c1", "set", None, vec![o]);
        assert!(result.advisories.is_empty());
    }
}
