//! Bundle documents: constraint sets parsed from YAML/JSON.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::model::{Constraint, ConstraintDefinitionError, ConstraintSpec};
use super::schema::validate_bundle_schema;
use super::set::ConstraintSet;

/// Current bundle document version.
pub const BUNDLE_VERSION: &str = "1.0";

/// Errors that can occur when loading bundle documents.
#[derive(Error, Debug)]
pub enum BundleError {
    #[error("Failed to read bundle file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Bundle failed schema validation: {}", .0.join("; "))]
    SchemaError(Vec<String>),

    #[error("constraints[{index}]: {source}")]
    InvalidConstraint {
        index: usize,
        #[source]
        source: ConstraintDefinitionError,
    },

    #[error(transparent)]
    Definition(#[from] ConstraintDefinitionError),
}

/// Raw document shape, after schema validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct BundleDocument {
    bundle_version: String,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    constraints: Vec<ConstraintSpec>,
}

/// A versioned constraint set loaded from a document.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintBundle {
    /// Version of the document format
    pub bundle_version: String,

    /// The validated constraint set
    pub set: ConstraintSet,
}

impl ConstraintBundle {
    /// Wrap an existing set for export.
    pub fn new(set: ConstraintSet) -> Self {
        Self {
            bundle_version: BUNDLE_VERSION.to_string(),
            set,
        }
    }

    /// Parse a bundle from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, BundleError> {
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Parse a bundle from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, BundleError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse a bundle from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, BundleError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse a bundle from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, BundleError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse a bundle file, choosing the format by extension (`.json` or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BundleError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_yaml_file(path),
        }
    }

    fn from_value(value: serde_json::Value) -> Result<Self, BundleError> {
        validate_bundle_schema(&value).map_err(BundleError::SchemaError)?;

        let document: BundleDocument = serde_json::from_value(value)?;

        let constraints = document
            .constraints
            .into_iter()
            .enumerate()
            .map(|(index, spec)| {
                Constraint::try_from(spec)
                    .map_err(|source| BundleError::InvalidConstraint { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut set = ConstraintSet::new(document.name, constraints)?;
        if let Some(description) = document.description {
            set = set.with_description(description);
        }

        Ok(Self {
            bundle_version: document.bundle_version,
            set,
        })
    }

    fn to_document(&self) -> BundleDocument {
        BundleDocument {
            bundle_version: self.bundle_version.clone(),
            name: self.set.name().to_string(),
            description: self.set.description().map(str::to_string),
            constraints: self
                .set
                .iter()
                .cloned()
                .map(ConstraintSpec::from)
                .collect(),
        }
    }

    /// Render as a YAML document that [`ConstraintBundle::from_yaml`] accepts.
    pub fn to_yaml(&self) -> Result<String, BundleError> {
        Ok(serde_yaml::to_string(&self.to_document())?)
    }

    /// Render as a pretty-printed JSON document.
    pub fn to_json(&self) -> Result<String, BundleError> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }

    pub fn into_set(self) -> ConstraintSet {
        self.set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::{Comparator, Threshold};
    use crate::types::Severity;

    const VALID_BUNDLE: &str = r#"
bundle_version: "1.0"
name: "Core Safety"
description: "Baseline screen"
constraints:
  - property: logP
    comparator: at_most
    threshold: 4.0
    severity: critical
    rationale: "Excessive lipophilicity increases off-target and cardiac risk"
    confidence: 0.9
    provenance:
      source: medicinal_chemistry_guideline
      references: ["doi:10.1016/S0169-409X(96)00423-1"]
      last_validated: "2024-06-01"
  - property: molecular_weight
    comparator: within_range
    threshold: [300, 550]
    severity: severe
    rationale: "Molecular weight outside this range reduces drug-like behavior"
"#;

    #[test]
    fn test_parse_valid_bundle() {
        let bundle = ConstraintBundle::from_yaml(VALID_BUNDLE).unwrap();
        assert_eq!(bundle.bundle_version, "1.0");
        assert_eq!(bundle.set.name(), "Core Safety");
        assert_eq!(bundle.set.description(), Some("Baseline screen"));
        assert_eq!(bundle.set.len(), 2);

        let logp = &bundle.set.constraints()[0];
        assert_eq!(logp.comparator(), Comparator::AtMost);
        assert_eq!(logp.severity(), Severity::Critical);
        assert!(logp.provenance().unwrap().last_validated.is_some());

        let mw = &bundle.set.constraints()[1];
        assert_eq!(
            mw.threshold(),
            &Threshold::Range {
                low: 300.0,
                high: 550.0
            }
        );
    }

    #[test]
    fn test_single_value_range_names_the_constraint() {
        let yaml = r#"
bundle_version: "1.0"
name: "Broken"
constraints:
  - property: molecular_weight
    comparator: within_range
    threshold: 300
    severity: severe
    rationale: "Window"
"#;
        let err = ConstraintBundle::from_yaml(yaml).unwrap_err();
        assert!(matches!(
            err,
            BundleError::InvalidConstraint {
                index: 0,
                source: ConstraintDefinitionError::ArityMismatch { .. }
            }
        ));
        assert!(err.to_string().contains("molecular_weight"));
    }

    #[test]
    fn test_schema_errors_are_reported() {
        let yaml = r#"
bundle_version: "1.0"
name: "Broken"
constraints:
  - property: logP
    comparator: roughly
    threshold: 4
    severity: critical
    rationale: "x"
"#;
        assert!(matches!(
            ConstraintBundle::from_yaml(yaml),
            Err(BundleError::SchemaError(_))
        ));
    }

    #[test]
    fn test_duplicate_constraints_rejected() {
        let yaml = r#"
bundle_version: "1.0"
name: "Dup"
constraints:
  - { property: logP, comparator: at_most, threshold: 4, severity: critical, rationale: a }
  - { property: logP, comparator: at_most, threshold: 5, severity: critical, rationale: b }
"#;
        assert!(matches!(
            ConstraintBundle::from_yaml(yaml),
            Err(BundleError::Definition(
                ConstraintDefinitionError::Duplicate { .. }
            ))
        ));
    }

    #[test]
    fn test_yaml_export_reloads() {
        let bundle = ConstraintBundle::from_yaml(VALID_BUNDLE).unwrap();
        let exported = bundle.to_yaml().unwrap();
        let reloaded = ConstraintBundle::from_yaml(&exported).unwrap();
        assert_eq!(bundle, reloaded);
    }

    #[test]
    fn test_json_bundle() {
        let json = r#"{
            "bundle_version": "1.0",
            "name": "Selectivity",
            "constraints": [
                {"property": "beta1_selectivity", "comparator": "at_least", "threshold": 100,
                 "severity": "severe", "rationale": "Bronchospasm risk", "confidence": "high"}
            ]
        }"#;
        let bundle = ConstraintBundle::from_json(json).unwrap();
        assert_eq!(bundle.set.constraints()[0].confidence().score(), 0.9);
    }
}
