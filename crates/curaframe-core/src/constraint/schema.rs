//! JSON Schema validation for bundle documents.
//!
//! Bundles are checked against `schema/constraint_bundle.schema.json` before
//! any constraint is built, so structural mistakes are reported with a path
//! into the document rather than as a serde error.

use std::sync::OnceLock;
use thiserror::Error;

/// Embedded bundle schema (loaded at compile time).
const BUNDLE_SCHEMA_JSON: &str = include_str!("../../schema/constraint_bundle.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Errors from schema loading.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to load schema: {0}")]
    LoadError(String),
}

fn get_validator() -> Result<&'static jsonschema::Validator, SchemaError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = serde_json::from_str(BUNDLE_SCHEMA_JSON)
            .map_err(|e| format!("Invalid schema JSON: {}", e))?;

        jsonschema::options()
            .build(&schema_value)
            .map_err(|e| format!("Failed to compile schema: {}", e))
    });

    result
        .as_ref()
        .map_err(|e| SchemaError::LoadError(e.clone()))
}

/// Validate a bundle document against the schema.
///
/// Returns every violation, each suffixed with its location in the document.
pub fn validate_bundle_schema(document: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = validator
        .iter_errors(document)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> serde_json::Value {
        serde_json::json!({
            "bundle_version": "1.0",
            "name": "Core Safety",
            "constraints": [
                {
                    "property": "hERG_IC50",
                    "comparator": "at_least",
                    "threshold": 10.0,
                    "severity": "critical",
                    "rationale": "QT prolongation risk"
                }
            ]
        })
    }

    #[test]
    fn test_valid_bundle_passes_schema() {
        assert!(validate_bundle_schema(&minimal()).is_ok());
    }

    #[test]
    fn test_schema_identifier_is_curaframe_urn() {
        let schema: serde_json::Value = serde_json::from_str(BUNDLE_SCHEMA_JSON).unwrap();
        assert_eq!(schema["$id"], "urn:curaframe:schema:constraint-bundle:1.0");
        assert!(get_validator().is_ok());
    }

    #[test]
    fn test_missing_constraints_fails() {
        let value = serde_json::json!({ "bundle_version": "1.0", "name": "Empty" });
        assert!(validate_bundle_schema(&value).is_err());
    }

    #[test]
    fn test_unknown_comparator_fails() {
        let mut value = minimal();
        value["constraints"][0]["comparator"] = "roughly".into();
        let errors = validate_bundle_schema(&value).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("/constraints/0/comparator")));
    }

    #[test]
    fn test_unknown_severity_fails() {
        let mut value = minimal();
        value["constraints"][0]["severity"] = "catastrophic".into();
        assert!(validate_bundle_schema(&value).is_err());
    }

    #[test]
    fn test_confidence_bounds_and_tiers() {
        let mut value = minimal();
        value["constraints"][0]["confidence"] = 1.5.into();
        assert!(validate_bundle_schema(&value).is_err());

        value["constraints"][0]["confidence"] = "moderate".into();
        assert!(validate_bundle_schema(&value).is_ok());
    }

    #[test]
    fn test_three_threshold_values_fail() {
        let mut value = minimal();
        value["constraints"][0]["threshold"] = serde_json::json!([1, 2, 3]);
        assert!(validate_bundle_schema(&value).is_err());
    }

    #[test]
    fn test_additional_properties_fail() {
        let mut value = minimal();
        value["owner"] = "someone".into();
        assert!(validate_bundle_schema(&value).is_err());
    }

    #[test]
    fn test_bad_version_format_fails() {
        let mut value = minimal();
        value["bundle_version"] = "one".into();
        assert!(validate_bundle_schema(&value).is_err());
    }
}
