//! # curaframe-catalog
//!
//! Bundled constraint sets and the standard population registry.
//!
//! Every bundle is an embedded YAML document loaded through
//! [`ConstraintBundle::from_yaml`], so catalog entries go through the same
//! schema and definition checks as user-supplied files.

use curaframe_core::{
    BundleError, ConstraintBundle, ConstraintSet, PopulationError, PopulationRegistry,
};
use thiserror::Error;
use tracing::debug;

const BUNDLES: &[(&str, &str)] = &[
    ("core_safety", include_str!("../catalog/bundles/core_safety.yaml")),
    ("lipinski", include_str!("../catalog/bundles/lipinski.yaml")),
    ("cns", include_str!("../catalog/bundles/cns.yaml")),
    ("cardiology", include_str!("../catalog/bundles/cardiology.yaml")),
    ("cardianx", include_str!("../catalog/bundles/cardianx.yaml")),
];

const POPULATIONS: &str = include_str!("../catalog/populations.yaml");

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("unknown bundle '{name}' (available: {})", .available.join(", "))]
    UnknownBundle { name: String, available: Vec<String> },

    #[error("catalog bundle '{id}' failed to load: {source}")]
    Bundle {
        id: String,
        #[source]
        source: BundleError,
    },

    #[error("standard populations failed to load: {0}")]
    Populations(#[from] PopulationError),
}

/// Identifiers of every bundled constraint set, in catalog order.
pub fn bundle_ids() -> Vec<&'static str> {
    BUNDLES.iter().map(|(id, _)| *id).collect()
}

/// Raw YAML of a bundle, for export.
pub fn bundle_source(id: &str) -> Option<&'static str> {
    BUNDLES
        .iter()
        .find(|(candidate, _)| *candidate == id)
        .map(|(_, source)| *source)
}

/// Load a bundle by identifier (`core_safety`) or display name (`Core Safety`).
pub fn bundle(name: &str) -> Result<ConstraintBundle, CatalogError> {
    if let Some(source) = bundle_source(name) {
        return load(name, source);
    }
    for (id, source) in BUNDLES {
        let bundle = load(id, source)?;
        if bundle.set.name().eq_ignore_ascii_case(name) {
            return Ok(bundle);
        }
    }
    Err(CatalogError::UnknownBundle {
        name: name.to_string(),
        available: bundle_ids().into_iter().map(str::to_string).collect(),
    })
}

/// The constraint set of a bundle.
pub fn constraint_set(name: &str) -> Result<ConstraintSet, CatalogError> {
    Ok(bundle(name)?.into_set())
}

/// Every bundle, paired with its identifier.
pub fn bundles() -> Result<Vec<(&'static str, ConstraintBundle)>, CatalogError> {
    BUNDLES
        .iter()
        .map(|(id, source)| load(id, source).map(|bundle| (*id, bundle)))
        .collect()
}

/// The standard populations (asthmatic, elderly, ...).
pub fn standard_populations() -> Result<PopulationRegistry, CatalogError> {
    let registry = PopulationRegistry::from_yaml(POPULATIONS)?;
    debug!(populations = ?registry.names(), "loaded standard populations");
    Ok(registry)
}

fn load(id: &str, source: &str) -> Result<ConstraintBundle, CatalogError> {
    let bundle = ConstraintBundle::from_yaml(source).map_err(|source| CatalogError::Bundle {
        id: id.to_string(),
        source,
    })?;
    debug!(bundle = id, constraints = bundle.set.len(), "loaded catalog bundle");
    Ok(bundle)
}
