//! Deterministic insight modules and their versioned registry.
//!
//! A module turns a canonical panel plus subject context into zero or more
//! [`InsightResult`]s. Which modules run is decided by an [`InsightManifest`];
//! the [`InsightRegistry`] maps the manifest's `(id, version)` pairs to
//! instances. Registration is explicit: call [`register_builtin_modules`]
//! once while composing the application.

pub mod helpers;
pub mod manifest;
pub mod modules;
pub mod registry;
pub mod types;

pub use manifest::{
    InsightManifest, JsonManifestSource, ManifestEntry, ManifestError, ManifestSource, StaticManifestSource,
};
pub use registry::{InsightRegistry, RegistryError};
pub use types::{EvidenceItem, InsightFindings, InsightModule, InsightOutcome, InsightResult};

use modules::*;

/// Registers every built-in module at version 1.0.0.
pub fn register_builtin_modules(registry: &InsightRegistry) -> Result<(), RegistryError> {
    registry.register(INSULIN_RESISTANCE_ID, "1.0.0", InsulinResistanceModule::new)?;
    registry.register(LIPID_RATIOS_ID, "1.0.0", LipidRatiosModule::new)?;
    registry.register(BIOLOGICAL_AGE_ID, "1.0.0", BiologicalAgeModule::new)?;
    registry.register(NEUTROPHIL_LYMPHOCYTE_ID, "1.0.0", NeutrophilLymphocyteModule::new)?;
    registry.register(BUN_CREATININE_ID, "1.0.0", BunCreatinineModule::new)?;
    registry.register(DE_RITIS_ID, "1.0.0", DeRitisModule::new)?;
    tracing::info!(modules = registry.len(), "Built-in insight modules registered");
    Ok(())
}
