//! Process-start wiring: catalog, registry, manifest and narrative.

use std::path::PathBuf;
use std::sync::Arc;

use super::orchestrator::AnalysisOrchestrator;
use super::types::AnalysisError;
use crate::catalog::{BundledSource, CatalogSource, CatalogStore, JsonDirectorySource};
use crate::config::{self, NarrativeSettings};
use crate::insights::{register_builtin_modules, InsightRegistry, JsonManifestSource, ManifestSource, StaticManifestSource};
use crate::narrative::{NarrativeCapability, OllamaNarrative, RetryPolicy};

/// Where each collaborator comes from.
#[derive(Debug, Clone, Default)]
pub struct CompositionOptions {
    /// `None` uses the bundled tables.
    pub catalog_dir: Option<PathBuf>,
    /// `None` uses the bundled manifest.
    pub manifest_path: Option<PathBuf>,
    /// `None` disables the narrative capability.
    pub narrative: Option<NarrativeSettings>,
}

impl CompositionOptions {
    /// Resolved from the environment and the application data directory.
    pub fn from_env() -> Self {
        Self {
            catalog_dir: config::catalog_dir(),
            manifest_path: config::manifest_path(),
            narrative: config::narrative_enabled().then(NarrativeSettings::from_env),
        }
    }
}

/// Builds a ready orchestrator. Catalog tables are loaded and validated here
/// so a broken catalog fails at start-up rather than on the first request.
pub fn compose(options: &CompositionOptions) -> Result<AnalysisOrchestrator, AnalysisError> {
    let source: Arc<dyn CatalogSource> = match &options.catalog_dir {
        Some(dir) => Arc::new(JsonDirectorySource::new(dir.clone(), config::CATALOG_VERSION)),
        None => Arc::new(BundledSource),
    };
    let catalog = Arc::new(CatalogStore::new(source));
    catalog.preload()?;

    let registry = InsightRegistry::new();
    register_builtin_modules(&registry)?;

    let manifests: Arc<dyn ManifestSource> = match &options.manifest_path {
        Some(path) => Arc::new(JsonManifestSource::new(path)),
        None => Arc::new(StaticManifestSource::bundled()?),
    };
    // Surface a bad manifest now; it is re-read per analysis.
    manifests.get_active_manifest()?.validate_against(&registry)?;

    let orchestrator = AnalysisOrchestrator::new(catalog, Arc::new(registry), manifests);
    let Some(settings) = &options.narrative else {
        return Ok(orchestrator);
    };
    match OllamaNarrative::from_settings(settings) {
        Ok(narrative) => {
            tracing::info!(url = %settings.base_url, model = %settings.model, "Narrative capability enabled");
            let capability: Arc<dyn NarrativeCapability> = Arc::new(narrative);
            Ok(orchestrator.with_narrative(capability, RetryPolicy::from(settings)))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Narrative capability could not be created, running deterministic only");
            Ok(orchestrator)
        }
    }
}
