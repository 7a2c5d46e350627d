use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::registry::InsightRegistry;

const BUNDLED_MANIFEST: &str = include_str!("../../resources/manifests/default.json");

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ManifestError {
    #[error("Manifest not found at {0}: {1}")]
    NotFound(String, String),

    #[error("Manifest parse error in {0}: {1}")]
    Parse(String, String),

    #[error("Manifest {manifest} enables unregistered insights: {entries:?}")]
    Unregistered {
        manifest: String,
        entries: Vec<String>,
    },
}

fn default_enabled() -> bool {
    true
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManifestEntry {
    pub insight_id: String,
    pub version: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Run and output order; higher first.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl ManifestEntry {
    pub fn key(&self) -> String {
        format!("{}@{}", self.insight_id, self.version)
    }
}

/// Declarative selection of the insight modules an analysis runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsightManifest {
    pub id: String,
    pub entries: Vec<ManifestEntry>,
}

impl InsightManifest {
    /// The manifest shipped with the crate.
    pub fn bundled() -> Result<Self, ManifestError> {
        serde_json::from_str(BUNDLED_MANIFEST)
            .map_err(|e| ManifestError::Parse("bundled".into(), e.to_string()))
    }

    /// Enabled entries by descending weight. Equal weights keep manifest order.
    pub fn enabled_entries(&self) -> Vec<&ManifestEntry> {
        let mut enabled: Vec<&ManifestEntry> = self.entries.iter().filter(|e| e.enabled).collect();
        enabled.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        enabled
    }

    /// Fails listing every enabled entry the registry does not know.
    pub fn validate_against(&self, registry: &InsightRegistry) -> Result<(), ManifestError> {
        let missing: Vec<String> = self
            .enabled_entries()
            .into_iter()
            .filter(|e| !registry.is_registered(&e.insight_id, &e.version))
            .map(ManifestEntry::key)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ManifestError::Unregistered {
                manifest: self.id.clone(),
                entries: missing,
            })
        }
    }
}

/// Supplies the manifest in effect for the next analysis.
pub trait ManifestSource: Send + Sync {
    fn get_active_manifest(&self) -> Result<InsightManifest, ManifestError>;
}

pub struct StaticManifestSource {
    manifest: InsightManifest,
}

impl StaticManifestSource {
    pub fn new(manifest: InsightManifest) -> Self {
        Self { manifest }
    }

    pub fn bundled() -> Result<Self, ManifestError> {
        Ok(Self::new(InsightManifest::bundled()?))
    }
}

impl ManifestSource for StaticManifestSource {
    fn get_active_manifest(&self) -> Result<InsightManifest, ManifestError> {
        Ok(self.manifest.clone())
    }
}

/// Re-reads the file on every call so edits apply to the next analysis.
pub struct JsonManifestSource {
    path: PathBuf,
}

impl JsonManifestSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ManifestSource for JsonManifestSource {
    fn get_active_manifest(&self) -> Result<InsightManifest, ManifestError> {
        let shown = self.path.display().to_string();
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| ManifestError::NotFound(shown.clone(), e.to_string()))?;
        let manifest: InsightManifest =
            serde_json::from_str(&content).map_err(|e| ManifestError::Parse(shown.clone(), e.to_string()))?;
        tracing::debug!(path = %shown, manifest = %manifest.id, "Loaded insight manifest");
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::register_builtin_modules;

    #[test]
    fn bundled_manifest_orders_by_weight() {
        let manifest = InsightManifest::bundled().unwrap();
        let ids: Vec<&str> = manifest
            .enabled_entries()
            .iter()
            .map(|e| e.insight_id.as_str())
            .collect();
        assert_eq!(ids.len(), 6);
        assert_eq!(&ids[..2], &["insulin_resistance", "lipid_ratios"]);
        assert_eq!(ids[5], "de_ritis_ratio");
    }

    #[test]
    fn bundled_manifest_matches_builtins() {
        let registry = InsightRegistry::new();
        register_builtin_modules(&registry).unwrap();
        InsightManifest::bundled().unwrap().validate_against(&registry).unwrap();
    }

    #[test]
    fn disabled_entries_are_skipped_and_unknown_reported() {
        let manifest: InsightManifest = serde_json::from_str(
            r#"{"id":"m","entries":[
                {"insight_id":"lipid_ratios","version":"1.0.0","enabled":false},
                {"insight_id":"nope","version":"1.0.0","weight":0.5},
                {"insight_id":"ghost","version":"2.0.0","enabled":false}
            ]}"#,
        )
        .unwrap();
        assert_eq!(manifest.enabled_entries().len(), 1);
        let err = manifest.validate_against(&InsightRegistry::new()).unwrap_err();
        assert_eq!(
            err,
            ManifestError::Unregistered {
                manifest: "m".into(),
                entries: vec!["nope@1.0.0".into()],
            }
        );
    }

    #[test]
    fn json_source_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, r#"{"id":"disk","entries":[]}"#).unwrap();
        let manifest = JsonManifestSource::new(&path).get_active_manifest().unwrap();
        assert_eq!(manifest.id, "disk");

        let missing = JsonManifestSource::new(dir.path().join("absent.json"));
        assert!(matches!(missing.get_active_manifest(), Err(ManifestError::NotFound(..))));
    }
}
