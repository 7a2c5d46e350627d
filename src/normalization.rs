//! Alias-keyed raw values → canonical `BiomarkerPanel`.
//!
//! Values are carried over unconverted and tagged with the catalog unit;
//! unit harmonisation happens at classification and analysis time.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogError, CatalogStore};
use crate::models::{BiomarkerPanel, BiomarkerValue};

/// Provenance tag on panels built by the normalizer.
pub const NORMALIZED_PROVENANCE: &str = "normalized";

/// Lowercased label → (canonical name, catalog unit).
#[derive(Debug, Default)]
pub struct AliasIndex {
    entries: HashMap<String, (String, String)>,
}

impl AliasIndex {
    pub fn resolve(&self, label: &str) -> Option<&str> {
        self.entries
            .get(&label.trim().to_lowercase())
            .map(|(name, _)| name.as_str())
    }

    fn resolve_with_unit(&self, label: &str) -> Option<&(String, String)> {
        self.entries.get(&label.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationOutcome {
    pub panel: BiomarkerPanel,
    /// Input keys with no catalog match, in sorted key order.
    pub unmapped_keys: Vec<String>,
    /// Input keys dropped because an earlier key in sorted order already
    /// resolved to the same biomarker.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub duplicate_keys: Vec<String>,
}

pub struct BiomarkerNormalizer {
    catalog: Arc<CatalogStore>,
    index: RwLock<Option<Arc<AliasIndex>>>,
}

impl BiomarkerNormalizer {
    pub fn new(catalog: Arc<CatalogStore>) -> Self {
        Self {
            catalog,
            index: RwLock::new(None),
        }
    }

    /// The alias index, built from the catalog on first use.
    pub fn index(&self) -> Result<Arc<AliasIndex>, CatalogError> {
        if let Some(index) = self.index.read().map_err(|_| CatalogError::LockFailed)?.as_ref() {
            return Ok(Arc::clone(index));
        }
        let built = Arc::new(self.build_index()?);
        let mut guard = self.index.write().map_err(|_| CatalogError::LockFailed)?;
        Ok(Arc::clone(guard.get_or_insert(built)))
    }

    /// Rebuild the index from the catalog, e.g. after `CatalogStore::reload`.
    pub fn rebuild_index(&self) -> Result<Arc<AliasIndex>, CatalogError> {
        let built = Arc::new(self.build_index()?);
        *self.index.write().map_err(|_| CatalogError::LockFailed)? = Some(Arc::clone(&built));
        Ok(built)
    }

    fn build_index(&self) -> Result<AliasIndex, CatalogError> {
        let table = self.catalog.load_biomarkers()?;
        let mut entries = HashMap::new();
        for def in &table.records {
            let target = (def.name.clone(), def.unit.clone());
            entries.insert(def.name.to_lowercase(), target.clone());
            for alias in &def.aliases {
                entries.insert(alias.trim().to_lowercase(), target.clone());
            }
        }
        tracing::debug!(labels = entries.len(), "Alias index built");
        Ok(AliasIndex { entries })
    }

    pub fn normalize(&self, raw: &BTreeMap<String, f64>) -> Result<NormalizationOutcome, CatalogError> {
        let index = self.index()?;
        let mut panel = BiomarkerPanel::new(NORMALIZED_PROVENANCE);
        let mut unmapped_keys = Vec::new();
        let mut duplicate_keys = Vec::new();

        // BTreeMap iteration is sorted, so the lowest key wins a collision.
        for (key, value) in raw {
            let Some((name, unit)) = index.resolve_with_unit(key) else {
                unmapped_keys.push(key.clone());
                continue;
            };
            if panel.contains(name) {
                tracing::warn!(
                    key = %key,
                    canonical = %name,
                    "Duplicate input for biomarker, keeping the lowest-sorted key"
                );
                duplicate_keys.push(key.clone());
                continue;
            }
            panel.insert(BiomarkerValue::new(name.clone(), *value, unit.clone()));
        }

        if !unmapped_keys.is_empty() {
            tracing::info!(unmapped = ?unmapped_keys, "Input keys did not match the catalog");
        }

        Ok(NormalizationOutcome {
            panel,
            unmapped_keys,
            duplicate_keys,
        })
    }

    /// Keys whose resolution is not exactly themselves: aliases, wrong case,
    /// and unknown names.
    pub fn validate_canonical_only<'a>(
        &self,
        keys: impl IntoIterator<Item = &'a str>,
    ) -> Result<Vec<String>, CatalogError> {
        let index = self.index()?;
        Ok(keys
            .into_iter()
            .filter(|key| index.resolve(key) != Some(*key))
            .map(str::to_string)
            .collect())
    }

    /// Like `validate_canonical_only`, also flagging entries whose value is
    /// filed under a different name than it carries.
    pub fn validate_panel(&self, panel: &BiomarkerPanel) -> Result<Vec<String>, CatalogError> {
        let mut offending = self.validate_canonical_only(panel.names())?;
        for (key, value) in &panel.values {
            if value.name != *key && !offending.contains(key) {
                offending.push(key.clone());
            }
        }
        Ok(offending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> BiomarkerNormalizer {
        BiomarkerNormalizer::new(Arc::new(CatalogStore::bundled()))
    }

    fn raw(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn aliases_map_case_insensitively() {
        let outcome = normalizer()
            .normalize(&raw(&[("GLU", 92.0), ("HbA1c", 5.4), ("LDL-C", 120.0)]))
            .unwrap();
        assert_eq!(outcome.panel.value("glucose"), Some(92.0));
        assert_eq!(outcome.panel.value("hba1c"), Some(5.4));
        assert_eq!(outcome.panel.value("ldl_cholesterol"), Some(120.0));
        assert!(outcome.unmapped_keys.is_empty());
    }

    #[test]
    fn values_keep_input_number_and_catalog_unit() {
        let outcome = normalizer().normalize(&raw(&[("blood_glucose", 5.2)])).unwrap();
        let value = outcome.panel.get("glucose").unwrap();
        assert_eq!(value.value, 5.2);
        assert_eq!(value.unit, "mg/dL");
    }

    #[test]
    fn unmapped_keys_are_reported() {
        let outcome = normalizer()
            .normalize(&raw(&[("glucose", 90.0), ("mystery_marker", 1.0)]))
            .unwrap();
        assert_eq!(outcome.unmapped_keys, vec!["mystery_marker".to_string()]);
        assert_eq!(outcome.panel.len(), 1);
    }

    #[test]
    fn colliding_labels_keep_lowest_sorted_key() {
        let outcome = normalizer()
            .normalize(&raw(&[("glucose", 90.0), ("GLU", 5.0), ("zz_unknown", 1.0), ("aa_unknown", 2.0)]))
            .unwrap();
        assert_eq!(outcome.panel.value("glucose"), Some(5.0));
        assert_eq!(outcome.duplicate_keys, vec!["glucose".to_string()]);
        assert_eq!(outcome.unmapped_keys, vec!["aa_unknown".to_string(), "zz_unknown".to_string()]);
    }

    #[test]
    fn normalized_panel_is_canonical() {
        let n = normalizer();
        let catalog = CatalogStore::bundled();
        let table = catalog.load_biomarkers().unwrap();
        let mut input = BTreeMap::new();
        for (i, def) in table.records.iter().enumerate() {
            let label = def.aliases.first().unwrap_or(&def.name).to_uppercase();
            input.insert(label, i as f64);
        }
        let outcome = n.normalize(&input).unwrap();
        assert!(n.validate_panel(&outcome.panel).unwrap().is_empty());
        assert_eq!(outcome.panel.len(), table.records.len());
    }

    #[test]
    fn validation_flags_aliases_and_unknowns() {
        let flagged = normalizer()
            .validate_canonical_only(["glucose", "ldl", "Glucose", "nonsense"])
            .unwrap();
        assert_eq!(flagged, vec!["ldl", "Glucose", "nonsense"]);
    }

    #[test]
    fn validate_panel_flags_misfiled_values() {
        let mut panel = BiomarkerPanel::new("manual");
        panel
            .values
            .insert("glucose".into(), BiomarkerValue::new("insulin", 10.0, "uIU/mL"));
        assert_eq!(normalizer().validate_panel(&panel).unwrap(), vec!["glucose"]);
    }

    #[test]
    fn rebuild_replaces_index() {
        let n = normalizer();
        let first = n.index().unwrap();
        let rebuilt = n.rebuild_index().unwrap();
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert_eq!(first.len(), rebuilt.len());
        assert!(Arc::ptr_eq(&rebuilt, &n.index().unwrap()));
    }
}
