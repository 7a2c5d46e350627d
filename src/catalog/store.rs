use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::models::{BiomarkerDefinition, ReferenceRange, UnitTable};

use super::error::CatalogError;
use super::source::{BundledSource, CatalogSource, CatalogTable};

/// A versioned list of catalog records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogDocument<T> {
    pub version: String,
    pub records: Vec<T>,
}

pub type BiomarkerTable = CatalogDocument<BiomarkerDefinition>;
pub type RangeTable = CatalogDocument<ReferenceRange>;

type Slot<T> = RwLock<Option<Arc<T>>>;

/// Memoizing front for a `CatalogSource`.
///
/// Each table is either fully parsed and cached or absent. Concurrent first
/// loads may both read the source; the first to take the write lock wins and
/// the other copy is dropped.
pub struct CatalogStore {
    source: Arc<dyn CatalogSource>,
    biomarkers: Slot<BiomarkerTable>,
    ranges: Slot<RangeTable>,
    units: Slot<UnitTable>,
}

impl CatalogStore {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            biomarkers: RwLock::new(None),
            ranges: RwLock::new(None),
            units: RwLock::new(None),
        }
    }

    /// Store backed by the tables compiled into the crate.
    pub fn bundled() -> Self {
        Self::new(Arc::new(BundledSource))
    }

    pub fn version(&self) -> &str {
        self.source.version()
    }

    pub fn load_biomarkers(&self) -> Result<Arc<BiomarkerTable>, CatalogError> {
        load_cached(
            &self.biomarkers,
            self.source.as_ref(),
            CatalogTable::Biomarkers,
            validate_biomarkers,
        )
    }

    pub fn load_ranges(&self) -> Result<Arc<RangeTable>, CatalogError> {
        load_cached(
            &self.ranges,
            self.source.as_ref(),
            CatalogTable::ReferenceRanges,
            |_| Ok(()),
        )
    }

    pub fn load_units(&self) -> Result<Arc<UnitTable>, CatalogError> {
        load_cached(
            &self.units,
            self.source.as_ref(),
            CatalogTable::Units,
            validate_units,
        )
    }

    /// Drop every cached table; the next load re-reads the source.
    pub fn clear_cache(&self) -> Result<(), CatalogError> {
        *self.biomarkers.write().map_err(|_| CatalogError::LockFailed)? = None;
        *self.ranges.write().map_err(|_| CatalogError::LockFailed)? = None;
        *self.units.write().map_err(|_| CatalogError::LockFailed)? = None;
        tracing::debug!(version = self.version(), "Catalog cache cleared");
        Ok(())
    }

    /// Clear and eagerly load all tables.
    pub fn reload(&self) -> Result<(), CatalogError> {
        self.clear_cache()?;
        self.preload()
    }

    /// Load all tables so later failures cannot happen mid-analysis.
    pub fn preload(&self) -> Result<(), CatalogError> {
        let biomarkers = self.load_biomarkers()?;
        let ranges = self.load_ranges()?;
        let units = self.load_units()?;
        tracing::info!(
            version = self.version(),
            biomarkers = biomarkers.records.len(),
            ranges = ranges.records.len(),
            conversions = units.conversions.len(),
            "Catalog loaded"
        );
        Ok(())
    }

    /// Look up a definition by canonical name (exact match).
    pub fn definition(&self, name: &str) -> Result<Option<BiomarkerDefinition>, CatalogError> {
        let table = self.load_biomarkers()?;
        Ok(table.records.iter().find(|d| d.name == name).cloned())
    }

    /// All ranges declared for a biomarker, in catalog order.
    pub fn ranges_for(&self, biomarker: &str) -> Result<Vec<ReferenceRange>, CatalogError> {
        let table = self.load_ranges()?;
        Ok(table
            .records
            .iter()
            .filter(|r| r.biomarker == biomarker)
            .cloned()
            .collect())
    }
}

fn load_cached<T: DeserializeOwned>(
    slot: &Slot<T>,
    source: &dyn CatalogSource,
    table: CatalogTable,
    validate: fn(&T) -> Result<(), String>,
) -> Result<Arc<T>, CatalogError> {
    if let Some(cached) = slot.read().map_err(|_| CatalogError::LockFailed)?.as_ref() {
        return Ok(Arc::clone(cached));
    }

    let raw = source.read(table)?;
    let parsed: T = serde_json::from_value(raw)
        .map_err(|e| CatalogError::Parse(table.file_name(), e.to_string()))?;
    validate(&parsed).map_err(|detail| CatalogError::Parse(table.file_name(), detail))?;

    let mut guard = slot.write().map_err(|_| CatalogError::LockFailed)?;
    Ok(Arc::clone(guard.get_or_insert(Arc::new(parsed))))
}

/// Names are unique and every alias resolves to exactly one biomarker.
fn validate_biomarkers(table: &BiomarkerTable) -> Result<(), String> {
    let mut names = HashSet::new();
    let mut owners: HashMap<String, &str> = HashMap::new();
    for def in &table.records {
        if !names.insert(def.name.as_str()) {
            return Err(format!("duplicate biomarker name '{}'", def.name));
        }
        for label in std::iter::once(&def.name).chain(def.aliases.iter()) {
            let owner = *owners
                .entry(label.trim().to_lowercase())
                .or_insert(def.name.as_str());
            if owner != def.name {
                return Err(format!(
                    "label '{label}' claimed by both {owner} and {}",
                    def.name
                ));
            }
        }
    }
    Ok(())
}

fn validate_units(table: &UnitTable) -> Result<(), String> {
    match table
        .conversions
        .iter()
        .find(|(_, factor)| !factor.is_finite() || **factor == 0.0)
    {
        Some((name, factor)) => Err(format!("conversion '{name}' has unusable factor {factor}")),
        None => Ok(()),
    }
}
