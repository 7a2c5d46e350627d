use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::enums::Gender;

/// Reference interval for one biomarker in one population.
/// An absent bound is unbounded; present bounds are inclusive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceRange {
    pub biomarker: String,
    pub population: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_max: Option<u32>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub unit: String,
}

impl ReferenceRange {
    /// Human-readable interval, e.g. "70-100 mg/dL" or "<= 200 mg/dL".
    pub fn describe(&self) -> String {
        match (self.min, self.max) {
            (Some(lo), Some(hi)) => format!("{lo}-{hi} {}", self.unit),
            (None, Some(hi)) => format!("<= {hi} {}", self.unit),
            (Some(lo), None) => format!(">= {lo} {}", self.unit),
            (None, None) => format!("unbounded ({})", self.unit),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitDefinition {
    pub symbol: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Declared units plus named conversion factors.
///
/// Factor names follow `"{from}_to_{to}"`, with biomarker-specific
/// overrides as `"{biomarker}_{from}_to_{to}"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitTable {
    pub version: String,
    pub units: Vec<UnitDefinition>,
    pub conversions: BTreeMap<String, f64>,
}
