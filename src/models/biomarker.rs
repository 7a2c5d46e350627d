use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::ValueKind;

/// Schema version stamped on every panel and analysis context.
pub const PANEL_SCHEMA_VERSION: &str = "1.0";

/// One entry of the biomarker catalog. Loaded once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BiomarkerDefinition {
    pub name: String,
    pub display_name: String,
    /// Alternate input labels, matched case-insensitively.
    #[serde(default)]
    pub aliases: Vec<String>,
    pub unit: String,
    pub category: String,
    #[serde(default = "default_value_kind")]
    pub value_kind: ValueKind,
    #[serde(default)]
    pub description: String,
}

fn default_value_kind() -> ValueKind {
    ValueKind::Numeric
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BiomarkerValue {
    /// Canonical biomarker name.
    pub name: String,
    pub value: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measured_at: Option<DateTime<Utc>>,
}

impl BiomarkerValue {
    pub fn new(name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value,
            unit: unit.into(),
            measured_at: None,
        }
    }
}

/// A subject's biomarker values for one analysis, keyed by canonical name.
///
/// Keys are only guaranteed canonical once the panel has passed
/// `BiomarkerNormalizer::validate_canonical_only`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BiomarkerPanel {
    pub values: BTreeMap<String, BiomarkerValue>,
    pub provenance: String,
    pub schema_version: String,
}

impl BiomarkerPanel {
    pub fn new(provenance: impl Into<String>) -> Self {
        Self {
            values: BTreeMap::new(),
            provenance: provenance.into(),
            schema_version: PANEL_SCHEMA_VERSION.to_string(),
        }
    }

    /// Insert a value under its own name, replacing any previous entry.
    pub fn insert(&mut self, value: BiomarkerValue) {
        self.values.insert(value.name.clone(), value);
    }

    pub fn with(mut self, name: &str, value: f64, unit: &str) -> Self {
        self.insert(BiomarkerValue::new(name, value, unit));
        self
    }

    pub fn get(&self, name: &str) -> Option<&BiomarkerValue> {
        self.values.get(name)
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).map(|v| v.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_by_name() {
        let mut panel = BiomarkerPanel::new("test");
        panel.insert(BiomarkerValue::new("glucose", 90.0, "mg/dL"));
        panel.insert(BiomarkerValue::new("glucose", 95.0, "mg/dL"));
        assert_eq!(panel.len(), 1);
        assert_eq!(panel.value("glucose"), Some(95.0));
        assert_eq!(panel.schema_version, PANEL_SCHEMA_VERSION);
    }

    #[test]
    fn definition_defaults_apply() {
        let def: BiomarkerDefinition = serde_json::from_str(
            r#"{"name":"glucose","display_name":"Glucose","unit":"mg/dL","category":"metabolic"}"#,
        )
        .unwrap();
        assert!(def.aliases.is_empty());
        assert_eq!(def.value_kind, ValueKind::Numeric);
    }
}
