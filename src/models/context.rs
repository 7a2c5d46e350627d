use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::biomarker::{BiomarkerPanel, PANEL_SCHEMA_VERSION};
use super::enums::{Gender, InsightCategory};

/// Population tag used when the caller does not supply one.
pub const DEFAULT_POPULATION: &str = "general_adult";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Demographics {
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub population: Option<String>,
}

impl Demographics {
    pub fn population(&self) -> &str {
        self.population.as_deref().unwrap_or(DEFAULT_POPULATION)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LifestyleFactors {
    #[serde(default)]
    pub smoker: Option<bool>,
    #[serde(default)]
    pub activity_level: Option<String>,
    #[serde(default)]
    pub alcohol_units_per_week: Option<f64>,
}

/// Everything known about the subject apart from the lab panel.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SubjectProfile {
    #[serde(default)]
    pub demographics: Demographics,
    #[serde(default)]
    pub lifestyle: Option<LifestyleFactors>,
    #[serde(default)]
    pub medical_history: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalysisParameters {
    /// Restrict insight modules to these categories; `None` runs all.
    #[serde(default)]
    pub requested_categories: Option<Vec<InsightCategory>>,
    #[serde(default)]
    pub max_insights_per_category: Option<usize>,
    /// Free-form numeric knobs passed through to insight modules.
    #[serde(default)]
    pub extra: BTreeMap<String, f64>,
}

/// Read-only input shared by every analysis stage.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisContext {
    pub analysis_id: Uuid,
    pub profile: SubjectProfile,
    pub panel: BiomarkerPanel,
    pub parameters: AnalysisParameters,
    pub created_at: DateTime<Utc>,
    pub schema_version: String,
}

impl AnalysisContext {
    pub fn new(
        profile: SubjectProfile,
        panel: BiomarkerPanel,
        parameters: AnalysisParameters,
    ) -> Self {
        Self {
            analysis_id: Uuid::new_v4(),
            profile,
            panel,
            parameters,
            created_at: Utc::now(),
            schema_version: PANEL_SCHEMA_VERSION.to_string(),
        }
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.panel.value(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.panel.contains(name)
    }

    /// Names from `required` absent from the panel, in declaration order.
    pub fn missing(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|name| !self.has(name))
            .map(|name| name.to_string())
            .collect()
    }

    pub fn age(&self) -> Option<u32> {
        self.profile.demographics.age
    }

    pub fn gender(&self) -> Option<Gender> {
        self.profile.demographics.gender
    }

    pub fn is_smoker(&self) -> bool {
        self.profile
            .lifestyle
            .as_ref()
            .and_then(|l| l.smoker)
            .unwrap_or(false)
    }
}
