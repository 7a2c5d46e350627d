use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::{CatalogError, UnitError};
use crate::completeness::{CompletenessResult, GapAnalysis};
use crate::insights::{InsightResult, ManifestError, RegistryError};
use crate::models::enums::{AnalysisStatus, InsightCategory, RangeStatus};
use crate::models::{BiomarkerPanel, ReferenceRange, SubjectProfile};
use crate::narrative::NarrativeInsight;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Panel contains non-canonical biomarker keys: {}", .0.join(", "))]
    NonCanonicalKeys(Vec<String>),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Unit(#[from] UnitError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// Panel as handed to the orchestrator.
#[derive(Debug, Clone)]
pub enum PanelInput {
    /// Label → value, labels possibly aliases. Values are in catalog units.
    Raw(BTreeMap<String, f64>),
    /// Already keyed by canonical name, units as measured.
    Canonical(BiomarkerPanel),
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisOptions {
    /// Skip alias normalization of raw input; keys must already be canonical.
    #[serde(default)]
    pub assume_canonical: bool,
    #[serde(default)]
    pub requested_categories: Option<Vec<InsightCategory>>,
    #[serde(default)]
    pub max_insights_per_category: Option<usize>,
    #[serde(default = "default_true")]
    pub include_completeness: bool,
    #[serde(default = "default_true")]
    pub include_narrative: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            assume_canonical: false,
            requested_categories: None,
            max_insights_per_category: None,
            include_completeness: true,
            include_narrative: true,
        }
    }
}

/// Request document accepted by the CLI: raw values plus context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisRequest {
    pub values: BTreeMap<String, f64>,
    #[serde(default)]
    pub profile: SubjectProfile,
    #[serde(default)]
    pub options: AnalysisOptions,
}

impl AnalysisRequest {
    pub fn into_parts(self) -> (PanelInput, SubjectProfile, AnalysisOptions) {
        (PanelInput::Raw(self.values), self.profile, self.options)
    }
}

/// Classification of one panel value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BiomarkerReading {
    pub biomarker: String,
    pub display_name: String,
    pub value: f64,
    pub unit: String,
    pub status: RangeStatus,
    pub message: String,
    pub converted_value: Option<f64>,
    pub reference_range: Option<ReferenceRange>,
}

/// An insight tagged with where it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum TaggedInsight {
    Modular(InsightResult),
    Llm(NarrativeInsight),
}

impl TaggedInsight {
    pub fn source(&self) -> &'static str {
        match self {
            Self::Modular(_) => "modular",
            Self::Llm(_) => "llm",
        }
    }

    pub fn as_modular(&self) -> Option<&InsightResult> {
        match self {
            Self::Modular(r) => Some(r),
            Self::Llm(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisMeta {
    pub modular_insights_count: usize,
    pub llm_insights_count: usize,
    pub processing_time_ms: u64,
    pub unmapped_keys: Vec<String>,
    pub manifest_id: String,
    pub catalog_version: String,
    pub schema_version: String,
    pub narrative_confidence: Option<f64>,
    pub notes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub analysis_id: Uuid,
    pub biomarkers: Vec<BiomarkerReading>,
    /// Reserved; always empty.
    pub clusters: Vec<serde_json::Value>,
    pub insights: Vec<TaggedInsight>,
    pub overall_score: Option<f64>,
    pub completeness: Option<CompletenessResult>,
    pub gaps: Option<GapAnalysis>,
    pub status: AnalysisStatus,
    pub meta: AnalysisMeta,
}

impl AnalysisResult {
    pub fn modular(&self) -> impl Iterator<Item = &InsightResult> {
        self.insights.iter().filter_map(TaggedInsight::as_modular)
    }

    pub fn insight(&self, insight_id: &str) -> Option<&InsightResult> {
        self.modular().find(|r| r.insight_id == insight_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::{InsightErrorCode, InsightCategory};

    #[test]
    fn options_default_from_empty_json() {
        let options: AnalysisOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, AnalysisOptions::default());
        assert!(options.include_narrative);
    }

    #[test]
    fn request_parses_with_defaults() {
        let request: AnalysisRequest = serde_json::from_str(
            r#"{"values":{"glu":95.0},"profile":{"demographics":{"age":40,"gender":"female"}}}"#,
        )
        .unwrap();
        let (input, profile, options) = request.into_parts();
        assert!(matches!(input, PanelInput::Raw(ref v) if v["glu"] == 95.0));
        assert_eq!(profile.demographics.age, Some(40));
        assert!(options.include_completeness);
    }

    #[test]
    fn tagged_insights_carry_source() {
        let modular = TaggedInsight::Modular(InsightResult::error(
            "lipid_ratios",
            "1.0.0",
            InsightCategory::Cardiovascular,
            InsightErrorCode::MissingBiomarkers,
            "Missing required biomarkers: hdl_cholesterol",
        ));
        let json = serde_json::to_value(&modular).unwrap();
        assert_eq!(json["source"], "modular");
        assert_eq!(json["insight_id"], "lipid_ratios");

        let llm = TaggedInsight::Llm(NarrativeInsight {
            title: "t".into(),
            summary: "s".into(),
            severity: None,
            biomarkers: Vec::new(),
            recommendations: Vec::new(),
        });
        assert_eq!(serde_json::to_value(&llm).unwrap()["source"], "llm");
        assert_eq!(llm.source(), "llm");
    }

    #[test]
    fn non_canonical_error_lists_keys() {
        let err = AnalysisError::NonCanonicalKeys(vec!["GLU".into(), "ldl".into()]);
        assert_eq!(err.to_string(), "Panel contains non-canonical biomarker keys: GLU, ldl");
    }
}
