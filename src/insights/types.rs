use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::enums::{InsightCategory, InsightErrorCode, InsightSeverity};
use crate::models::AnalysisContext;

// ---------------------------------------------------------------------------
// InsightResult
// ---------------------------------------------------------------------------

/// A biomarker observation an insight is based on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceItem {
    pub biomarker: String,
    pub value: f64,
    pub unit: String,
    pub note: String,
}

/// Payload of a successful insight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsightFindings {
    pub summary: String,
    /// Factors that pushed the severity up, most significant first.
    pub drivers: Vec<String>,
    /// Named derived indices, e.g. `homa_ir`.
    pub indices: BTreeMap<String, f64>,
    pub evidence: Vec<EvidenceItem>,
    pub biomarkers_involved: Vec<String>,
    /// 0–1; grows with the share of corroborating biomarkers present.
    pub confidence: f64,
    pub severity: InsightSeverity,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InsightOutcome {
    Success(InsightFindings),
    Error {
        code: InsightErrorCode,
        detail: String,
    },
}

/// One module's output for one analysis. Immutable once returned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsightResult {
    pub insight_id: String,
    pub version: String,
    /// Stamped by the orchestrator with the manifest that enabled the module.
    pub manifest_id: Option<String>,
    pub category: InsightCategory,
    pub outcome: InsightOutcome,
}

impl InsightResult {
    pub fn success(module: &dyn InsightModule, findings: InsightFindings) -> Self {
        Self {
            insight_id: module.id().to_string(),
            version: module.version().to_string(),
            manifest_id: None,
            category: module.category(),
            outcome: InsightOutcome::Success(findings),
        }
    }

    pub fn error(
        insight_id: impl Into<String>,
        version: impl Into<String>,
        category: InsightCategory,
        code: InsightErrorCode,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            insight_id: insight_id.into(),
            version: version.into(),
            manifest_id: None,
            category,
            outcome: InsightOutcome::Error {
                code,
                detail: detail.into(),
            },
        }
    }

    pub fn with_manifest(mut self, manifest_id: &str) -> Self {
        self.manifest_id = Some(manifest_id.to_string());
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, InsightOutcome::Success(_))
    }

    pub fn findings(&self) -> Option<&InsightFindings> {
        match &self.outcome {
            InsightOutcome::Success(f) => Some(f),
            InsightOutcome::Error { .. } => None,
        }
    }

    pub fn error_code(&self) -> Option<InsightErrorCode> {
        match &self.outcome {
            InsightOutcome::Success(_) => None,
            InsightOutcome::Error { code, .. } => Some(*code),
        }
    }
}

// ---------------------------------------------------------------------------
// InsightModule trait
// ---------------------------------------------------------------------------

/// A deterministic scoring unit.
///
/// `analyze` is pure and must not panic: missing inputs are reported as an
/// error result, never raised. The orchestrator still isolates each call in
/// case an implementation breaks that contract.
pub trait InsightModule: Send + Sync {
    fn id(&self) -> &str;

    /// Semantic version, `MAJOR.MINOR.PATCH`.
    fn version(&self) -> &str;

    fn category(&self) -> InsightCategory;

    fn required_biomarkers(&self) -> &[&str];

    /// Corroborating biomarkers that raise confidence when present.
    fn optional_biomarkers(&self) -> &[&str] {
        &[]
    }

    fn analyze(&self, context: &AnalysisContext) -> Vec<InsightResult>;

    fn can_analyze(&self, context: &AnalysisContext) -> bool {
        self.required_biomarkers().iter().all(|b| context.has(b))
    }
}
