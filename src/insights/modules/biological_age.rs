//! Biological-age adjustment from threshold rules.
//!
//! Each rule adds or removes whole years relative to chronological age.
//! Rules read biomarkers in catalog units.

use std::collections::BTreeMap;

use crate::insights::helpers::{corroboration_confidence, evidence, involved, require_values};
use crate::insights::types::{InsightFindings, InsightModule, InsightResult};
use crate::models::enums::{InsightCategory, InsightErrorCode, InsightSeverity};
use crate::models::AnalysisContext;

pub const BIOLOGICAL_AGE_ID: &str = "biological_age";

const REQUIRED: &[&str] = &["glucose", "crp", "hdl_cholesterol"];
const OPTIONAL: &[&str] = &["hba1c", "triglycerides", "albumin", "white_blood_cells"];

const SMOKER_YEARS: f64 = 2.0;

/// A single rule: `years` when `applies(value)`.
struct AgeRule {
    biomarker: &'static str,
    years: f64,
    label: &'static str,
    applies: fn(f64) -> bool,
}

/// Evaluated top to bottom; only the first matching rule per biomarker counts.
const RULES: &[AgeRule] = &[
    AgeRule { biomarker: "glucose", years: 4.0, label: "diabetic-range fasting glucose", applies: |v| v >= 126.0 },
    AgeRule { biomarker: "glucose", years: 2.0, label: "impaired fasting glucose", applies: |v| v >= 100.0 },
    AgeRule { biomarker: "crp", years: 3.0, label: "high CRP", applies: |v| v > 3.0 },
    AgeRule { biomarker: "crp", years: 1.0, label: "moderate CRP", applies: |v| v >= 1.0 },
    AgeRule { biomarker: "crp", years: -1.0, label: "low CRP", applies: |v| v < 0.5 },
    AgeRule { biomarker: "hdl_cholesterol", years: 2.0, label: "low HDL", applies: |v| v < 40.0 },
    AgeRule { biomarker: "hdl_cholesterol", years: -1.0, label: "high HDL", applies: |v| v >= 60.0 },
    AgeRule { biomarker: "hba1c", years: 4.0, label: "diabetic-range HbA1c", applies: |v| v >= 6.5 },
    AgeRule { biomarker: "hba1c", years: 2.0, label: "prediabetic HbA1c", applies: |v| v >= 5.7 },
    AgeRule { biomarker: "triglycerides", years: 1.0, label: "elevated triglycerides", applies: |v| v >= 150.0 },
    AgeRule { biomarker: "albumin", years: 2.0, label: "low albumin", applies: |v| v < 3.5 },
    AgeRule { biomarker: "albumin", years: -1.0, label: "high-normal albumin", applies: |v| v >= 4.5 },
    AgeRule { biomarker: "white_blood_cells", years: 1.0, label: "elevated white cell count", applies: |v| v > 10.0 },
];

/// Upper bounds (inclusive) on the year delta per severity.
fn severity_for(delta: f64) -> InsightSeverity {
    if delta <= 0.0 {
        InsightSeverity::Normal
    } else if delta <= 3.0 {
        InsightSeverity::Mild
    } else if delta <= 7.0 {
        InsightSeverity::Moderate
    } else {
        InsightSeverity::Severe
    }
}

#[derive(Debug, Default)]
pub struct BiologicalAgeModule;

impl BiologicalAgeModule {
    pub fn new() -> Self {
        Self
    }
}

impl InsightModule for BiologicalAgeModule {
    fn id(&self) -> &str {
        BIOLOGICAL_AGE_ID
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn category(&self) -> InsightCategory {
        InsightCategory::Longevity
    }

    fn required_biomarkers(&self) -> &[&str] {
        REQUIRED
    }

    fn optional_biomarkers(&self) -> &[&str] {
        OPTIONAL
    }

    fn analyze(&self, context: &AnalysisContext) -> Vec<InsightResult> {
        if let Err(result) = require_values(self, context) {
            return vec![result];
        }
        let Some(age) = context.age() else {
            return vec![InsightResult::error(
                self.id(),
                self.version(),
                self.category(),
                InsightErrorCode::MissingContext,
                "Chronological age is required to estimate biological age",
            )];
        };

        let mut delta = 0.0;
        let mut drivers = Vec::new();
        let mut matched: Vec<&str> = Vec::new();
        for rule in RULES {
            if matched.contains(&rule.biomarker) {
                continue;
            }
            let Some(value) = context.value(rule.biomarker) else {
                continue;
            };
            if (rule.applies)(value) {
                matched.push(rule.biomarker);
                delta += rule.years;
                drivers.push(format!("{} ({} {value}): {:+} years", rule.label, rule.biomarker, rule.years));
            }
        }
        if context.is_smoker() {
            delta += SMOKER_YEARS;
            drivers.push(format!("current smoker: {SMOKER_YEARS:+} years"));
        }
        // Ageing drivers first.
        drivers.sort_by_key(|d| d.contains(": -"));

        let chronological = f64::from(age);
        let biological = (chronological + delta).max(0.0);
        let indices = BTreeMap::from([
            ("chronological_age".to_string(), chronological),
            ("biological_age".to_string(), biological),
            ("age_delta".to_string(), delta),
        ]);

        let severity = severity_for(delta);
        let mut recommendations = Vec::new();
        if delta <= 0.0 {
            recommendations.push(format!(
                "Estimated biological age {biological} is at or below chronological age {age}"
            ));
        } else {
            recommendations.push(format!(
                "Estimated biological age {biological} exceeds chronological age {age} by {delta} years"
            ));
            if context.is_smoker() {
                recommendations.push("Smoking cessation has the largest single effect on this estimate".to_string());
            }
            if matched.iter().any(|b| ["glucose", "hba1c"].contains(b)) {
                recommendations.push("Improve glycaemic control through diet and activity".to_string());
            }
            if matched.contains(&"crp") && delta > 0.0 {
                recommendations.push("Address sources of chronic inflammation".to_string());
            }
        }

        let items = REQUIRED
            .iter()
            .chain(OPTIONAL.iter())
            .filter_map(|b| evidence(context, b, "age-adjustment input"))
            .collect();

        vec![InsightResult::success(
            self,
            InsightFindings {
                summary: format!("Biological age {biological} vs chronological {age}"),
                drivers,
                indices,
                evidence: items,
                biomarkers_involved: involved(self, context),
                confidence: corroboration_confidence(context, OPTIONAL),
                severity,
                recommendations,
            },
        )]
    }
}
