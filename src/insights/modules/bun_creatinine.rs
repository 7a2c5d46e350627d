//! BUN/creatinine ratio with eGFR context.

use std::collections::BTreeMap;

use crate::catalog::units::round_half_up;
use crate::insights::helpers::{corroboration_confidence, evidence, involved, positive_denominator, require_values};
use crate::insights::types::{InsightFindings, InsightModule, InsightResult};
use crate::models::enums::{InsightCategory, InsightSeverity};
use crate::models::AnalysisContext;

pub const BUN_CREATININE_ID: &str = "bun_creatinine_ratio";

const REQUIRED: &[&str] = &["bun", "creatinine"];
const OPTIONAL: &[&str] = &["egfr"];

const RATIO_LOW: f64 = 10.0;
const RATIO_HIGH: f64 = 20.0;
const RATIO_VERY_HIGH: f64 = 30.0;
const EGFR_REDUCED: f64 = 60.0;
const EGFR_SEVERELY_REDUCED: f64 = 30.0;

#[derive(Debug, Default)]
pub struct BunCreatinineModule;

impl BunCreatinineModule {
    pub fn new() -> Self {
        Self
    }
}

impl InsightModule for BunCreatinineModule {
    fn id(&self) -> &str {
        BUN_CREATININE_ID
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn category(&self) -> InsightCategory {
        InsightCategory::Kidney
    }

    fn required_biomarkers(&self) -> &[&str] {
        REQUIRED
    }

    fn optional_biomarkers(&self) -> &[&str] {
        OPTIONAL
    }

    fn analyze(&self, context: &AnalysisContext) -> Vec<InsightResult> {
        let values = match require_values(self, context) {
            Ok(v) => v,
            Err(result) => return vec![result],
        };
        let creatinine = match positive_denominator(self, "creatinine", values[1]) {
            Ok(v) => v,
            Err(result) => return vec![result],
        };
        let ratio = round_half_up(values[0] / creatinine, 3);
        let indices = BTreeMap::from([("bun_creatinine_ratio".to_string(), ratio)]);

        let mut drivers = Vec::new();
        let mut severity = if ratio > RATIO_VERY_HIGH {
            drivers.push(format!("BUN/creatinine ratio {ratio} is above {RATIO_VERY_HIGH}"));
            InsightSeverity::Moderate
        } else if ratio > RATIO_HIGH {
            drivers.push(format!("BUN/creatinine ratio {ratio} is above {RATIO_HIGH}, consistent with a prerenal pattern"));
            InsightSeverity::Mild
        } else if ratio < RATIO_LOW {
            drivers.push(format!("BUN/creatinine ratio {ratio} is below {RATIO_LOW}"));
            InsightSeverity::Mild
        } else {
            InsightSeverity::Normal
        };

        if let Some(egfr) = context.value("egfr") {
            if egfr < EGFR_SEVERELY_REDUCED {
                drivers.push(format!("eGFR {egfr} mL/min/1.73m2 is severely reduced"));
                severity = severity.max(InsightSeverity::Severe);
            } else if egfr < EGFR_REDUCED {
                drivers.push(format!("eGFR {egfr} mL/min/1.73m2 is below {EGFR_REDUCED}"));
                severity = severity.max(InsightSeverity::Moderate);
            }
        }

        let mut recommendations = Vec::new();
        match severity {
            InsightSeverity::Normal => {
                recommendations.push(format!("BUN/creatinine ratio {ratio} is within 10-20"));
            }
            _ if ratio > RATIO_HIGH => {
                recommendations.push(format!(
                    "BUN/creatinine ratio {ratio} can reflect dehydration or high protein intake; review hydration"
                ));
            }
            _ => {}
        }
        if severity >= InsightSeverity::Moderate {
            recommendations.push("Repeat renal function tests and review with a clinician".to_string());
        } else if severity == InsightSeverity::Mild && ratio < RATIO_LOW {
            recommendations.push(format!(
                "Low BUN/creatinine ratio {ratio} can reflect low protein intake or liver function; recheck"
            ));
        }

        let items = ["bun", "creatinine", "egfr"]
            .iter()
            .filter_map(|b| evidence(context, b, "renal function"))
            .collect();

        vec![InsightResult::success(
            self,
            InsightFindings {
                summary: format!("BUN/creatinine {ratio} ({})", severity.as_str()),
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
