//! Neutrophil/lymphocyte ratio as a systemic inflammation marker.

use std::collections::BTreeMap;

use crate::catalog::units::round_half_up;
use crate::insights::helpers::{
    corroboration_confidence, escalate, evidence, involved, positive_denominator, require_values, tier_for,
};
use crate::insights::types::{InsightFindings, InsightModule, InsightResult};
use crate::models::enums::{InsightCategory, InsightSeverity};
use crate::models::AnalysisContext;

pub const NEUTROPHIL_LYMPHOCYTE_ID: &str = "neutrophil_lymphocyte_ratio";

const REQUIRED: &[&str] = &["neutrophils", "lymphocytes"];
const OPTIONAL: &[&str] = &["crp", "white_blood_cells"];

const NLR_TIERS: [(f64, InsightSeverity); 3] = [
    (3.0, InsightSeverity::Mild),
    (6.0, InsightSeverity::Moderate),
    (9.0, InsightSeverity::Severe),
];
const NLR_LOW: f64 = 0.7;
const CRP_ELEVATED: f64 = 3.0;
const WBC_HIGH: f64 = 11.0;

#[derive(Debug, Default)]
pub struct NeutrophilLymphocyteModule;

impl NeutrophilLymphocyteModule {
    pub fn new() -> Self {
        Self
    }
}

impl InsightModule for NeutrophilLymphocyteModule {
    fn id(&self) -> &str {
        NEUTROPHIL_LYMPHOCYTE_ID
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn category(&self) -> InsightCategory {
        InsightCategory::Inflammatory
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
        let lymphocytes = match positive_denominator(self, "lymphocytes", values[1]) {
            Ok(v) => v,
            Err(result) => return vec![result],
        };
        let nlr = round_half_up(values[0] / lymphocytes, 3);
        let indices = BTreeMap::from([("nlr".to_string(), nlr)]);

        let mut severity = tier_for(nlr, &NLR_TIERS);
        let mut drivers = Vec::new();
        if severity > InsightSeverity::Normal {
            drivers.push(format!("Neutrophil/lymphocyte ratio {nlr} is above 3.0"));
        } else if nlr < NLR_LOW {
            drivers.push(format!("Neutrophil/lymphocyte ratio {nlr} is below {NLR_LOW}"));
            severity = InsightSeverity::Mild;
        }

        if let Some(crp) = context.value("crp").filter(|v| *v > CRP_ELEVATED) {
            drivers.push(format!("CRP {crp} mg/L corroborates systemic inflammation"));
            if severity > InsightSeverity::Normal {
                severity = escalate(severity);
            }
        }
        if let Some(wbc) = context.value("white_blood_cells").filter(|v| *v > WBC_HIGH) {
            drivers.push(format!("White blood cell count {wbc} x10^3/uL is elevated"));
        }

        let recommendations = match severity {
            InsightSeverity::Normal => vec![format!("NLR {nlr} is within the expected range")],
            InsightSeverity::Mild => vec![
                format!("NLR {nlr} is borderline; repeat the differential count when well"),
            ],
            InsightSeverity::Moderate | InsightSeverity::Severe => vec![
                format!("NLR {nlr} suggests active inflammation or physiological stress"),
                "Review for infection or inflammatory conditions with a clinician".to_string(),
            ],
        };

        let items = ["neutrophils", "lymphocytes", "crp"]
            .iter()
            .filter_map(|b| evidence(context, b, "inflammation marker"))
            .collect();

        vec![InsightResult::success(
            self,
            InsightFindings {
                summary: format!("NLR {nlr} ({})", severity.as_str()),
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
