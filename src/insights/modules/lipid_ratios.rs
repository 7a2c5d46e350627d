//! Atherogenic lipid ratios against HDL.

use std::collections::BTreeMap;

use crate::catalog::units::round_half_up;
use crate::insights::helpers::{
    corroboration_confidence, escalate, evidence, involved, positive_denominator, require_values, tier_for,
};
use crate::insights::types::{InsightFindings, InsightModule, InsightResult};
use crate::models::enums::{InsightCategory, InsightSeverity};
use crate::models::AnalysisContext;

pub const LIPID_RATIOS_ID: &str = "lipid_ratios";

const REQUIRED: &[&str] = &["total_cholesterol", "hdl_cholesterol"];
const OPTIONAL: &[&str] = &["ldl_cholesterol", "triglycerides", "apolipoprotein_b"];

/// Castelli index I (TC/HDL).
const TC_HDL_TIERS: [(f64, InsightSeverity); 3] = [
    (3.5, InsightSeverity::Mild),
    (5.0, InsightSeverity::Moderate),
    (6.0, InsightSeverity::Severe),
];
const LDL_HDL_ELEVATED: f64 = 3.5;
const TG_HDL_ELEVATED: f64 = 3.0;
const APOB_ELEVATED: f64 = 130.0;

#[derive(Debug, Default)]
pub struct LipidRatiosModule;

impl LipidRatiosModule {
    pub fn new() -> Self {
        Self
    }
}

impl InsightModule for LipidRatiosModule {
    fn id(&self) -> &str {
        LIPID_RATIOS_ID
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn category(&self) -> InsightCategory {
        InsightCategory::Cardiovascular
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
        let total = values[0];
        let hdl = match positive_denominator(self, "hdl_cholesterol", values[1]) {
            Ok(v) => v,
            Err(result) => return vec![result],
        };

        let tc_hdl = round_half_up(total / hdl, 3);
        let mut indices = BTreeMap::from([("tc_hdl_ratio".to_string(), tc_hdl)]);
        let mut severity = tier_for(tc_hdl, &TC_HDL_TIERS);
        let mut drivers = Vec::new();
        if severity > InsightSeverity::Normal {
            drivers.push(format!("Total cholesterol/HDL ratio {tc_hdl} is above 3.5"));
        }

        let mut escalations = 0;
        if let Some(ldl) = context.value("ldl_cholesterol") {
            let ldl_hdl = round_half_up(ldl / hdl, 3);
            indices.insert("ldl_hdl_ratio".to_string(), ldl_hdl);
            if ldl_hdl > LDL_HDL_ELEVATED {
                drivers.push(format!("LDL/HDL ratio {ldl_hdl} is above {LDL_HDL_ELEVATED}"));
                escalations += 1;
            }
        }
        if let Some(tg) = context.value("triglycerides") {
            let tg_hdl = round_half_up(tg / hdl, 3);
            indices.insert("tg_hdl_ratio".to_string(), tg_hdl);
            if tg_hdl >= TG_HDL_ELEVATED {
                drivers.push(format!("Triglyceride/HDL ratio {tg_hdl} indicates small dense LDL"));
                escalations += 1;
            }
        }
        if let Some(apob) = context.value("apolipoprotein_b").filter(|v| *v >= APOB_ELEVATED) {
            drivers.push(format!("Apolipoprotein B {apob} mg/dL is elevated"));
            escalations += 1;
        }
        // Corroborating ratios only lift a result that is already abnormal, or
        // start one at mild when two of them agree.
        if escalations > 0 && severity > InsightSeverity::Normal {
            severity = escalate(severity);
        } else if escalations >= 2 {
            severity = InsightSeverity::Mild;
        }

        let mut recommendations = Vec::new();
        if severity == InsightSeverity::Normal {
            recommendations.push(format!("Cholesterol/HDL ratio {tc_hdl} is favourable; maintain current habits"));
        } else {
            recommendations.push(format!(
                "Cholesterol/HDL ratio {tc_hdl} warrants a cardiovascular risk review"
            ));
            recommendations.push("Increase dietary fibre and replace saturated with unsaturated fat".to_string());
            if severity >= InsightSeverity::Moderate {
                recommendations.push("Discuss lipid-lowering options with a clinician".to_string());
            }
        }

        let items = ["total_cholesterol", "hdl_cholesterol", "ldl_cholesterol", "triglycerides"]
            .iter()
            .filter_map(|b| evidence(context, b, "lipid panel"))
            .collect();

        vec![InsightResult::success(
            self,
            InsightFindings {
                summary: format!("TC/HDL {tc_hdl} ({})", severity.as_str()),
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
