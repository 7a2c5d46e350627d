//! HOMA-IR from fasting glucose and insulin.

use std::collections::BTreeMap;

use crate::catalog::units::round_half_up;
use crate::insights::helpers::{corroboration_confidence, evidence, involved, require_values, tier_for};
use crate::insights::types::{InsightFindings, InsightModule, InsightResult};
use crate::models::enums::{InsightCategory, InsightSeverity};
use crate::models::AnalysisContext;

pub const INSULIN_RESISTANCE_ID: &str = "insulin_resistance";

const REQUIRED: &[&str] = &["glucose", "insulin"];
const OPTIONAL: &[&str] = &["hba1c", "triglycerides", "hdl_cholesterol"];

/// glucose (mg/dL) × insulin (µIU/mL) / 405
const HOMA_DIVISOR: f64 = 405.0;

const HOMA_TIERS: [(f64, InsightSeverity); 3] = [
    (1.0, InsightSeverity::Mild),
    (1.9, InsightSeverity::Moderate),
    (2.9, InsightSeverity::Severe),
];

const FASTING_GLUCOSE_ELEVATED: f64 = 100.0;
const FASTING_INSULIN_ELEVATED: f64 = 10.0;
const HBA1C_PREDIABETIC: f64 = 5.7;
const TG_HDL_ELEVATED: f64 = 3.0;

pub fn homa_ir(glucose_mg_dl: f64, insulin_uiu_ml: f64) -> f64 {
    glucose_mg_dl * insulin_uiu_ml / HOMA_DIVISOR
}

#[derive(Debug, Default)]
pub struct InsulinResistanceModule;

impl InsulinResistanceModule {
    pub fn new() -> Self {
        Self
    }
}

impl InsightModule for InsulinResistanceModule {
    fn id(&self) -> &str {
        INSULIN_RESISTANCE_ID
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn category(&self) -> InsightCategory {
        InsightCategory::Metabolic
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
        let (glucose, insulin) = (values[0], values[1]);
        let homa = round_half_up(homa_ir(glucose, insulin), 3);

        let mut indices = BTreeMap::new();
        indices.insert("homa_ir".to_string(), homa);

        let mut drivers = Vec::new();
        if glucose >= FASTING_GLUCOSE_ELEVATED {
            drivers.push(format!("Fasting glucose {glucose} mg/dL is at or above {FASTING_GLUCOSE_ELEVATED}"));
        }
        if insulin > FASTING_INSULIN_ELEVATED {
            drivers.push(format!("Fasting insulin {insulin} uIU/mL is above {FASTING_INSULIN_ELEVATED}"));
        }
        if let Some(a1c) = context.value("hba1c").filter(|v| *v >= HBA1C_PREDIABETIC) {
            drivers.push(format!("HbA1c {a1c}% is in the prediabetic range"));
        }
        if let (Some(tg), Some(hdl)) = (context.value("triglycerides"), context.value("hdl_cholesterol")) {
            if hdl > 0.0 {
                let tg_hdl = round_half_up(tg / hdl, 3);
                indices.insert("tg_hdl_ratio".to_string(), tg_hdl);
                if tg_hdl >= TG_HDL_ELEVATED {
                    drivers.push(format!("Triglyceride/HDL ratio {tg_hdl} suggests insulin resistance"));
                }
            }
        }

        let severity = tier_for(homa, &HOMA_TIERS);
        let recommendations = match severity {
            InsightSeverity::Normal => vec![format!(
                "HOMA-IR {homa} is within the insulin-sensitive range; recheck with routine labs"
            )],
            InsightSeverity::Mild => vec![
                format!("HOMA-IR {homa} shows early insulin resistance"),
                "Prioritise regular aerobic and resistance exercise".to_string(),
            ],
            InsightSeverity::Moderate | InsightSeverity::Severe => vec![
                format!("HOMA-IR {homa} indicates significant insulin resistance"),
                "Discuss metabolic follow-up (OGTT, repeat fasting insulin) with a clinician".to_string(),
                "Reduce refined carbohydrate intake".to_string(),
            ],
        };

        let items = ["glucose", "insulin", "hba1c"]
            .iter()
            .filter_map(|b| evidence(context, b, "fasting glycaemic marker"))
            .collect();

        vec![InsightResult::success(
            self,
            InsightFindings {
                summary: format!("HOMA-IR {homa} ({})", severity.as_str()),
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
