//! AST/ALT (De Ritis) ratio.

use std::collections::BTreeMap;

use crate::catalog::units::round_half_up;
use crate::insights::helpers::{
    corroboration_confidence, escalate, evidence, involved, positive_denominator, require_values,
};
use crate::insights::types::{InsightFindings, InsightModule, InsightResult};
use crate::models::enums::{InsightCategory, InsightSeverity};
use crate::models::AnalysisContext;

pub const DE_RITIS_ID: &str = "de_ritis_ratio";

const REQUIRED: &[&str] = &["ast", "alt"];
const OPTIONAL: &[&str] = &["ggt", "albumin"];

const AST_UPPER: f64 = 40.0;
const ALT_UPPER: f64 = 56.0;
const RATIO_HIGH: f64 = 2.0;
const GGT_ELEVATED: f64 = 60.0;
const ALBUMIN_LOW: f64 = 3.5;

#[derive(Debug, Default)]
pub struct DeRitisModule;

impl DeRitisModule {
    pub fn new() -> Self {
        Self
    }
}

impl InsightModule for DeRitisModule {
    fn id(&self) -> &str {
        DE_RITIS_ID
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn category(&self) -> InsightCategory {
        InsightCategory::Liver
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
        let ast = values[0];
        let alt = match positive_denominator(self, "alt", values[1]) {
            Ok(v) => v,
            Err(result) => return vec![result],
        };
        let ratio = round_half_up(ast / alt, 3);
        let indices = BTreeMap::from([("ast_alt_ratio".to_string(), ratio)]);

        let enzymes_elevated = ast > AST_UPPER || alt > ALT_UPPER;
        let mut drivers = Vec::new();
        if ast > AST_UPPER {
            drivers.push(format!("AST {ast} U/L is above {AST_UPPER}"));
        }
        if alt > ALT_UPPER {
            drivers.push(format!("ALT {alt} U/L is above {ALT_UPPER}"));
        }

        // The ratio only carries meaning once enzymes are raised.
        let mut severity = match (enzymes_elevated, ratio >= RATIO_HIGH) {
            (false, _) => InsightSeverity::Normal,
            (true, false) => InsightSeverity::Mild,
            (true, true) => {
                drivers.push(format!("AST/ALT ratio {ratio} is at or above {RATIO_HIGH}"));
                InsightSeverity::Moderate
            }
        };

        if let Some(ggt) = context.value("ggt").filter(|v| *v > GGT_ELEVATED) {
            drivers.push(format!("GGT {ggt} U/L is elevated"));
            if enzymes_elevated {
                severity = escalate(severity);
            }
        }
        if let Some(albumin) = context.value("albumin").filter(|v| *v < ALBUMIN_LOW) {
            drivers.push(format!("Albumin {albumin} g/dL is low, suggesting reduced synthetic function"));
            severity = escalate(severity);
        }

        let recommendations = match severity {
            InsightSeverity::Normal => vec![format!("Liver enzymes are within range (AST/ALT {ratio})")],
            InsightSeverity::Mild => vec![
                format!("Mildly raised liver enzymes (AST/ALT {ratio}); limit alcohol and recheck in 4-6 weeks"),
            ],
            InsightSeverity::Moderate | InsightSeverity::Severe => vec![
                format!("AST/ALT {ratio} with raised enzymes warrants hepatology review"),
                "Avoid alcohol and hepatotoxic medication until reviewed".to_string(),
            ],
        };

        let items = ["ast", "alt", "ggt", "albumin"]
            .iter()
            .filter_map(|b| evidence(context, b, "hepatic marker"))
            .collect();

        vec![InsightResult::success(
            self,
            InsightFindings {
                summary: format!("AST/ALT {ratio} ({})", severity.as_str()),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisParameters, BiomarkerPanel, SubjectProfile};

    fn run(panel: BiomarkerPanel) -> InsightResult {
        let ctx = AnalysisContext::new(SubjectProfile::default(), panel, AnalysisParameters::default());
        DeRitisModule::new().analyze(&ctx).remove(0)
    }

    #[test]
    fn normal_enzymes_ignore_ratio() {
        let result = run(BiomarkerPanel::new("t")
            .with("ast", 30.0, "U/L")
            .with("alt", 12.0, "U/L"));
        let findings = result.findings().unwrap();
        assert_eq!(findings.indices["ast_alt_ratio"], 2.5);
        assert_eq!(findings.severity, InsightSeverity::Normal);
    }

    #[test]
    fn high_ratio_with_raised_enzymes() {
        let result = run(BiomarkerPanel::new("t")
            .with("ast", 120.0, "U/L")
            .with("alt", 50.0, "U/L")
            .with("ggt", 150.0, "U/L")
            .with("albumin", 4.2, "g/dL"));
        let findings = result.findings().unwrap();
        assert_eq!(findings.indices["ast_alt_ratio"], 2.4);
        assert_eq!(findings.severity, InsightSeverity::Severe);
        assert_eq!(findings.confidence, 0.95);
    }
}
