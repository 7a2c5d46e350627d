use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::units::round_half_up;
use crate::models::enums::{ConfidenceLevel, HealthSystem};
use crate::models::BiomarkerPanel;

use super::systems::{
    all_coverage, enough_systems_covered, missing_critical, HEALTH_SYSTEMS, READY_SYSTEM_COUNT,
    READY_SYSTEM_COVERAGE,
};

const HIGH_CONFIDENCE_SCORE: f64 = 80.0;
const MEDIUM_CONFIDENCE_SCORE: f64 = 60.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletenessResult {
    /// Weighted coverage across systems, 0–100.
    pub overall_score: f64,
    pub system_scores: BTreeMap<HealthSystem, f64>,
    pub missing_critical: Vec<String>,
    pub missing_optional: Vec<String>,
    pub confidence_level: ConfidenceLevel,
    pub analysis_ready: bool,
    pub recommendations: Vec<String>,
}

/// Scores how much of each health system a panel covers.
#[derive(Debug, Default, Clone, Copy)]
pub struct CompletenessAssessor;

impl CompletenessAssessor {
    pub fn new() -> Self {
        Self
    }

    pub fn assess(&self, panel: &BiomarkerPanel) -> CompletenessResult {
        let coverage = all_coverage(panel);

        let mut system_scores = BTreeMap::new();
        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        for (spec, c) in HEALTH_SYSTEMS.iter().zip(&coverage) {
            system_scores.insert(spec.system, c.coverage_percent);
            weighted += spec.weight * c.coverage_percent;
            total_weight += spec.weight;
        }
        let overall_score = if total_weight > 0.0 {
            round_half_up(weighted / total_weight, 2)
        } else {
            0.0
        };

        let missing_critical = missing_critical(panel);
        let mut missing_optional: Vec<String> = Vec::new();
        for name in coverage.iter().flat_map(|c| c.missing_optional.iter()) {
            if !missing_optional.contains(name) {
                missing_optional.push(name.clone());
            }
        }

        let confidence_level = confidence_for(overall_score, !missing_critical.is_empty());
        let systems_ok = enough_systems_covered(&coverage);
        let analysis_ready = missing_critical.is_empty() && systems_ok;

        let recommendations = recommendations(overall_score, &missing_critical, systems_ok);

        tracing::debug!(
            overall_score,
            missing_critical = missing_critical.len(),
            analysis_ready,
            "Completeness assessed"
        );

        CompletenessResult {
            overall_score,
            system_scores,
            missing_critical,
            missing_optional,
            confidence_level,
            analysis_ready,
            recommendations,
        }
    }
}

/// Any missing critical biomarker caps confidence at low.
pub fn confidence_for(overall_score: f64, critical_missing: bool) -> ConfidenceLevel {
    if critical_missing {
        ConfidenceLevel::Low
    } else if overall_score >= HIGH_CONFIDENCE_SCORE {
        ConfidenceLevel::High
    } else if overall_score >= MEDIUM_CONFIDENCE_SCORE {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

fn recommendations(score: f64, missing_critical: &[String], systems_ok: bool) -> Vec<String> {
    let mut out: Vec<String> = missing_critical
        .iter()
        .map(|name| {
            let system = HEALTH_SYSTEMS
                .iter()
                .find(|s| s.critical.contains(&name.as_str()))
                .map(|s| s.system.as_str())
                .unwrap_or("overall");
            format!("Add {name} to enable a reliable {system} assessment")
        })
        .collect();

    if !systems_ok {
        out.push(format!(
            "Include enough biomarkers to cover at least {READY_SYSTEM_COUNT} health systems \
             to {READY_SYSTEM_COVERAGE}% or more"
        ));
    }
    if score < MEDIUM_CONFIDENCE_SCORE {
        out.push(format!(
            "Panel completeness is {score:.0}%; a broader panel would improve insight confidence"
        ));
    }
    out
}
