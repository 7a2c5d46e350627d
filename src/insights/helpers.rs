use crate::catalog::units::round_half_up;
use crate::models::enums::{InsightErrorCode, InsightSeverity};
use crate::models::AnalysisContext;

use super::types::{EvidenceItem, InsightModule, InsightResult};

pub const CONFIDENCE_FLOOR: f64 = 0.6;
pub const CONFIDENCE_CEILING: f64 = 0.95;

/// Confidence rising linearly from the floor (no corroborating biomarkers)
/// to the ceiling (all present).
pub fn corroboration_confidence(context: &AnalysisContext, optional: &[&str]) -> f64 {
    if optional.is_empty() {
        return CONFIDENCE_FLOOR;
    }
    let present = optional.iter().filter(|b| context.has(b)).count();
    let fraction = present as f64 / optional.len() as f64;
    round_half_up(
        CONFIDENCE_FLOOR + (CONFIDENCE_CEILING - CONFIDENCE_FLOOR) * fraction,
        3,
    )
}

/// `Err` carries the MISSING_BIOMARKERS result the module should return.
pub fn require_biomarkers(
    module: &dyn InsightModule,
    context: &AnalysisContext,
) -> Result<(), InsightResult> {
    let missing = context.missing(module.required_biomarkers());
    if missing.is_empty() {
        return Ok(());
    }
    Err(missing_result(module, &missing))
}

/// Values of the required biomarkers, in declaration order.
pub fn require_values(
    module: &dyn InsightModule,
    context: &AnalysisContext,
) -> Result<Vec<f64>, InsightResult> {
    require_biomarkers(module, context)?;
    module
        .required_biomarkers()
        .iter()
        .map(|b| context.value(b).ok_or_else(|| missing_result(module, &[b.to_string()])))
        .collect()
}

/// Ratio denominators must be strictly positive.
pub fn positive_denominator(
    module: &dyn InsightModule,
    biomarker: &str,
    value: f64,
) -> Result<f64, InsightResult> {
    if value > 0.0 && value.is_finite() {
        return Ok(value);
    }
    Err(InsightResult::error(
        module.id(),
        module.version(),
        module.category(),
        InsightErrorCode::InvalidValue,
        format!("{biomarker} must be positive to compute a ratio, got {value}"),
    ))
}

fn missing_result(module: &dyn InsightModule, missing: &[String]) -> InsightResult {
    InsightResult::error(
        module.id(),
        module.version(),
        module.category(),
        InsightErrorCode::MissingBiomarkers,
        format!("Missing required biomarkers: {}", missing.join(", ")),
    )
}

/// Evidence entry for a biomarker present in the panel.
pub fn evidence(context: &AnalysisContext, biomarker: &str, note: impl Into<String>) -> Option<EvidenceItem> {
    context.panel.get(biomarker).map(|v| EvidenceItem {
        biomarker: v.name.clone(),
        value: v.value,
        unit: v.unit.clone(),
        note: note.into(),
    })
}

/// First tier whose lower bound `value` reaches, scanning from the top.
/// `tiers` is ordered by ascending lower bound.
pub fn tier_for(value: f64, tiers: &[(f64, InsightSeverity)]) -> InsightSeverity {
    tiers
        .iter()
        .rev()
        .find(|(lower, _)| value >= *lower)
        .map(|(_, severity)| *severity)
        .unwrap_or(InsightSeverity::Normal)
}

/// One tier up, saturating at severe.
pub fn escalate(severity: InsightSeverity) -> InsightSeverity {
    match severity {
        InsightSeverity::Normal => InsightSeverity::Mild,
        InsightSeverity::Mild => InsightSeverity::Moderate,
        InsightSeverity::Moderate | InsightSeverity::Severe => InsightSeverity::Severe,
    }
}

/// Involved biomarkers: required ones plus the optional ones present.
pub fn involved(module: &dyn InsightModule, context: &AnalysisContext) -> Vec<String> {
    module
        .required_biomarkers()
        .iter()
        .chain(module.optional_biomarkers().iter())
        .filter(|b| context.has(b))
        .map(|b| b.to_string())
        .collect()
}
