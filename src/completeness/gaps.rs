use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogError, CatalogStore};
use crate::models::enums::{GapSeverity, HealthSystem};
use crate::models::BiomarkerPanel;

use super::systems::{
    all_coverage, enough_systems_covered, missing_critical, SystemCoverage, HEALTH_SYSTEMS,
    READY_SYSTEM_COUNT, READY_SYSTEM_COVERAGE,
};

/// One biomarker absent from the panel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BiomarkerGap {
    pub biomarker: String,
    pub display_name: String,
    pub system: HealthSystem,
    pub severity: GapSeverity,
    pub description: String,
    pub clinical_impact: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GapAnalysis {
    pub gaps: Vec<BiomarkerGap>,
    pub critical_missing: Vec<String>,
    /// Reasons the panel cannot support a full analysis. Empty when ready.
    pub analysis_blockers: Vec<String>,
    pub systems: Vec<SystemCoverage>,
}

impl GapAnalysis {
    pub fn is_blocked(&self) -> bool {
        !self.analysis_blockers.is_empty()
    }

    pub fn gaps_with_severity(&self, severity: GapSeverity) -> impl Iterator<Item = &BiomarkerGap> {
        self.gaps.iter().filter(move |g| g.severity == severity)
    }
}

/// Explains what is missing from a panel and why it matters.
pub struct GapAnalyzer {
    catalog: Arc<CatalogStore>,
}

impl GapAnalyzer {
    pub fn new(catalog: Arc<CatalogStore>) -> Self {
        Self { catalog }
    }

    pub fn analyze(&self, panel: &BiomarkerPanel) -> Result<GapAnalysis, CatalogError> {
        let definitions = self.catalog.load_biomarkers()?;
        let coverage = all_coverage(panel);
        let mut gaps = Vec::new();

        for (spec, c) in HEALTH_SYSTEMS.iter().zip(&coverage) {
            let below_minimum = !c.meets_minimum;
            let missing = c
                .missing_critical
                .iter()
                .map(|name| (name, GapSeverity::Critical))
                .chain(c.missing_optional.iter().map(|name| {
                    let severity = if below_minimum {
                        GapSeverity::Important
                    } else {
                        GapSeverity::Optional
                    };
                    (name, severity)
                }));

            for (name, severity) in missing {
                let definition = definitions.records.iter().find(|d| &d.name == name);
                let display_name = definition
                    .map(|d| d.display_name.clone())
                    .unwrap_or_else(|| name.clone());
                let description = match definition {
                    Some(d) if !d.description.is_empty() => {
                        format!("{display_name} is not in the panel. {}", d.description)
                    }
                    _ => format!("{display_name} is not in the panel."),
                };
                let clinical_impact = match severity {
                    GapSeverity::Critical => format!(
                        "{} Without it the {} assessment cannot be completed.",
                        spec.clinical_impact, spec.system
                    ),
                    GapSeverity::Important => format!(
                        "{} The {} system has {} of {} minimum biomarkers.",
                        spec.clinical_impact,
                        spec.system,
                        c.available.len(),
                        spec.minimum_required
                    ),
                    GapSeverity::Optional => format!(
                        "Would refine the {} assessment; not required.",
                        spec.system
                    ),
                };

                gaps.push(BiomarkerGap {
                    biomarker: name.clone(),
                    display_name,
                    system: spec.system,
                    severity,
                    description,
                    clinical_impact,
                });
            }
        }

        let critical_missing = missing_critical(panel);
        let mut analysis_blockers: Vec<String> = critical_missing
            .iter()
            .map(|name| {
                let system = gaps
                    .iter()
                    .find(|g| &g.biomarker == name)
                    .map(|g| g.system.as_str())
                    .unwrap_or("unknown");
                format!("Missing critical biomarker {name} ({system})")
            })
            .collect();
        if !enough_systems_covered(&coverage) {
            analysis_blockers.push(format!(
                "Fewer than {READY_SYSTEM_COUNT} health systems reach {READY_SYSTEM_COVERAGE}% coverage"
            ));
        }

        tracing::debug!(
            gaps = gaps.len(),
            critical = critical_missing.len(),
            blockers = analysis_blockers.len(),
            "Gap analysis complete"
        );

        Ok(GapAnalysis {
            gaps,
            critical_missing,
            analysis_blockers,
            systems: coverage,
        })
    }
}
