use serde::{Deserialize, Serialize};

use crate::catalog::units::round_half_up;
use crate::models::enums::HealthSystem;
use crate::models::BiomarkerPanel;

/// Coverage at or above which a system counts toward analysis readiness.
pub const READY_SYSTEM_COVERAGE: f64 = 50.0;

/// Systems that must reach `READY_SYSTEM_COVERAGE` for a panel to be ready.
pub const READY_SYSTEM_COUNT: usize = 2;

/// Static description of one health system.
#[derive(Debug)]
pub struct HealthSystemSpec {
    pub system: HealthSystem,
    pub critical: &'static [&'static str],
    pub optional: &'static [&'static str],
    /// Biomarkers needed before the system is considered assessable.
    pub minimum_required: usize,
    /// Share of the overall completeness score. Hormonal and nutritional are
    /// zero until their weighting is agreed.
    pub weight: f64,
    pub clinical_impact: &'static str,
}

impl HealthSystemSpec {
    pub fn biomarkers(&self) -> impl Iterator<Item = &'static str> {
        self.critical.iter().chain(self.optional.iter()).copied()
    }

    pub fn size(&self) -> usize {
        self.critical.len() + self.optional.len()
    }
}

pub static HEALTH_SYSTEMS: [HealthSystemSpec; 8] = [
    HealthSystemSpec {
        system: HealthSystem::Metabolic,
        critical: &["glucose", "hba1c"],
        optional: &["insulin"],
        minimum_required: 2,
        weight: 0.25,
        clinical_impact: "Blood sugar regulation and insulin resistance cannot be evaluated.",
    },
    HealthSystemSpec {
        system: HealthSystem::Cardiovascular,
        critical: &["total_cholesterol", "ldl_cholesterol", "hdl_cholesterol"],
        optional: &["triglycerides", "apolipoprotein_b"],
        minimum_required: 3,
        weight: 0.25,
        clinical_impact: "Lipid-driven cardiovascular risk cannot be estimated.",
    },
    HealthSystemSpec {
        system: HealthSystem::Inflammatory,
        critical: &["crp"],
        optional: &["homocysteine"],
        minimum_required: 1,
        weight: 0.15,
        clinical_impact: "Systemic inflammation status is unknown.",
    },
    HealthSystemSpec {
        system: HealthSystem::Hormonal,
        critical: &[],
        optional: &["tsh", "free_t4", "testosterone", "cortisol"],
        minimum_required: 2,
        weight: 0.0,
        clinical_impact: "Thyroid and endocrine balance cannot be reviewed.",
    },
    HealthSystemSpec {
        system: HealthSystem::Nutritional,
        critical: &[],
        optional: &["vitamin_d", "vitamin_b12", "ferritin", "folate"],
        minimum_required: 2,
        weight: 0.0,
        clinical_impact: "Micronutrient deficiencies may go undetected.",
    },
    HealthSystemSpec {
        system: HealthSystem::Kidney,
        critical: &["creatinine", "bun"],
        optional: &[],
        minimum_required: 2,
        weight: 0.15,
        clinical_impact: "Kidney filtration and hydration status cannot be assessed.",
    },
    HealthSystemSpec {
        system: HealthSystem::Liver,
        critical: &["alt", "ast"],
        optional: &["ggt"],
        minimum_required: 2,
        weight: 0.10,
        clinical_impact: "Liver cell injury and enzyme patterns cannot be evaluated.",
    },
    HealthSystemSpec {
        system: HealthSystem::CompleteBloodCount,
        critical: &["hemoglobin", "white_blood_cells", "platelets"],
        optional: &["hematocrit"],
        minimum_required: 3,
        weight: 0.10,
        clinical_impact: "Anaemia, infection and clotting markers are unavailable.",
    },
];

pub fn spec_for(system: HealthSystem) -> &'static HealthSystemSpec {
    let index = match system {
        HealthSystem::Metabolic => 0,
        HealthSystem::Cardiovascular => 1,
        HealthSystem::Inflammatory => 2,
        HealthSystem::Hormonal => 3,
        HealthSystem::Nutritional => 4,
        HealthSystem::Kidney => 5,
        HealthSystem::Liver => 6,
        HealthSystem::CompleteBloodCount => 7,
    };
    &HEALTH_SYSTEMS[index]
}

/// Coverage of one system by a panel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemCoverage {
    pub system: HealthSystem,
    pub available: Vec<String>,
    pub missing_critical: Vec<String>,
    pub missing_optional: Vec<String>,
    /// |available ∩ system| / |system| × 100, rounded to 2 decimals.
    pub coverage_percent: f64,
    pub meets_minimum: bool,
}

pub fn system_coverage(spec: &HealthSystemSpec, panel: &BiomarkerPanel) -> SystemCoverage {
    let available: Vec<String> = spec
        .biomarkers()
        .filter(|b| panel.contains(b))
        .map(str::to_string)
        .collect();
    let missing = |names: &[&str]| -> Vec<String> {
        names
            .iter()
            .filter(|b| !panel.contains(b))
            .map(|b| b.to_string())
            .collect()
    };
    let coverage_percent = if spec.size() == 0 {
        0.0
    } else {
        round_half_up(available.len() as f64 / spec.size() as f64 * 100.0, 2)
    };

    SystemCoverage {
        system: spec.system,
        meets_minimum: available.len() >= spec.minimum_required,
        missing_critical: missing(spec.critical),
        missing_optional: missing(spec.optional),
        available,
        coverage_percent,
    }
}

pub fn all_coverage(panel: &BiomarkerPanel) -> Vec<SystemCoverage> {
    HEALTH_SYSTEMS
        .iter()
        .map(|spec| system_coverage(spec, panel))
        .collect()
}

/// Critical biomarkers absent from the panel, in system declaration order.
pub fn missing_critical(panel: &BiomarkerPanel) -> Vec<String> {
    let mut missing = Vec::new();
    for name in HEALTH_SYSTEMS.iter().flat_map(|s| s.critical.iter()) {
        if !panel.contains(name) && !missing.iter().any(|m: &String| m == name) {
            missing.push(name.to_string());
        }
    }
    missing
}

/// Whether enough systems are covered for a meaningful analysis.
pub fn enough_systems_covered(coverage: &[SystemCoverage]) -> bool {
    coverage
        .iter()
        .filter(|c| c.coverage_percent >= READY_SYSTEM_COVERAGE)
        .count()
        >= READY_SYSTEM_COUNT
}
