//! Panel completeness scoring and gap analysis per health system.
//!
//! Both the assessor and the gap analyzer derive their critical-missing list
//! from `systems::missing_critical`, so the two always agree.

pub mod assessor;
pub mod gaps;
pub mod systems;

pub use assessor::{CompletenessAssessor, CompletenessResult};
pub use gaps::{BiomarkerGap, GapAnalysis, GapAnalyzer};
pub use systems::{HealthSystemSpec, SystemCoverage, HEALTH_SYSTEMS};
