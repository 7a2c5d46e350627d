//! Built-in insight modules.

pub mod biological_age;
pub mod bun_creatinine;
pub mod de_ritis;
pub mod insulin_resistance;
pub mod lipid_ratios;
pub mod neutrophil_lymphocyte;

pub use biological_age::{BiologicalAgeModule, BIOLOGICAL_AGE_ID};
pub use bun_creatinine::{BunCreatinineModule, BUN_CREATININE_ID};
pub use de_ritis::{DeRitisModule, DE_RITIS_ID};
pub use insulin_resistance::{homa_ir, InsulinResistanceModule, INSULIN_RESISTANCE_ID};
pub use lipid_ratios::{LipidRatiosModule, LIPID_RATIOS_ID};
pub use neutrophil_lymphocyte::{NeutrophilLymphocyteModule, NEUTROPHIL_LYMPHOCYTE_ID};
