use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a string does not name any variant of a `str_enum!` type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {field} value: {value}")]
pub struct InvalidEnumValue {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Serde uses the same string as `as_str`, so JSON and `FromStr` agree.
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidEnumValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(InvalidEnumValue {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(
    /// Outcome of comparing one value against its selected reference range.
    RangeStatus {
        Low => "low",
        Normal => "normal",
        High => "high",
        Unknown => "unknown",
        ConversionError => "conversion_error",
    }
);

str_enum!(Gender {
    Male => "male",
    Female => "female",
});

str_enum!(ValueKind {
    Numeric => "numeric",
    Qualitative => "qualitative",
});

str_enum!(
    /// Clinical grouping used for completeness scoring.
    HealthSystem {
        Metabolic => "metabolic",
        Cardiovascular => "cardiovascular",
        Inflammatory => "inflammatory",
        Hormonal => "hormonal",
        Nutritional => "nutritional",
        Kidney => "kidney",
        Liver => "liver",
        CompleteBloodCount => "complete_blood_count",
    }
);

str_enum!(InsightCategory {
    Metabolic => "metabolic",
    Cardiovascular => "cardiovascular",
    Inflammatory => "inflammatory",
    Kidney => "kidney",
    Liver => "liver",
    Longevity => "longevity",
});

str_enum!(
    /// Ordered from least to most concerning.
    InsightSeverity {
        Normal => "normal",
        Mild => "mild",
        Moderate => "moderate",
        Severe => "severe",
    }
);

str_enum!(ConfidenceLevel {
    Low => "low",
    Medium => "medium",
    High => "high",
});

str_enum!(GapSeverity {
    Critical => "critical",
    Important => "important",
    Optional => "optional",
});

str_enum!(InsightErrorCode {
    MissingBiomarkers => "MISSING_BIOMARKERS",
    MissingContext => "MISSING_CONTEXT",
    InvalidValue => "INVALID_VALUE",
    ModuleFailure => "MODULE_FAILURE",
});

str_enum!(AnalysisStatus {
    Complete => "complete",
    Degraded => "degraded",
});
