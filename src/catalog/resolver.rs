use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::enums::{Gender, RangeStatus};
use crate::models::{ReferenceRange, DEFAULT_POPULATION};

use super::error::{CatalogError, UnitError};
use super::ranges::ReferenceRangeSelector;
use super::store::CatalogStore;
use super::units::UnitConverter;

/// Result of classifying one value against its reference range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Classification {
    pub status: RangeStatus,
    pub message: String,
    /// The value expressed in the range's unit, when conversion succeeded.
    pub converted_value: Option<f64>,
    pub range: Option<ReferenceRange>,
}

/// Classifies canonical biomarker values as low/normal/high.
pub struct CanonicalResolver {
    selector: ReferenceRangeSelector,
    converter: UnitConverter,
}

impl CanonicalResolver {
    pub fn new(catalog: Arc<CatalogStore>) -> Self {
        Self {
            selector: ReferenceRangeSelector::new(Arc::clone(&catalog)),
            converter: UnitConverter::new(catalog),
        }
    }

    pub fn classify(
        &self,
        biomarker: &str,
        value: f64,
        unit: &str,
        age: Option<u32>,
        gender: Option<Gender>,
    ) -> Result<Classification, CatalogError> {
        self.classify_for_population(biomarker, value, unit, age, gender, DEFAULT_POPULATION)
    }

    /// Unsupported conversions become `conversion_error` rather than errors;
    /// only catalog failures propagate.
    pub fn classify_for_population(
        &self,
        biomarker: &str,
        value: f64,
        unit: &str,
        age: Option<u32>,
        gender: Option<Gender>,
        population: &str,
    ) -> Result<Classification, CatalogError> {
        let Some(range) = self.selector.select(biomarker, age, gender, population)? else {
            return Ok(Classification {
                status: RangeStatus::Unknown,
                message: format!("No reference range declared for {biomarker}"),
                converted_value: None,
                range: None,
            });
        };

        let converted = match self
            .converter
            .convert(value, unit, &range.unit, Some(biomarker))
        {
            Ok(v) => v,
            Err(UnitError::UnsupportedConversion { from, to }) => {
                tracing::warn!(
                    biomarker,
                    from = %from,
                    to = %to,
                    "Cannot convert value to reference range unit"
                );
                return Ok(Classification {
                    status: RangeStatus::ConversionError,
                    message: format!(
                        "Cannot compare {biomarker}: no conversion from {from} to {to}"
                    ),
                    converted_value: None,
                    range: Some(range),
                });
            }
            Err(UnitError::Catalog(e)) => return Err(e),
        };

        let status = compare_to_range(converted, &range);
        let message = describe(biomarker, converted, status, &range);
        Ok(Classification {
            status,
            message,
            converted_value: Some(converted),
            range: Some(range),
        })
    }
}

/// Bound comparison with inclusive bounds.
pub fn compare_to_range(value: f64, range: &ReferenceRange) -> RangeStatus {
    match (range.min, range.max) {
        (None, None) => RangeStatus::Unknown,
        (None, Some(max)) => {
            if value <= max {
                RangeStatus::Normal
            } else {
                RangeStatus::High
            }
        }
        (Some(min), None) => {
            if value >= min {
                RangeStatus::Normal
            } else {
                RangeStatus::Low
            }
        }
        (Some(min), Some(max)) => {
            if value < min {
                RangeStatus::Low
            } else if value > max {
                RangeStatus::High
            } else {
                RangeStatus::Normal
            }
        }
    }
}

fn describe(biomarker: &str, value: f64, status: RangeStatus, range: &ReferenceRange) -> String {
    let interval = range.describe();
    match status {
        RangeStatus::Normal => format!("{biomarker} {value} {} is within {interval}", range.unit),
        RangeStatus::Low => format!("{biomarker} {value} {} is below {interval}", range.unit),
        RangeStatus::High => format!("{biomarker} {value} {} is above {interval}", range.unit),
        RangeStatus::Unknown => {
            format!("{biomarker} has a reference range with no bounds ({})", range.population)
        }
        RangeStatus::ConversionError => format!("{biomarker} could not be converted"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::source::{CatalogTable, InMemorySource};

    fn resolver() -> CanonicalResolver {
        CanonicalResolver::new(Arc::new(CatalogStore::bundled()))
    }

    fn bounded(min: Option<f64>, max: Option<f64>) -> ReferenceRange {
        ReferenceRange {
            biomarker: "x".into(),
            population: "general_adult".into(),
            gender: None,
            age_min: None,
            age_max: None,
            min,
            max,
            unit: "mg/dL".into(),
        }
    }

    #[test]
    fn glucose_classification() {
        let r = resolver();
        assert_eq!(r.classify("glucose", 95.0, "mg/dL", None, None).unwrap().status, RangeStatus::Normal);
        assert_eq!(r.classify("glucose", 65.0, "mg/dL", None, None).unwrap().status, RangeStatus::Low);
        assert_eq!(r.classify("glucose", 110.0, "mg/dL", None, None).unwrap().status, RangeStatus::High);
    }

    #[test]
    fn bounds_are_inclusive() {
        let r = resolver();
        assert_eq!(r.classify("glucose", 70.0, "mg/dL", None, None).unwrap().status, RangeStatus::Normal);
        assert_eq!(r.classify("glucose", 100.0, "mg/dL", None, None).unwrap().status, RangeStatus::Normal);
    }

    #[test]
    fn no_range_is_unknown() {
        let c = resolver().classify("apolipoprotein_b", 90.0, "mg/dL", None, None).unwrap();
        assert_eq!(c.status, RangeStatus::Unknown);
        assert!(c.range.is_none());
    }

    #[test]
    fn four_bound_cases() {
        assert_eq!(compare_to_range(5.0, &bounded(None, None)), RangeStatus::Unknown);
        assert_eq!(compare_to_range(5.0, &bounded(None, Some(5.0))), RangeStatus::Normal);
        assert_eq!(compare_to_range(5.1, &bounded(None, Some(5.0))), RangeStatus::High);
        assert_eq!(compare_to_range(5.0, &bounded(Some(5.0), None)), RangeStatus::Normal);
        assert_eq!(compare_to_range(4.9, &bounded(Some(5.0), None)), RangeStatus::Low);
        assert_eq!(compare_to_range(4.9, &bounded(Some(5.0), Some(9.0))), RangeStatus::Low);
        assert_eq!(compare_to_range(9.1, &bounded(Some(5.0), Some(9.0))), RangeStatus::High);
    }

    #[test]
    fn converts_into_range_unit() {
        let c = resolver().classify("glucose", 5.3, "mmol/L", None, None).unwrap();
        assert_eq!(c.status, RangeStatus::Normal);
        let mg = c.converted_value.unwrap();
        assert!((mg - 95.4955).abs() < 1e-4, "got {mg}");
    }

    #[test]
    fn creatinine_in_mmol_uses_its_own_factor() {
        let c = resolver().classify("creatinine", 0.09, "mmol/L", None, None).unwrap();
        let mg = c.converted_value.unwrap();
        assert!((mg - 0.09 / 0.0884).abs() < 1e-9, "got {mg}");
        assert_eq!(c.status, RangeStatus::Normal);
    }

    #[test]
    fn free_t4_does_not_borrow_testosterone_factor() {
        let c = resolver().classify("free_t4", 15.0, "pmol/L", None, None).unwrap();
        let ng = c.converted_value.unwrap();
        assert!((ng - 15.0 / 12.87).abs() < 1e-9, "got {ng}");
        assert_eq!(c.status, RangeStatus::Normal);

        let c = resolver().classify("free_t4", 0.015, "nmol/L", None, None).unwrap();
        assert_eq!(c.status, RangeStatus::ConversionError);
    }

    #[test]
    fn unsupported_unit_is_conversion_error() {
        let c = resolver().classify("glucose", 95.0, "U/L", None, None).unwrap();
        assert_eq!(c.status, RangeStatus::ConversionError);
        assert!(c.converted_value.is_none());
        assert!(c.range.is_some());
    }

    #[test]
    fn missing_units_table_propagates() {
        let source = InMemorySource::new("partial").with_table(
            CatalogTable::ReferenceRanges,
            serde_json::json!({"version": "1", "records": [
                {"biomarker": "glucose", "population": "general_adult", "min": 70, "max": 100, "unit": "mg/dL"}
            ]}),
        );
        let r = CanonicalResolver::new(Arc::new(CatalogStore::new(Arc::new(source))));
        assert!(matches!(
            r.classify("glucose", 90.0, "mg/dL", None, None),
            Err(CatalogError::NotFound(_, _))
        ));
    }
}
