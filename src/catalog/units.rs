use std::sync::Arc;

use crate::models::UnitTable;

use super::error::UnitError;
use super::store::CatalogStore;

/// Decimal places kept after a same-unit conversion.
pub const CONVERSION_PRECISION: u32 = 4;

/// Converts values between catalog units.
pub struct UnitConverter {
    catalog: Arc<CatalogStore>,
}

impl UnitConverter {
    pub fn new(catalog: Arc<CatalogStore>) -> Self {
        Self { catalog }
    }

    /// Convert `value` from `from` to `to`.
    ///
    /// Same-unit conversion only rounds. Cross-unit results keep full
    /// precision so a round trip through the inverse factor stays exact.
    /// `biomarker_hint` selects a biomarker-specific factor when the
    /// catalog declares one.
    pub fn convert(
        &self,
        value: f64,
        from: &str,
        to: &str,
        biomarker_hint: Option<&str>,
    ) -> Result<f64, UnitError> {
        let table = self.catalog.load_units()?;
        convert_with(&table, value, from, to, biomarker_hint)
    }

    /// Whether two unit labels denote the same declared unit.
    pub fn same_unit(&self, a: &str, b: &str) -> Result<bool, UnitError> {
        let table = self.catalog.load_units()?;
        Ok(canonical_symbol(&table, a) == canonical_symbol(&table, b))
    }
}

/// Pure conversion over an already-loaded unit table.
pub fn convert_with(
    table: &UnitTable,
    value: f64,
    from: &str,
    to: &str,
    biomarker_hint: Option<&str>,
) -> Result<f64, UnitError> {
    let from = canonical_symbol(table, from);
    let to = canonical_symbol(table, to);

    if from == to {
        return Ok(round_half_up(value, CONVERSION_PRECISION));
    }

    let factor = resolve_factor(table, &from, &to, biomarker_hint).ok_or_else(|| {
        UnitError::UnsupportedConversion {
            from: from.clone(),
            to: to.clone(),
        }
    })?;

    tracing::debug!(from = %from, to = %to, factor, hint = ?biomarker_hint, "Unit conversion");
    Ok(value * factor)
}

/// Map a unit label to its declared symbol. Matching ignores case and
/// surrounding whitespace; unknown labels come back trimmed.
pub fn canonical_symbol(table: &UnitTable, unit: &str) -> String {
    let wanted = unit.trim().to_lowercase();
    table
        .units
        .iter()
        .find(|u| {
            u.symbol.to_lowercase() == wanted
                || u.aliases.iter().any(|a| a.to_lowercase() == wanted)
        })
        .map(|u| u.symbol.clone())
        .unwrap_or_else(|| unit.trim().to_string())
}

/// Multiplicative factor taking `from` to `to`, trying in order: the
/// biomarker override, the generic name, the slug name. Each name is also
/// tried in the reverse direction and inverted.
fn resolve_factor(table: &UnitTable, from: &str, to: &str, hint: Option<&str>) -> Option<f64> {
    let mut names: Vec<(String, String)> = Vec::with_capacity(3);
    if let Some(hint) = hint {
        let hint = hint.trim().to_lowercase();
        names.push((
            format!("{hint}_{from}_to_{to}"),
            format!("{hint}_{to}_to_{from}"),
        ));
    }
    names.push((format!("{from}_to_{to}"), format!("{to}_to_{from}")));
    names.push((
        format!("{}_to_{}", slug(from), slug(to)),
        format!("{}_to_{}", slug(to), slug(from)),
    ));

    names.iter().find_map(|(forward, reverse)| {
        table
            .conversions
            .get(forward)
            .copied()
            .or_else(|| table.conversions.get(reverse).map(|f| 1.0 / f))
    })
}

/// Alternate naming pattern: lowercase, `/` spelled out, micro sign as `u`.
fn slug(unit: &str) -> String {
    unit.trim()
        .to_lowercase()
        .replace(['µ', 'μ'], "u")
        .replace('/', "_per_")
        .replace(['^', '.'], "")
        .replace(' ', "_")
}

/// Round half-up at `places` decimals. Ties move away from zero, so
/// -2.5 rounds to -3.
///
/// The scaled magnitude is first snapped to 1e-6 so that representation
/// noise (e.g. 1.00005 stored as 1.0000499999) does not flip the tie.
pub fn round_half_up(value: f64, places: u32) -> f64 {
    let scale = 10f64.powi(places as i32);
    let scaled = (value.abs() * scale * 1e6).round() / 1e6;
    value.signum() * (scaled + 0.5).floor() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converter() -> UnitConverter {
        UnitConverter::new(Arc::new(CatalogStore::bundled()))
    }

    #[test]
    fn same_unit_rounds_to_four_decimals() {
        let c = converter();
        assert_eq!(c.convert(95.123456, "mg/dL", "mg/dL", None).unwrap(), 95.1235);
        assert_eq!(c.convert(1.00005, "mg/dL", "mg/dl", None).unwrap(), 1.0001);
    }

    #[test]
    fn round_half_up_ties_go_away_from_zero() {
        assert_eq!(round_half_up(2.5, 0), 3.0);
        assert_eq!(round_half_up(0.12345, 4), 0.1235);
        assert_eq!(round_half_up(-2.5, 0), -3.0);
        assert_eq!(round_half_up(-0.12345, 4), -0.1235);
        assert_eq!(round_half_up(-2.4, 0), -2.0);
        assert_eq!(round_half_up(0.0, 2), 0.0);
    }

    #[test]
    fn generic_cholesterol_conversion() {
        let c = converter();
        let mmol = c.convert(200.0, "mg/dL", "mmol/L", Some("total_cholesterol")).unwrap();
        assert!((mmol - 5.18).abs() < 1e-9);
        let back = c.convert(mmol, "mmol/L", "mg/dL", Some("total_cholesterol")).unwrap();
        assert!((back - 200.0).abs() < 1e-3);
    }

    #[test]
    fn glucose_override_differs_from_generic() {
        let c = converter();
        let glucose = c.convert(100.0, "mg/dL", "mmol/L", Some("glucose")).unwrap();
        let generic = c.convert(100.0, "mg/dL", "mmol/L", None).unwrap();
        assert!((glucose - 5.55).abs() < 1e-9);
        assert!((generic - 2.59).abs() < 1e-9);
    }

    #[test]
    fn inverse_factor_is_used() {
        let c = converter();
        let mg = c.convert(5.55, "mmol/L", "mg/dL", Some("glucose")).unwrap();
        assert!((mg - 100.0).abs() < 1e-3);
    }

    #[test]
    fn slug_pattern_resolves_cortisol() {
        let c = converter();
        let nmol = c.convert(10.0, "ug/dL", "nmol/L", Some("cortisol")).unwrap();
        assert!((nmol - 275.9).abs() < 1e-9);
        let back = c.convert(275.9, "nmol/L", "µg/dL", None).unwrap();
        assert!((back - 10.0).abs() < 1e-3);
    }

    #[test]
    fn unknown_pair_is_unsupported() {
        let c = converter();
        let err = c.convert(1.0, "U/L", "mg/dL", None).unwrap_err();
        assert!(matches!(err, UnitError::UnsupportedConversion { .. }));
    }

    #[test]
    fn aliases_resolve_to_symbol() {
        let store = CatalogStore::bundled();
        let table = store.load_units().unwrap();
        assert_eq!(canonical_symbol(&table, " µmol/L "), "umol/L");
        assert_eq!(canonical_symbol(&table, "K/uL"), "10^3/uL");
        assert_eq!(canonical_symbol(&table, "furlongs"), "furlongs");
    }

    #[test]
    fn cross_unit_keeps_full_precision() {
        let c = converter();
        let mmol = c.convert(150.5, "mg/dL", "mmol/L", Some("triglycerides")).unwrap();
        assert!((mmol - 150.5 * 0.0113).abs() < 1e-12);
        let back = c.convert(mmol, "mmol/L", "mg/dL", Some("triglycerides")).unwrap();
        assert!((back - 150.5).abs() < 1e-3, "round trip drifted to {back}");
    }

    #[test]
    fn declared_pairs_round_trip() {
        let store = CatalogStore::bundled();
        let table = store.load_units().unwrap();
        let pairs = [
            ("mg/dL", "mmol/L", None),
            ("mg/dL", "mmol/L", Some("glucose")),
            ("mg/dL", "mmol/L", Some("triglycerides")),
            ("mg/dL", "umol/L", Some("creatinine")),
            ("mg/dL", "mmol/L", Some("bun")),
            ("uIU/mL", "pmol/L", Some("insulin")),
            ("g/dL", "g/L", None),
            ("mg/L", "mg/dL", None),
            ("ng/mL", "nmol/L", Some("vitamin_d")),
            ("mg/dL", "mmol/L", Some("creatinine")),
            ("ng/dL", "nmol/L", Some("testosterone")),
            ("ng/dL", "pmol/L", Some("free_t4")),
            ("ug/dL", "nmol/L", Some("cortisol")),
        ];
        for (a, b, hint) in pairs {
            for (from, to) in [(a, b), (b, a)] {
                for x in [0.37, 1.7007, 99.99, 123.45, 150.5, 200.0] {
                    let there = convert_with(&table, x, from, to, hint).unwrap();
                    let back = convert_with(&table, there, to, from, hint).unwrap();
                    assert!(
                        (back - x).abs() < 1e-3,
                        "{x} {from} -> {to} ({hint:?}) -> {back}"
                    );
                }
            }
        }
    }
}
