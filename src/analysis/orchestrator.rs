//! End-to-end analysis pipeline.
//!
//! Normalize → validate canonical keys → classify → completeness/gaps →
//! run enabled insight modules → narrative (optional) → merge.
//!
//! The key check is a hard precondition. Everything after it degrades
//! per item: a failing module becomes a MODULE_FAILURE result, a failing
//! narrative becomes a note.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures_util::future::join_all;

use super::types::{
    AnalysisError, AnalysisMeta, AnalysisOptions, AnalysisResult, BiomarkerReading, PanelInput, TaggedInsight,
};
use crate::catalog::{CanonicalResolver, CatalogStore, UnitConverter};
use crate::completeness::{CompletenessAssessor, CompletenessResult, GapAnalyzer};
use crate::insights::{InsightModule, InsightRegistry, InsightResult, ManifestEntry, ManifestSource};
use crate::models::enums::{AnalysisStatus, InsightCategory, InsightErrorCode};
use crate::models::{AnalysisContext, AnalysisParameters, BiomarkerPanel, BiomarkerValue, SubjectProfile};
use crate::narrative::{
    generate_with_retry, InsightSummary, NarrativeCapability, NarrativeContext, ReadingSummary, RetryPolicy,
};
use crate::normalization::BiomarkerNormalizer;

pub struct AnalysisOrchestrator {
    catalog: Arc<CatalogStore>,
    normalizer: BiomarkerNormalizer,
    resolver: CanonicalResolver,
    converter: UnitConverter,
    assessor: CompletenessAssessor,
    gap_analyzer: GapAnalyzer,
    registry: Arc<InsightRegistry>,
    manifests: Arc<dyn ManifestSource>,
    narrative: Option<Arc<dyn NarrativeCapability>>,
    retry: RetryPolicy,
}

/// A module selected by the manifest, with its manifest entry.
struct ScheduledModule {
    entry: ManifestEntry,
    module: Arc<dyn InsightModule>,
}

impl AnalysisOrchestrator {
    pub fn new(
        catalog: Arc<CatalogStore>,
        registry: Arc<InsightRegistry>,
        manifests: Arc<dyn ManifestSource>,
    ) -> Self {
        Self {
            normalizer: BiomarkerNormalizer::new(Arc::clone(&catalog)),
            resolver: CanonicalResolver::new(Arc::clone(&catalog)),
            converter: UnitConverter::new(Arc::clone(&catalog)),
            gap_analyzer: GapAnalyzer::new(Arc::clone(&catalog)),
            assessor: CompletenessAssessor::new(),
            catalog,
            registry,
            manifests,
            narrative: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_narrative(mut self, capability: Arc<dyn NarrativeCapability>, retry: RetryPolicy) -> Self {
        self.narrative = Some(capability);
        self.retry = retry;
        self
    }

    pub fn catalog(&self) -> &Arc<CatalogStore> {
        &self.catalog
    }

    pub fn registry(&self) -> &Arc<InsightRegistry> {
        &self.registry
    }

    pub async fn run_analysis(
        &self,
        input: PanelInput,
        profile: SubjectProfile,
        options: AnalysisOptions,
    ) -> Result<AnalysisResult, AnalysisError> {
        let start = Instant::now();

        // ── Normalize + validate ──────────────────────────────
        let (panel, unmapped_keys) = self.prepare_panel(input, options.assume_canonical)?;
        let offending = self.normalizer.validate_panel(&panel)?;
        if !offending.is_empty() {
            tracing::warn!(keys = ?offending, "Rejecting panel with non-canonical keys");
            return Err(AnalysisError::NonCanonicalKeys(offending));
        }

        // ── Manifest (fail fast before any module runs) ────────
        let manifest = self.manifests.get_active_manifest()?;
        manifest.validate_against(&self.registry)?;
        let scheduled = self.schedule(&manifest.enabled_entries(), options.requested_categories.as_deref())?;

        let context = Arc::new(AnalysisContext::new(
            profile,
            self.harmonize_units(&panel)?,
            AnalysisParameters {
                requested_categories: options.requested_categories.clone(),
                max_insights_per_category: options.max_insights_per_category,
                ..AnalysisParameters::default()
            },
        ));
        let analysis_id = context.analysis_id;
        tracing::info!(
            analysis_id = %analysis_id,
            biomarkers = panel.len(),
            modules = scheduled.len(),
            manifest = %manifest.id,
            "Starting analysis"
        );

        // ── Classify + completeness ───────────────────────────
        let biomarkers = self.classify_panel(&panel, &context.profile)?;
        let (completeness, gaps) = if options.include_completeness {
            (
                Some(self.assessor.assess(&context.panel)),
                Some(self.gap_analyzer.analyze(&context.panel)?),
            )
        } else {
            (None, None)
        };

        // ── Insight modules ───────────────────────────────────
        let mut modular = run_modules(&scheduled, &context).await;
        let module_failures = modular
            .iter()
            .filter(|r| r.error_code() == Some(InsightErrorCode::ModuleFailure))
            .count();
        for result in &mut modular {
            result.manifest_id = Some(manifest.id.clone());
        }
        if let Some(limit) = options.max_insights_per_category {
            modular = truncate_per_category(modular, limit);
        }

        let mut notes = Vec::new();
        if module_failures > 0 {
            notes.push(format!("{module_failures} insight module(s) failed and were skipped"));
        }

        // ── Narrative ─────────────────────────────────────────
        let mut llm = Vec::new();
        let mut narrative_confidence = None;
        let mut narrative_failed = false;
        if let (true, Some(capability)) = (options.include_narrative, &self.narrative) {
            let narrative_context = Arc::new(build_narrative_context(
                &context,
                &biomarkers,
                completeness.as_ref(),
                &modular,
            ));
            match generate_with_retry(Arc::clone(capability), narrative_context, &self.retry).await {
                Ok(output) => {
                    narrative_confidence = Some(output.confidence);
                    llm = output.insights;
                }
                Err(e) => {
                    tracing::warn!(analysis_id = %analysis_id, error = %e, "Narrative unavailable, continuing without it");
                    notes.push(format!("Narrative insights unavailable ({e}); deterministic results only"));
                    narrative_failed = true;
                }
            }
        }

        // ── Merge ─────────────────────────────────────────────
        let modular_insights_count = modular.len();
        let llm_insights_count = llm.len();
        let mut insights: Vec<TaggedInsight> = modular.into_iter().map(TaggedInsight::Modular).collect();
        insights.extend(llm.into_iter().map(TaggedInsight::Llm));

        let status = if narrative_failed || module_failures > 0 {
            AnalysisStatus::Degraded
        } else {
            AnalysisStatus::Complete
        };
        let processing_time_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            analysis_id = %analysis_id,
            modular = modular_insights_count,
            llm = llm_insights_count,
            status = %status,
            elapsed_ms = processing_time_ms,
            "Analysis finished"
        );

        Ok(AnalysisResult {
            analysis_id,
            biomarkers,
            clusters: Vec::new(),
            insights,
            overall_score: completeness.as_ref().map(|c| c.overall_score),
            completeness,
            gaps,
            status,
            meta: AnalysisMeta {
                modular_insights_count,
                llm_insights_count,
                processing_time_ms,
                unmapped_keys,
                manifest_id: manifest.id,
                catalog_version: self.catalog.version().to_string(),
                schema_version: context.schema_version.clone(),
                narrative_confidence,
                notes,
                created_at: Utc::now(),
            },
        })
    }

    fn prepare_panel(
        &self,
        input: PanelInput,
        assume_canonical: bool,
    ) -> Result<(BiomarkerPanel, Vec<String>), AnalysisError> {
        match input {
            PanelInput::Canonical(panel) => Ok((panel, Vec::new())),
            PanelInput::Raw(raw) if assume_canonical => {
                let mut panel = BiomarkerPanel::new("canonical");
                for (name, value) in raw {
                    let unit = self.catalog.definition(&name)?.map(|d| d.unit).unwrap_or_default();
                    panel.insert(BiomarkerValue::new(name, value, unit));
                }
                Ok((panel, Vec::new()))
            }
            PanelInput::Raw(raw) => {
                let outcome = self.normalizer.normalize(&raw)?;
                Ok((outcome.panel, outcome.unmapped_keys))
            }
        }
    }

    /// Panel copy in catalog units, the units insight thresholds are written in.
    /// Values that cannot be converted are left as measured.
    fn harmonize_units(&self, panel: &BiomarkerPanel) -> Result<BiomarkerPanel, AnalysisError> {
        let mut harmonized = BiomarkerPanel::new(panel.provenance.clone());
        for value in panel.values.values() {
            let Some(def) = self.catalog.definition(&value.name)? else {
                harmonized.insert(value.clone());
                continue;
            };
            if value.unit.is_empty() || self.converter.same_unit(&value.unit, &def.unit)? {
                harmonized.insert(BiomarkerValue { unit: def.unit, ..value.clone() });
                continue;
            }
            match self.converter.convert(value.value, &value.unit, &def.unit, Some(value.name.as_str())) {
                Ok(converted) => harmonized.insert(BiomarkerValue {
                    value: converted,
                    unit: def.unit,
                    ..value.clone()
                }),
                Err(e) => {
                    tracing::debug!(biomarker = %value.name, error = %e, "Keeping value in measured unit");
                    harmonized.insert(value.clone());
                }
            }
        }
        Ok(harmonized)
    }

    fn classify_panel(
        &self,
        panel: &BiomarkerPanel,
        profile: &SubjectProfile,
    ) -> Result<Vec<BiomarkerReading>, AnalysisError> {
        let demographics = &profile.demographics;
        panel
            .values
            .values()
            .map(|v| -> Result<BiomarkerReading, AnalysisError> {
                let classification = self.resolver.classify_for_population(
                    &v.name,
                    v.value,
                    &v.unit,
                    demographics.age,
                    demographics.gender,
                    demographics.population(),
                )?;
                let display_name = self
                    .catalog
                    .definition(&v.name)?
                    .map(|d| d.display_name)
                    .unwrap_or_else(|| v.name.clone());
                Ok(BiomarkerReading {
                    biomarker: v.name.clone(),
                    display_name,
                    value: v.value,
                    unit: v.unit.clone(),
                    status: classification.status,
                    message: classification.message,
                    converted_value: classification.converted_value,
                    reference_range: classification.range,
                })
            })
            .collect()
    }

    fn schedule(
        &self,
        entries: &[&ManifestEntry],
        requested: Option<&[InsightCategory]>,
    ) -> Result<Vec<ScheduledModule>, AnalysisError> {
        let mut scheduled = Vec::with_capacity(entries.len());
        for entry in entries {
            let module = self.registry.get(&entry.insight_id, &entry.version)?;
            if requested.is_some_and(|cats| !cats.contains(&module.category())) {
                continue;
            }
            scheduled.push(ScheduledModule {
                entry: (*entry).clone(),
                module,
            });
        }
        Ok(scheduled)
    }
}

/// Runs every module on the blocking pool and joins them. A panicking module
/// yields a MODULE_FAILURE result in its slot; the others are unaffected.
async fn run_modules(scheduled: &[ScheduledModule], context: &Arc<AnalysisContext>) -> Vec<InsightResult> {
    let handles = scheduled.iter().map(|s| {
        let module = Arc::clone(&s.module);
        let ctx = Arc::clone(context);
        tokio::task::spawn_blocking(move || module.analyze(&ctx))
    });
    let joined = join_all(handles).await;

    scheduled
        .iter()
        .zip(joined)
        .flat_map(|(s, outcome)| match outcome {
            Ok(results) => results,
            Err(join_error) => {
                let detail = if join_error.is_panic() {
                    panic_message(join_error.into_panic())
                } else {
                    join_error.to_string()
                };
                tracing::warn!(
                    insight = %s.entry.insight_id,
                    version = %s.entry.version,
                    detail = %detail,
                    "Insight module failed"
                );
                vec![InsightResult::error(
                    s.module.id(),
                    s.module.version(),
                    s.module.category(),
                    InsightErrorCode::ModuleFailure,
                    format!("Insight module failed: {detail}"),
                )]
            }
        })
        .collect()
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Keeps the first `limit` results of each category, preserving order.
fn truncate_per_category(results: Vec<InsightResult>, limit: usize) -> Vec<InsightResult> {
    let mut seen: HashMap<InsightCategory, usize> = HashMap::new();
    results
        .into_iter()
        .filter(|r| {
            let count = seen.entry(r.category).or_insert(0);
            *count += 1;
            *count <= limit
        })
        .collect()
}

fn build_narrative_context(
    context: &AnalysisContext,
    readings: &[BiomarkerReading],
    completeness: Option<&CompletenessResult>,
    modular: &[InsightResult],
) -> NarrativeContext {
    NarrativeContext {
        analysis_id: context.analysis_id,
        demographics: context.profile.demographics.clone(),
        overall_score: completeness.map(|c| c.overall_score),
        missing_critical: completeness.map(|c| c.missing_critical.clone()).unwrap_or_default(),
        readings: readings
            .iter()
            .map(|r| ReadingSummary {
                biomarker: r.biomarker.clone(),
                value: r.value,
                unit: r.unit.clone(),
                status: r.status,
            })
            .collect(),
        insights: modular
            .iter()
            .filter_map(|r| {
                r.findings().map(|f| InsightSummary {
                    insight_id: r.insight_id.clone(),
                    severity: f.severity,
                    summary: f.summary.clone(),
                    drivers: f.drivers.clone(),
                })
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::insights::{register_builtin_modules, InsightManifest, ManifestError, StaticManifestSource};
    use crate::models::enums::{Gender, RangeStatus};
    use crate::models::Demographics;
    use crate::narrative::{MockNarrative, NarrativeError};
    use std::time::Duration;

    struct PanickingModule;

    impl InsightModule for PanickingModule {
        fn id(&self) -> &str {
            "panicking"
        }
        fn version(&self) -> &str {
            "1.0.0"
        }
        fn category(&self) -> InsightCategory {
            InsightCategory::Metabolic
        }
        fn required_biomarkers(&self) -> &[&str] {
            &[]
        }
        fn analyze(&self, _context: &AnalysisContext) -> Vec<InsightResult> {
            panic!("division by zero in scoring table");
        }
    }

    fn registry() -> Arc<InsightRegistry> {
        let registry = InsightRegistry::new();
        register_builtin_modules(&registry).unwrap();
        Arc::new(registry)
    }

    fn orchestrator_with(registry: Arc<InsightRegistry>, manifest: InsightManifest) -> AnalysisOrchestrator {
        AnalysisOrchestrator::new(
            Arc::new(CatalogStore::bundled()),
            registry,
            Arc::new(StaticManifestSource::new(manifest)),
        )
    }

    fn orchestrator() -> AnalysisOrchestrator {
        orchestrator_with(registry(), InsightManifest::bundled().unwrap())
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            attempt_timeout: Duration::from_secs(1),
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
            jitter: Duration::ZERO,
        }
    }

    fn profile() -> SubjectProfile {
        SubjectProfile {
            demographics: Demographics {
                age: Some(45),
                gender: Some(Gender::Male),
                population: None,
            },
            ..SubjectProfile::default()
        }
    }

    fn raw_values() -> BTreeMap<String, f64> {
        [
            ("GLU", 110.0),
            ("fasting_insulin", 15.0),
            ("a1c", 5.9),
            ("total_cholesterol", 210.0),
            ("LDL", 130.0),
            ("hdl", 45.0),
            ("tg", 160.0),
            ("hs-crp", 2.5),
            ("creatinine", 1.0),
            ("bun", 18.0),
            ("sgpt", 30.0),
            ("sgot", 25.0),
            ("hgb", 14.5),
            ("hct", 43.0),
            ("wbc", 6.5),
            ("plt", 250.0),
            ("neut", 4.0),
            ("lymph", 2.0),
            ("mystery_marker", 1.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    fn manifest(entries: &[(&str, f64)]) -> InsightManifest {
        InsightManifest {
            id: "test".into(),
            entries: entries
                .iter()
                .map(|(id, weight)| ManifestEntry {
                    insight_id: id.to_string(),
                    version: "1.0.0".into(),
                    enabled: true,
                    weight: *weight,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn raw_panel_runs_every_enabled_module() {
        let result = orchestrator()
            .run_analysis(PanelInput::Raw(raw_values()), profile(), AnalysisOptions::default())
            .await
            .unwrap();

        assert_eq!(result.status, AnalysisStatus::Complete);
        assert_eq!(result.meta.unmapped_keys, vec!["mystery_marker"]);
        assert_eq!(result.meta.manifest_id, "default-2026.10");
        assert_eq!(result.meta.modular_insights_count, 6);
        assert_eq!(result.meta.llm_insights_count, 0);
        assert!(result.clusters.is_empty());
        assert!(result.modular().all(|r| r.is_success()));
        assert!(result.modular().all(|r| r.manifest_id.as_deref() == Some("default-2026.10")));
        assert_eq!(result.modular().next().unwrap().insight_id, "insulin_resistance");

        let homa = result.insight("insulin_resistance").unwrap().findings().unwrap().indices["homa_ir"];
        assert!((homa - 4.074).abs() < 0.05);

        assert!(result.overall_score.unwrap() >= 80.0);
        assert!(result.completeness.as_ref().unwrap().analysis_ready);
        assert_eq!(result.biomarkers.len(), 18);
        let glucose = result.biomarkers.iter().find(|b| b.biomarker == "glucose").unwrap();
        assert_eq!(glucose.status, RangeStatus::High);
        assert_eq!(glucose.display_name, "Glucose");
    }

    #[tokio::test]
    async fn panicking_module_does_not_abort_the_others() {
        let registry = registry();
        registry.register("panicking", "1.0.0", || PanickingModule).unwrap();
        let orchestrator = orchestrator_with(
            registry,
            manifest(&[
                ("insulin_resistance", 1.0),
                ("lipid_ratios", 0.9),
                ("panicking", 0.8),
                ("bun_creatinine_ratio", 0.7),
                ("de_ritis_ratio", 0.6),
            ]),
        );

        let result = orchestrator
            .run_analysis(PanelInput::Raw(raw_values()), profile(), AnalysisOptions::default())
            .await
            .unwrap();

        let modular: Vec<&InsightResult> = result.modular().collect();
        assert_eq!(modular.len(), 5);
        assert_eq!(modular.iter().filter(|r| r.is_success()).count(), 4);
        let failed = result.insight("panicking").unwrap();
        assert_eq!(failed.error_code(), Some(InsightErrorCode::ModuleFailure));
        assert_eq!(result.status, AnalysisStatus::Degraded);
        assert!(result.meta.notes.iter().any(|n| n.contains("1 insight module")));
    }

    #[tokio::test]
    async fn non_canonical_keys_abort_the_analysis() {
        let panel = BiomarkerPanel::new("api")
            .with("GLU", 95.0, "mg/dL")
            .with("insulin", 8.0, "uIU/mL");
        let err = orchestrator()
            .run_analysis(PanelInput::Canonical(panel), profile(), AnalysisOptions::default())
            .await
            .unwrap_err();
        match err {
            AnalysisError::NonCanonicalKeys(keys) => assert_eq!(keys, vec!["GLU"]),
            other => panic!("expected NonCanonicalKeys, got {other:?}"),
        }

        let options = AnalysisOptions {
            assume_canonical: true,
            ..AnalysisOptions::default()
        };
        let err = orchestrator()
            .run_analysis(PanelInput::Raw(raw_values()), profile(), options)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::NonCanonicalKeys(ref keys) if keys.len() == 16));
    }

    #[tokio::test]
    async fn unregistered_manifest_entry_fails_fast() {
        let orchestrator = orchestrator_with(registry(), manifest(&[("lipid_ratios", 1.0), ("ghost", 0.5)]));
        let err = orchestrator
            .run_analysis(PanelInput::Raw(raw_values()), profile(), AnalysisOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Manifest(ManifestError::Unregistered { .. })));
    }

    #[tokio::test]
    async fn narrative_output_is_merged_and_tagged() {
        let orchestrator = orchestrator().with_narrative(Arc::new(MockNarrative::with_insight("Overview")), fast_retry());
        let result = orchestrator
            .run_analysis(PanelInput::Raw(raw_values()), profile(), AnalysisOptions::default())
            .await
            .unwrap();

        assert_eq!(result.meta.llm_insights_count, 1);
        assert_eq!(result.meta.narrative_confidence, Some(0.7));
        assert_eq!(result.insights.len(), 7);
        let last = result.insights.last().unwrap();
        assert_eq!(last.source(), "llm");
        assert_eq!(serde_json::to_value(last).unwrap()["source"], "llm");
        assert_eq!(serde_json::to_value(&result.insights[0]).unwrap()["source"], "modular");
        assert_eq!(result.status, AnalysisStatus::Complete);
    }

    #[tokio::test]
    async fn narrative_failure_degrades_to_deterministic_results() {
        let mock = Arc::new(MockNarrative::always_failing(NarrativeError::Connection("offline".into())));
        let orchestrator = orchestrator().with_narrative(mock.clone(), fast_retry());
        let result = orchestrator
            .run_analysis(PanelInput::Raw(raw_values()), profile(), AnalysisOptions::default())
            .await
            .unwrap();

        assert_eq!(result.meta.llm_insights_count, 0);
        assert_eq!(result.meta.modular_insights_count, 6);
        assert_eq!(result.status, AnalysisStatus::Degraded);
        assert!(result.meta.notes.iter().any(|n| n.contains("Narrative insights unavailable")));
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn narrative_can_be_skipped_per_request() {
        let mock = Arc::new(MockNarrative::with_insight("Overview"));
        let orchestrator = orchestrator().with_narrative(mock.clone(), fast_retry());
        let options = AnalysisOptions {
            include_narrative: false,
            include_completeness: false,
            ..AnalysisOptions::default()
        };
        let result = orchestrator
            .run_analysis(PanelInput::Raw(raw_values()), profile(), options)
            .await
            .unwrap();
        assert_eq!(mock.calls(), 0);
        assert!(result.overall_score.is_none());
        assert!(result.gaps.is_none());
    }

    #[tokio::test]
    async fn requested_categories_filter_modules() {
        let options = AnalysisOptions {
            requested_categories: Some(vec![InsightCategory::Kidney, InsightCategory::Liver]),
            ..AnalysisOptions::default()
        };
        let result = orchestrator()
            .run_analysis(PanelInput::Raw(raw_values()), profile(), options)
            .await
            .unwrap();
        let ids: Vec<&str> = result.modular().map(|r| r.insight_id.as_str()).collect();
        assert_eq!(ids, vec!["bun_creatinine_ratio", "de_ritis_ratio"]);
    }

    #[tokio::test]
    async fn canonical_panel_is_harmonized_to_catalog_units() {
        let panel = BiomarkerPanel::new("api")
            .with("glucose", 6.1, "mmol/L")
            .with("insulin", 15.0, "uIU/mL");
        let result = orchestrator()
            .run_analysis(PanelInput::Canonical(panel), profile(), AnalysisOptions::default())
            .await
            .unwrap();

        let glucose = result.biomarkers.iter().find(|b| b.biomarker == "glucose").unwrap();
        assert_eq!(glucose.unit, "mmol/L");
        assert_eq!(glucose.status, RangeStatus::High);
        assert!((glucose.converted_value.unwrap() - 109.91).abs() < 0.01);

        let homa = result.insight("insulin_resistance").unwrap().findings().unwrap().indices["homa_ir"];
        assert!((homa - 4.07).abs() < 0.01);
        let lipids = result.insight("lipid_ratios").unwrap();
        assert_eq!(lipids.error_code(), Some(InsightErrorCode::MissingBiomarkers));
        assert!(!result.completeness.unwrap().analysis_ready);
    }

    #[test]
    fn truncation_keeps_first_per_category() {
        let result = |id: &str, category| {
            InsightResult::error(id, "1.0.0", category, InsightErrorCode::MissingBiomarkers, "x")
        };
        let kept = truncate_per_category(
            vec![
                result("a", InsightCategory::Metabolic),
                result("b", InsightCategory::Metabolic),
                result("c", InsightCategory::Kidney),
                result("d", InsightCategory::Metabolic),
            ],
            1,
        );
        let ids: Vec<&str> = kept.iter().map(|r| r.insight_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn panic_payloads_are_rendered() {
        assert_eq!(panic_message(Box::new("static")), "static");
        assert_eq!(panic_message(Box::new(String::from("owned"))), "owned");
        assert_eq!(panic_message(Box::new(42_u8)), "unknown panic");
    }
}
