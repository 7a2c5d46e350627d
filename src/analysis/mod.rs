//! Analysis pipeline: orchestration, result types and start-up composition.

pub mod composition;
pub mod orchestrator;
pub mod types;

pub use composition::{compose, CompositionOptions};
pub use orchestrator::AnalysisOrchestrator;
pub use types::{
    AnalysisError, AnalysisMeta, AnalysisOptions, AnalysisRequest, AnalysisResult, BiomarkerReading, PanelInput, TaggedInsight,
};
