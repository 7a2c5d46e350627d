use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::enums::{InsightSeverity, RangeStatus};
use crate::models::Demographics;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NarrativeError {
    #[error("Narrative service not reachable at {0}")]
    Connection(String),

    #[error("Narrative HTTP error: {0}")]
    Http(String),

    #[error("Narrative attempt timed out after {0} ms")]
    Timeout(u64),

    #[error("Narrative service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Narrative response parsing failed: {0}")]
    ResponseParsing(String),

    #[error("Narrative attempt aborted: {0}")]
    Aborted(String),

    #[error("Narrative generation failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

impl NarrativeError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Http(_) | Self::Timeout(_) | Self::ResponseParsing(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Aborted(_) | Self::Exhausted { .. } => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Structured context
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadingSummary {
    pub biomarker: String,
    pub value: f64,
    pub unit: String,
    pub status: RangeStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsightSummary {
    pub insight_id: String,
    pub severity: InsightSeverity,
    pub summary: String,
    pub drivers: Vec<String>,
}

/// Precomputed deterministic results handed to the narrative capability.
/// The capability never sees raw input keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NarrativeContext {
    pub analysis_id: Uuid,
    pub demographics: Demographics,
    pub overall_score: Option<f64>,
    pub missing_critical: Vec<String>,
    pub readings: Vec<ReadingSummary>,
    pub insights: Vec<InsightSummary>,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NarrativeInsight {
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub severity: Option<InsightSeverity>,
    #[serde(default)]
    pub biomarkers: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NarrativeOutput {
    pub insights: Vec<NarrativeInsight>,
    pub confidence: f64,
    pub processing_time_ms: u64,
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// Generative interpretation layered over deterministic results.
///
/// Blocking; the orchestrator runs it on the blocking pool with a timeout.
pub trait NarrativeCapability: Send + Sync {
    fn generate(&self, context: &NarrativeContext) -> Result<NarrativeOutput, NarrativeError>;
}

/// Produces nothing.
pub struct NoopNarrative;

impl NarrativeCapability for NoopNarrative {
    fn generate(&self, _context: &NarrativeContext) -> Result<NarrativeOutput, NarrativeError> {
        Ok(NarrativeOutput {
            insights: Vec::new(),
            confidence: 0.0,
            processing_time_ms: 0,
        })
    }
}

/// Deterministic capability for tests: fails the first `failures` calls with
/// `error`, then returns `output`.
pub struct MockNarrative {
    output: NarrativeOutput,
    failures: usize,
    error: NarrativeError,
    calls: AtomicUsize,
}

impl MockNarrative {
    pub fn new(output: NarrativeOutput) -> Self {
        Self {
            output,
            failures: 0,
            error: NarrativeError::Connection("mock".into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// One insight titled `title`, confidence 0.7.
    pub fn with_insight(title: &str) -> Self {
        Self::new(NarrativeOutput {
            insights: vec![NarrativeInsight {
                title: title.to_string(),
                summary: format!("{title} summary"),
                severity: None,
                biomarkers: Vec::new(),
                recommendations: Vec::new(),
            }],
            confidence: 0.7,
            processing_time_ms: 1,
        })
    }

    pub fn failing_first(mut self, failures: usize, error: NarrativeError) -> Self {
        self.failures = failures;
        self.error = error;
        self
    }

    /// Always fails with `error`.
    pub fn always_failing(error: NarrativeError) -> Self {
        Self::with_insight("unreachable").failing_first(usize::MAX, error)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl NarrativeCapability for MockNarrative {
    fn generate(&self, _context: &NarrativeContext) -> Result<NarrativeOutput, NarrativeError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(self.error.clone());
        }
        Ok(self.output.clone())
    }
}
