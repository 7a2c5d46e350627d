//! Optional generative interpretation of deterministic results.

pub mod ollama;
pub mod retry;
pub mod types;

pub use ollama::OllamaNarrative;
pub use retry::{generate_with_retry, RetryPolicy};
pub use types::{
    InsightSummary, MockNarrative, NarrativeCapability, NarrativeContext, NarrativeError, NarrativeInsight,
    NarrativeOutput, NoopNarrative, ReadingSummary,
};
