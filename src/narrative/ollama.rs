use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::types::{NarrativeCapability, NarrativeContext, NarrativeError, NarrativeInsight, NarrativeOutput};
use crate::config::NarrativeSettings;

const SYSTEM_PROMPT: &str = "You interpret precomputed lab analysis results for a patient. \
Use only the readings and insights provided. Do not diagnose or prescribe. \
Respond with JSON only: {\"insights\":[{\"title\":string,\"summary\":string,\
\"severity\":\"normal\"|\"mild\"|\"moderate\"|\"severe\"|null,\"biomarkers\":[string],\
\"recommendations\":[string]}],\"confidence\":number between 0 and 1}";

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("valid fence pattern"));

/// Ollama-backed narrative capability.
pub struct OllamaNarrative {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout: Duration,
}

impl OllamaNarrative {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, NarrativeError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NarrativeError::Http(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            timeout,
        })
    }

    pub fn from_settings(settings: &NarrativeSettings) -> Result<Self, NarrativeError> {
        Self::new(&settings.base_url, &settings.model, settings.attempt_timeout())
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    format: &'a str,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct NarrativePayload {
    insights: Vec<NarrativeInsight>,
    #[serde(default)]
    confidence: f64,
}

impl NarrativeCapability for OllamaNarrative {
    fn generate(&self, context: &NarrativeContext) -> Result<NarrativeOutput, NarrativeError> {
        let start = Instant::now();
        let prompt = build_prompt(context)?;
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt: &prompt,
            system: SYSTEM_PROMPT,
            stream: false,
            format: "json",
        };

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_connect() {
                NarrativeError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                NarrativeError::Timeout(self.timeout.as_millis() as u64)
            } else {
                NarrativeError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(NarrativeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| NarrativeError::ResponseParsing(e.to_string()))?;
        let payload = parse_payload(&parsed.response)?;

        tracing::info!(
            model = %self.model,
            insights = payload.insights.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Narrative generated"
        );

        Ok(NarrativeOutput {
            insights: payload.insights,
            confidence: payload.confidence.clamp(0.0, 1.0),
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

fn build_prompt(context: &NarrativeContext) -> Result<String, NarrativeError> {
    let json = serde_json::to_string_pretty(context)
        .map_err(|e| NarrativeError::ResponseParsing(e.to_string()))?;
    Ok(format!("Analysis results:\n{json}\n\nWrite the narrative insights."))
}

/// Accepts bare JSON, a fenced block, or JSON embedded in prose.
fn parse_payload(text: &str) -> Result<NarrativePayload, NarrativeError> {
    let candidate = extract_json(text)
        .ok_or_else(|| NarrativeError::ResponseParsing("no JSON object in response".into()))?;
    serde_json::from_str(candidate).map_err(|e| NarrativeError::ResponseParsing(e.to_string()))
}

fn extract_json(text: &str) -> Option<&str> {
    if let Some(captures) = JSON_FENCE.captures(text) {
        return captures.get(1).map(|m| m.as_str());
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
