//! services/api/src/adapters/gemini.rs
//!
//! This module contains the adapter for the Gemini generative-language API.
//! It implements the `PlanGenerationService` port from the `core` crate:
//! resolve a capable model from the provider's live model list, issue exactly
//! one generation call, and decode the textual reply into a typed plan.

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use study_planner_core::{
    domain::{PlanRequest, PlanResponse},
    ports::{GenerationError, GenerationPhase, GenerationResult, PlanGenerationService},
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Environment variable holding the generation credential. Its absence fails
/// every request before any outbound call is attempted.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Generation method a listed model must declare to be considered capable.
const GENERATE_CONTENT: &str = "generateContent";

//=========================================================================================
// Provider Wire Types
//=========================================================================================

#[derive(Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

/// One entry of the provider's model listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Fully-qualified name, e.g. "models/gemini-1.5-flash".
    pub name: String,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

//=========================================================================================
// Pure Policy and Parsing Helpers
//=========================================================================================

/// Picks which model serves a request.
///
/// Capable models only; then first match wins: name containing "flash", else
/// name containing "pro", else the first capable entry in provider order.
pub fn select_model(models: &[ModelInfo]) -> Option<&ModelInfo> {
    let capable: Vec<&ModelInfo> = models
        .iter()
        .filter(|m| {
            m.supported_generation_methods
                .iter()
                .any(|method| method == GENERATE_CONTENT)
        })
        .collect();

    capable
        .iter()
        .find(|m| m.name.contains("flash"))
        .or_else(|| capable.iter().find(|m| m.name.contains("pro")))
        .or_else(|| capable.first())
        .copied()
}

/// Builds the single instruction block sent to the generator.
fn build_prompt(request: &PlanRequest) -> String {
    let subjects =
        serde_json::to_string(&request.subjects).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"Act as an expert academic planner. Create a weekly study timetable.

Constraints:
- Total Weekly Hours: {total_hours}
- Subjects: {subjects}

Instructions:
1. Distribute hours across 7 days.
2. Respect 'minHours' for each subject.
3. Prioritize 'critical' importance subjects.
4. Schedule 'hate' preference subjects earlier in the day.
5. Provide a 'focus_topic' suggestion for every session.

CRITICAL OUTPUT FORMAT:
You must output ONLY valid JSON. Do not include markdown formatting (like ```json).
The JSON structure must exactly match this example:
{{
  "strategy_summary": "Explanation of how the plan was built...",
  "schedule": [
    {{
      "day": "Monday",
      "total_hours": 4,
      "sessions": [
        {{
          "time_slot": "09:00 - 10:00",
          "subject": "Math",
          "focus_topic": "Algebra",
          "duration_mins": 60
        }}
      ]
    }}
  ]
}}"#,
        total_hours = request.total_hours,
        subjects = subjects,
    )
}

/// Strips the code-fence markers models add despite instructions.
///
/// Only leading/trailing fences are treated as noise; the body is untouched.
fn strip_code_fences(text: &str) -> String {
    let opening = Regex::new(r"^```[A-Za-z0-9_-]*[ \t]*\r?\n?").unwrap();
    let closing = Regex::new(r"\r?\n?```\s*$").unwrap();

    let trimmed = text.trim();
    let without_opening = opening.replace(trimmed, "");
    let without_closing = closing.replace(&without_opening, "");
    without_closing.trim().to_string()
}

/// Decodes the generator's textual reply into a typed plan.
///
/// Missing fields and wrong types fail closed; nothing partially-populated
/// ever leaves this function.
fn parse_plan(raw: &str) -> GenerationResult<PlanResponse> {
    let cleaned = strip_code_fences(raw);
    Ok(serde_json::from_str::<PlanResponse>(&cleaned)?)
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `PlanGenerationService` against the Gemini
/// REST API.
#[derive(Clone)]
pub struct GeminiPlanAdapter {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
    /// Fired on server shutdown; aborts in-flight upstream calls.
    shutdown: CancellationToken,
}

impl GeminiPlanAdapter {
    /// Creates a new `GeminiPlanAdapter`.
    pub fn new(
        api_key: Option<String>,
        base_url: String,
        timeout: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            shutdown,
        }
    }

    /// Sends one request under the configured deadline and shutdown token,
    /// then decodes the JSON body.
    async fn call<T: DeserializeOwned>(
        &self,
        phase: GenerationPhase,
        request: reqwest::RequestBuilder,
    ) -> GenerationResult<T> {
        let round_trip = async {
            let response = request.send().await.map_err(|e| {
                if e.is_timeout() {
                    GenerationError::UpstreamTimeout { phase }
                } else {
                    // `without_url` keeps the keyed query string out of logs.
                    GenerationError::UpstreamUnavailable {
                        phase,
                        detail: e.without_url().to_string(),
                    }
                }
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(GenerationError::UpstreamUnavailable {
                    phase,
                    detail: format!("HTTP {status}"),
                });
            }

            response
                .json::<T>()
                .await
                .map_err(|e| GenerationError::UpstreamUnavailable {
                    phase,
                    detail: e.without_url().to_string(),
                })
        };

        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(GenerationError::Cancelled),
            outcome = tokio::time::timeout(self.timeout, round_trip) => match outcome {
                Err(_) => Err(GenerationError::UpstreamTimeout { phase }),
                Ok(result) => result,
            },
        }
    }

    /// Queries the models available to the caller's credentials. Re-resolved
    /// on every request; availability is account- and time-dependent.
    async fn list_models(&self, api_key: &str) -> GenerationResult<Vec<ModelInfo>> {
        let url = format!("{}/models?key={}", self.base_url, api_key);
        let listing: ModelsResponse = self
            .call(GenerationPhase::ResolvingBackend, self.http.get(url))
            .await?;
        Ok(listing.models)
    }

    /// Issues the single generation call and extracts its text payload.
    async fn generate_content(
        &self,
        api_key: &str,
        model: &str,
        prompt: &str,
    ) -> GenerationResult<String> {
        // Listed names already carry the "models/" prefix; the generate
        // endpoint is that name with ":generateContent" appended.
        let url = format!("{}/{}:generateContent?key={}", self.base_url, model, api_key);
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig { temperature: 0.7 },
        };

        let reply: GenerateResponse = self
            .call(
                GenerationPhase::GeneratingContent,
                self.http.post(url).json(&body),
            )
            .await?;

        reply
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or(GenerationError::EmptyGeneration)
    }
}

//=========================================================================================
// `PlanGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl PlanGenerationService for GeminiPlanAdapter {
    async fn generate_plan(&self, request: &PlanRequest) -> GenerationResult<PlanResponse> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| GenerationError::ConfigurationMissing(API_KEY_VAR.to_string()))?;

        debug!(phase = %GenerationPhase::ResolvingBackend, "listing available models");
        let models = self.list_models(api_key).await?;
        let model = select_model(&models).ok_or(GenerationError::NoCapableModel)?;

        debug!(phase = %GenerationPhase::GeneratingContent, model = %model.name, "auto-selected model");
        let prompt = build_prompt(request);
        let raw = self.generate_content(api_key, &model.name, &prompt).await?;

        debug!(phase = %GenerationPhase::ParsingResponse, "decoding generated plan");
        parse_plan(&raw)
    }
}

//=========================================================================================
// Tests
//=========================================================================================
