//! crates/study_planner_core/src/ports.rs
//!
//! Defines the service contract (trait) for plan generation and the error
//! taxonomy of a generation attempt. The trait forms the boundary of the
//! hexagonal architecture, keeping the core independent of the concrete
//! generative-language API behind it.

use std::fmt;

use async_trait::async_trait;

use crate::domain::{PlanRequest, PlanResponse};

/// Where a generation attempt was when it failed.
///
/// An attempt moves `ResolvingBackend -> GeneratingContent -> ParsingResponse`
/// and ends in success or a terminal failure; a new attempt starts over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationPhase {
    ResolvingBackend,
    GeneratingContent,
    ParsingResponse,
}

impl fmt::Display for GenerationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ResolvingBackend => "resolving backend",
            Self::GeneratingContent => "generating content",
            Self::ParsingResponse => "parsing response",
        };
        f.write_str(label)
    }
}

/// Everything that can sink a single generation attempt.
///
/// None of these are retried; the caller resubmits manually.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The required credential is absent. Fails before any outbound call.
    #[error("{0} is not defined")]
    ConfigurationMissing(String),

    /// The provider exposes no model supporting content generation.
    #[error("no text-generation models available for this API key")]
    NoCapableModel,

    /// An outbound call returned a non-success status or failed in transport.
    #[error("upstream call failed while {phase}: {detail}")]
    UpstreamUnavailable {
        phase: GenerationPhase,
        detail: String,
    },

    /// An outbound call exceeded the configured deadline.
    #[error("upstream call timed out while {phase}")]
    UpstreamTimeout { phase: GenerationPhase },

    /// The provider replied, but with no usable text payload.
    #[error("no text returned by the generation backend")]
    EmptyGeneration,

    /// The text payload did not decode into the plan shape. The whole
    /// response is discarded; no partial schedule is ever returned.
    #[error("generated plan is not valid JSON: {0}")]
    MalformedPlan(#[from] serde_json::Error),

    /// Server shutdown aborted the attempt mid-flight.
    #[error("generation attempt cancelled by shutdown")]
    Cancelled,
}

/// A convenience type alias for `Result<T, GenerationError>`.
pub type GenerationResult<T> = Result<T, GenerationError>;

#[async_trait]
pub trait PlanGenerationService: Send + Sync {
    /// Runs one full generation attempt: resolve a backend from the live
    /// model list, issue exactly one generation call, decode the reply.
    async fn generate_plan(&self, request: &PlanRequest) -> GenerationResult<PlanResponse>;
}
