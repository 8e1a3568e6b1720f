//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use std::sync::Arc;
use study_planner_core::{
    domain::{DaySchedule, Importance, PlanRequest, PlanResponse, PlanSession, Preference, Subject},
    form::FeasibilityPolicy,
    ports::GenerationError,
};
use tracing::{error, warn};
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        generate_timetable_handler,
    ),
    components(
        schemas(PlanRequest, Subject, Preference, Importance, PlanResponse, DaySchedule, PlanSession, ErrorResponse)
    ),
    tags(
        (name = "Study Planner API", description = "Timetable generation endpoint for the campus portal.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The error payload returned for rejected or failed generation attempts.
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

fn reject(status: StatusCode, error: String) -> (StatusCode, Json<ErrorResponse>) {
    (status, Json(ErrorResponse { error }))
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Generate a weekly study timetable.
///
/// Validates the submitted constraints, resolves a generation backend, and
/// returns the structured 7-day plan. Pipeline failures collapse to a 500
/// with a flat `{error}` body; the detailed kind is logged server-side only.
#[utoipa::path(
    post,
    path = "/generate-timetable",
    request_body = PlanRequest,
    responses(
        (status = 200, description = "Timetable generated successfully", body = PlanResponse),
        (status = 400, description = "Request rejected before any generation call", body = ErrorResponse),
        (status = 500, description = "Generation pipeline failed", body = ErrorResponse)
    )
)]
pub async fn generate_timetable_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<PlanRequest>,
) -> Result<Json<PlanResponse>, (StatusCode, Json<ErrorResponse>)> {
    // The collector gate: gated-out input never reaches the synthesizer.
    if let Err(e) = request.validate() {
        return Err(reject(StatusCode::BAD_REQUEST, e.to_string()));
    }

    if let Some(shortfall) = request.min_hours_shortfall() {
        match app_state.config.feasibility_policy {
            FeasibilityPolicy::Reject => {
                return Err(reject(
                    StatusCode::BAD_REQUEST,
                    format!("declared minimum hours exceed the weekly budget by {shortfall}"),
                ));
            }
            FeasibilityPolicy::Warn => {
                warn!(shortfall, "minimum hours exceed the weekly budget; the plan may violate minimums");
            }
            FeasibilityPolicy::PassThrough => {}
        }
    }

    match app_state.planner.generate_plan(&request).await {
        Ok(plan) => Ok(Json(plan)),
        // The missing credential is the one failure reported verbatim.
        Err(e @ GenerationError::ConfigurationMissing(_)) => {
            error!("Timetable generation refused: {e}");
            Err(reject(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
        Err(e) => {
            error!("Timetable generation failed: {e}");
            Err(reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to generate timetable".to_string(),
            ))
        }
    }
}
