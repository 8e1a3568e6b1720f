pub mod rest;
pub mod state;

use crate::error::ApiError;
use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::post,
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub use rest::generate_timetable_handler;
use state::AppState;

/// Builds the API router shared by the server binary and the test suite.
pub fn api_router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = app_state
        .config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS origin: {e}")))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    Ok(Router::new()
        .route("/generate-timetable", post(generate_timetable_handler))
        .layer(cors)
        .with_state(app_state))
}
