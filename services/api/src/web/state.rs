//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use std::sync::Arc;
use study_planner_core::ports::PlanGenerationService;

/// The shared application state, created once at startup and passed to all handlers.
///
/// Nothing here is mutable across requests; each generation attempt is
/// independent and stateless with respect to prior attempts.
#[derive(Clone)]
pub struct AppState {
    pub planner: Arc<dyn PlanGenerationService>,
    pub config: Arc<Config>,
}
