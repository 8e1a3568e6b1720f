//! crates/study_planner_core/src/domain.rs
//!
//! Defines the pure, core data structures for the timetable planner.
//! These structs double as the wire contract: the request side keeps the
//! portal's camelCase field names, the response side is the snake_case shape
//! the generation backend is instructed to produce.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Affective ranking for a subject. Biases time-of-day placement in the
/// generated plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Preference {
    Love,
    Like,
    #[default]
    Neutral,
    Dislike,
    Hate,
}

/// Priority ranking for a subject. Biases total allocated time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

/// One row of study-planning input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    /// Opaque unique identifier, stable for the lifetime of the form session.
    pub id: String,
    pub name: String,
    pub preference: Preference,
    pub importance: Importance,
    /// Minimum weekly hours the plan must allocate to this subject.
    pub min_hours: u32,
}

impl Subject {
    /// A blank subject row with the form defaults and a fresh id.
    pub fn with_defaults() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: String::new(),
            preference: Preference::Neutral,
            importance: Importance::Medium,
            min_hours: 1,
        }
    }
}

/// The validated input to a single timetable-generation attempt.
///
/// Constructed fresh per attempt and discarded after the response is received
/// or the call fails; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub total_hours: u32,
    pub subjects: Vec<Subject>,
}

/// One unit of a day's plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlanSession {
    /// "HH:MM - HH:MM".
    pub time_slot: String,
    /// Matches a `Subject.name` from the request.
    pub subject: String,
    pub focus_topic: String,
    pub duration_mins: u32,
}

/// The plan for a single weekday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DaySchedule {
    pub day: String,
    pub total_hours: f64,
    pub sessions: Vec<PlanSession>,
}

/// The structured weekly schedule returned by a generation attempt.
///
/// Seven `schedule` entries are expected but not enforced here; the generator
/// is trusted for conformance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlanResponse {
    pub strategy_summary: String,
    pub schedule: Vec<DaySchedule>,
}
