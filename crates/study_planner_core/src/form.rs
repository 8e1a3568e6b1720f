//! crates/study_planner_core/src/form.rs
//!
//! Explicit state for the constraint collector. The portal's subject form is
//! modeled as a plain value passed through pure resize/update calls, and the
//! same submission gate is applied to request bodies at the API boundary.

use crate::domain::{Importance, PlanRequest, Preference, Subject};

/// A single-field replacement carrying the new value.
#[derive(Debug, Clone, PartialEq)]
pub enum SubjectField {
    Name(String),
    Preference(Preference),
    Importance(Importance),
    MinHours(u32),
}

/// Why a form was refused at the submission gate.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("totalHours must be greater than zero")]
    TotalHoursNotPositive,
    #[error("at least one subject is required")]
    NoSubjects,
    #[error("declared minimum hours exceed the weekly budget by {shortfall}")]
    InfeasibleMinimums { shortfall: u32 },
}

/// What to do with a request whose summed minimum hours exceed the budget.
///
/// The portal historically passed such requests through and let the generator
/// violate minimums silently; the policy makes that an explicit choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeasibilityPolicy {
    /// Refuse the request before any generation call.
    Reject,
    /// Log a warning and proceed.
    #[default]
    Warn,
    /// Proceed silently.
    PassThrough,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown feasibility policy {0:?} (expected reject, warn, or pass)")]
pub struct ParseFeasibilityPolicyError(String);

impl std::str::FromStr for FeasibilityPolicy {
    type Err = ParseFeasibilityPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "warn" => Ok(Self::Warn),
            "pass" => Ok(Self::PassThrough),
            other => Err(ParseFeasibilityPolicyError(other.to_string())),
        }
    }
}

/// The weekly time budget and subject rows gathered before a generation
/// attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlannerForm {
    pub total_hours: u32,
    pub subjects: Vec<Subject>,
}

impl PlannerForm {
    pub fn new(total_hours: u32) -> Self {
        Self {
            total_hours,
            subjects: Vec::new(),
        }
    }

    /// Resizes the subject list to `n` entries, clamping `n` at zero.
    ///
    /// Existing entries are preserved by position; new tail entries get the
    /// form defaults and a fresh id each; shrinking truncates from the tail.
    pub fn set_subject_count(&mut self, n: i64) {
        let n = n.max(0) as usize;
        if n > self.subjects.len() {
            self.subjects.resize_with(n, Subject::with_defaults);
        } else {
            self.subjects.truncate(n);
        }
    }

    /// Replaces exactly one field of the subject matched by `id`.
    ///
    /// Returns `false` (a no-op) when no subject carries that id.
    pub fn update_subject(&mut self, id: &str, field: SubjectField) -> bool {
        let Some(subject) = self.subjects.iter_mut().find(|s| s.id == id) else {
            return false;
        };
        match field {
            SubjectField::Name(name) => subject.name = name,
            SubjectField::Preference(preference) => subject.preference = preference,
            SubjectField::Importance(importance) => subject.importance = importance,
            SubjectField::MinHours(min_hours) => subject.min_hours = min_hours,
        }
        true
    }

    /// The submission gate: yields a request only for a submittable form.
    ///
    /// No generation attempt is ever made from a gated-out form.
    pub fn into_request(self) -> Result<PlanRequest, ValidationError> {
        let request = PlanRequest {
            total_hours: self.total_hours,
            subjects: self.subjects,
        };
        request.validate()?;
        Ok(request)
    }
}

impl PlanRequest {
    /// The same gate applied to bodies arriving over the wire.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.total_hours == 0 {
            return Err(ValidationError::TotalHoursNotPositive);
        }
        if self.subjects.is_empty() {
            return Err(ValidationError::NoSubjects);
        }
        Ok(())
    }

    /// How far the summed per-subject minimums exceed the weekly budget, if
    /// they do. Feasible requests return `None`.
    pub fn min_hours_shortfall(&self) -> Option<u32> {
        let required: u32 = self.subjects.iter().map(|s| s.min_hours).sum();
        required
            .checked_sub(self.total_hours)
            .filter(|shortfall| *shortfall > 0)
    }
}
