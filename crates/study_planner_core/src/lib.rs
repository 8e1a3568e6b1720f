pub mod domain;
pub mod form;
pub mod ports;

pub use domain::{DaySchedule, Importance, PlanRequest, PlanResponse, PlanSession, Preference, Subject};
pub use form::{FeasibilityPolicy, PlannerForm, SubjectField, ValidationError};
pub use ports::{GenerationError, GenerationPhase, GenerationResult, PlanGenerationService};
