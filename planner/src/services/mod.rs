//! Service layer: orchestration of the planning stages and their outputs.
//!
//! - [`planner`]: end-to-end run from catalogue to schedule
//! - [`emitter`]: schedule entries and the run report
//! - [`validation`]: independent checks of the final schedule

pub mod emitter;
pub mod planner;
pub mod validation;

pub use emitter::{PlanReport, Schedule, UnseededSegment};
pub use planner::{plan, residual_sources, PlanOutput};
pub use validation::{validate_schedule, IssueCategory, ValidationIssue};
