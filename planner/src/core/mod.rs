//! Core domain models for visit planning.
//!
//! This module defines the data structures shared by every planning stage:
//! sources and catalogues, observing windows, segments, visits and schedule
//! entries, together with the planning parameters and error types.

pub mod domain;
pub mod error;
pub mod params;

pub use domain::{
    AchievedSpan, Catalogue, EntryKind, HorizontalPosition, ObservingBlock, ObservingWindow,
    PositionRef, ScheduleEntry, Segment, Source, Visit, VisitLedger,
};
pub use error::{OracleError, PlannerError, PlannerResult, SequencerError};
pub use params::PlanningParameters;
