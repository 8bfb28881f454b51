//! Scheduling algorithms.
//!
//! This module holds the planning stages proper, leaves first:
//!
//! - [`slew`]: Antenna slew-time model
//! - [`visibility`]: Never-rises and insufficient-time culls
//! - [`segmenter`]: Fixed-width partition of the observing window
//! - [`seeding`]: Greedy most-constrained-first seed assignment
//! - [`sequencer`]: Visiting order inside one segment
//! - [`companions`]: Companion selection under a slew budget
//! - [`refinement`]: Slop-driven budget refinement loop

pub mod companions;
pub mod refinement;
pub mod seeding;
pub mod segmenter;
pub mod sequencer;
pub mod slew;
pub mod visibility;

#[cfg(test)]
pub(crate) mod test_support;


pub use companions::{segment_capacity, CompanionSelector};
pub use refinement::{BoundarySlop, RefinementOutcome, RefinementSettings, Refiner};
pub use seeding::{assign_seeds, SeedOutcome, SeedingCriteria, SeedingReport};
pub use segmenter::partition_window;
pub use sequencer::{NearestNeighbourSequencer, SegmentSequencer, SequenceRequest, SequencedSegment};
pub use slew::{slew_time, SlewModel};
pub use visibility::{filter_catalogue, RemovalReason, RemovedSource, VisibilityCriteria};
