//! # Visit Planner
//!
//! Segmented mosaic schedule planning for a single fixed radio telescope.
//!
//! Given a catalogue of sky sources, an observing block and per-source visit
//! requirements (visit count, visit duration, minimum revisit spacing), the
//! planner produces a time-ordered list of pointings that respects source
//! visibility, antenna slew kinematics and revisit spacing while keeping idle
//! time between segments ("slop") low.
//!
//! ## Pipeline
//!
//! 1. [`algorithms::visibility`]: cull sources that never rise inside the window
//!    or are not up long enough to collect their visits.
//! 2. [`algorithms::segmenter`]: partition the window into fixed-width segments
//!    and record which sources are up in each.
//! 3. [`algorithms::seeding`]: greedily assign a seed source to segments,
//!    most-constrained source first.
//! 4. [`algorithms::companions`]: pick companion sources around each seed under
//!    a slew-time budget and hand them to a [`algorithms::sequencer::SegmentSequencer`].
//! 5. [`algorithms::refinement`]: repeat step 4, growing the slew budget of
//!    segments that leave too much slop, until the slop is within tolerance.
//! 6. [`services::emitter`]: build the public schedule and its report.
//!
//! [`services::planner::plan`] runs the whole pipeline.
//!
//! ## Collaborators
//!
//! Sky positions come from a [`ephemeris::PositionOracle`]. The crate ships an
//! analytic [`ephemeris::FixedBodyOracle`] for fixed J2000 sources, and a
//! nearest-neighbour [`algorithms::sequencer::NearestNeighbourSequencer`].
//! Both can be replaced by any implementation of the traits.

pub mod algorithms;
pub mod config;
pub mod core;
pub mod ephemeris;
pub mod io;
pub mod parsing;
pub mod services;
pub mod time;

pub use crate::config::PlannerConfig;
pub use crate::core::domain::{
    Catalogue, HorizontalPosition, ObservingBlock, ObservingWindow, Source,
};
pub use crate::core::error::{PlannerError, PlannerResult};
pub use crate::core::params::PlanningParameters;
pub use crate::services::planner::{plan, PlanOutput};
pub use crate::time::ModifiedJulianDate;
