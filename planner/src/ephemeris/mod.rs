//! Sky positions of catalogue sources.
//!
//! Every planning stage asks a [`PositionOracle`] for horizontal positions,
//! horizon crossings and sidereal time. Each query carries its own instant;
//! oracles hold no notion of a "current" time.
//!
//! - [`fixed_body`]: analytic oracle for fixed J2000 sources at one observatory
//! - [`cache`]: memoizing wrapper rebuilt for every refinement pass

pub mod cache;
pub mod fixed_body;

use qtty::{Degrees, Hours};
use serde::{Deserialize, Serialize};

use crate::core::domain::{HorizontalPosition, Source};
use crate::core::error::OracleError;
use crate::time::ModifiedJulianDate;

pub use cache::PositionCache;
pub use fixed_body::{FixedBodyOracle, Observatory};

/// Result of a rise or set query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HorizonCrossing {
    /// The crossing happens at this instant.
    At(ModifiedJulianDate),
    /// The source never gets above the horizon.
    NeverUp,
    /// The source never goes below the horizon.
    AlwaysUp,
}

/// Source of sky positions for one observatory.
pub trait PositionOracle {
    /// Azimuth/elevation of `source` at `at`.
    fn position_at(
        &self,
        source: &Source,
        at: ModifiedJulianDate,
    ) -> Result<HorizontalPosition, OracleError>;

    /// First instant after `after` at which `source` rises above `horizon`.
    fn next_rise(
        &self,
        source: &Source,
        horizon: Degrees,
        after: ModifiedJulianDate,
    ) -> Result<HorizonCrossing, OracleError>;

    /// First instant after `after` at which `source` sets below `horizon`.
    fn next_set(
        &self,
        source: &Source,
        horizon: Degrees,
        after: ModifiedJulianDate,
    ) -> Result<HorizonCrossing, OracleError>;

    /// Local sidereal time at `at`.
    fn sidereal_time(&self, at: ModifiedJulianDate) -> Hours;
}
