//! Scripted oracle for unit tests.

use std::collections::{HashMap, HashSet};

use qtty::{Degrees, Hours};

use crate::core::domain::{HorizontalPosition, Source};
use crate::core::error::OracleError;
use crate::ephemeris::{HorizonCrossing, PositionOracle};
use crate::time::{ModifiedJulianDate, SIDEREAL_RATE};

/// Elevation reported while a scripted source is down.
pub const DOWN_ELEVATION: f64 = -10.0;

#[derive(Debug, Clone)]
enum Sky {
    AlwaysUp,
    NeverUp,
    /// Sorted, disjoint `[rise, set)` intervals in MJD.
    Intervals(Vec<(f64, f64)>),
}

#[derive(Debug, Clone)]
struct Script {
    position: HorizontalPosition,
    sky: Sky,
}

/// Oracle with hand-written positions and up intervals.
///
/// Each source keeps a fixed azimuth/elevation while up and drops to
/// [`DOWN_ELEVATION`] while down. The horizon argument of rise/set queries is
/// ignored. Sidereal time runs at the sidereal rate from MJD 0.
#[derive(Debug, Clone, Default)]
pub struct ScriptedOracle {
    scripts: HashMap<String, Script>,
    failing: HashSet<String>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn always_up(mut self, name: &str, az: f64, el: f64) -> Self {
        self.scripts.insert(
            name.to_string(),
            Script {
                position: HorizontalPosition::new(az, el),
                sky: Sky::AlwaysUp,
            },
        );
        self
    }

    pub fn never_up(mut self, name: &str) -> Self {
        self.scripts.insert(
            name.to_string(),
            Script {
                position: HorizontalPosition::new(0.0, DOWN_ELEVATION),
                sky: Sky::NeverUp,
            },
        );
        self
    }

    pub fn up_between(mut self, name: &str, az: f64, el: f64, intervals: &[(f64, f64)]) -> Self {
        let mut intervals = intervals.to_vec();
        intervals.sort_by(|a, b| a.0.total_cmp(&b.0));
        self.scripts.insert(
            name.to_string(),
            Script {
                position: HorizontalPosition::new(az, el),
                sky: Sky::Intervals(intervals),
            },
        );
        self
    }

    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    fn script(&self, source: &Source) -> Result<&Script, OracleError> {
        if self.failing.contains(&source.name) {
            return Err(OracleError::ServiceUnavailable(format!(
                "scripted failure for {}",
                source.name
            )));
        }
        self.scripts
            .get(&source.name)
            .ok_or_else(|| OracleError::UnknownSource(source.name.clone()))
    }
}

impl PositionOracle for ScriptedOracle {
    fn position_at(
        &self,
        source: &Source,
        at: ModifiedJulianDate,
    ) -> Result<HorizontalPosition, OracleError> {
        let script = self.script(source)?;
        let t = at.value();
        let up = match &script.sky {
            Sky::AlwaysUp => true,
            Sky::NeverUp => false,
            Sky::Intervals(intervals) => intervals.iter().any(|&(rise, set)| t >= rise && t < set),
        };
        if up {
            Ok(script.position)
        } else {
            Ok(HorizontalPosition {
                azimuth: script.position.azimuth,
                elevation: Degrees::new(DOWN_ELEVATION),
            })
        }
    }

    fn next_rise(
        &self,
        source: &Source,
        _horizon: Degrees,
        after: ModifiedJulianDate,
    ) -> Result<HorizonCrossing, OracleError> {
        let script = self.script(source)?;
        Ok(match &script.sky {
            Sky::AlwaysUp => HorizonCrossing::AlwaysUp,
            Sky::NeverUp => HorizonCrossing::NeverUp,
            Sky::Intervals(intervals) => intervals
                .iter()
                .find(|&&(rise, _)| rise > after.value())
                .map_or(HorizonCrossing::NeverUp, |&(rise, _)| {
                    HorizonCrossing::At(ModifiedJulianDate::new(rise))
                }),
        })
    }

    fn next_set(
        &self,
        source: &Source,
        _horizon: Degrees,
        after: ModifiedJulianDate,
    ) -> Result<HorizonCrossing, OracleError> {
        let script = self.script(source)?;
        Ok(match &script.sky {
            Sky::AlwaysUp => HorizonCrossing::AlwaysUp,
            Sky::NeverUp => HorizonCrossing::NeverUp,
            Sky::Intervals(intervals) => intervals
                .iter()
                .find(|&&(_, set)| set > after.value())
                .map_or(HorizonCrossing::NeverUp, |&(_, set)| {
                    HorizonCrossing::At(ModifiedJulianDate::new(set))
                }),
        })
    }

    fn sidereal_time(&self, at: ModifiedJulianDate) -> Hours {
        Hours::new((at.value() * 24.0 * SIDEREAL_RATE).rem_euclid(24.0))
    }
}

/// Source stub for scripted tests; only the name matters.
pub fn source(name: &str) -> Source {
    Source::new(name, 0.0, 0.0)
}
