//! Visibility culling of the catalogue.
//!
//! Two culls run in sequence. The first drops sources that are down at the
//! window start and do not rise early enough to finish one visit before the
//! window ends. The second drops
//! sources whose total time above the elevation limit inside the window is
//! too short to collect their visits.

use std::fmt;

use qtty::{Degrees, Minute, Seconds};
use serde::{Deserialize, Serialize};

use crate::core::domain::{ObservingWindow, Source};
use crate::core::error::OracleError;
use crate::core::params::PlanningParameters;
use crate::ephemeris::{HorizonCrossing, PositionOracle};
use crate::time::ModifiedJulianDate;

/// Upper bound on rise/set alternations per source.
const MAX_CROSSINGS: usize = 1_000;

/// Why a source left the active pool before planning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RemovalReason {
    /// Never above the elevation limit.
    NeverRises,
    /// Down at the window start, rising too close to the window end for a visit.
    RisesTooLate { rise: ModifiedJulianDate },
    /// Up for less than the time its visits need.
    InsufficientTimeUp { time_up: Seconds, required: Seconds },
    /// The position oracle could not answer for this source.
    OracleFailure { message: String },
}

impl fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalReason::NeverRises => write!(f, "never rises above the elevation limit"),
            RemovalReason::RisesTooLate { rise } => write!(f, "rises too late ({})", rise),
            RemovalReason::InsufficientTimeUp { time_up, required } => write!(
                f,
                "up for {:.1} min, needs {:.1} min",
                time_up.to::<Minute>().value(),
                required.to::<Minute>().value()
            ),
            RemovalReason::OracleFailure { message } => write!(f, "oracle failure: {}", message),
        }
    }
}

/// A culled source and the reason it was culled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovedSource {
    pub name: String,
    #[serde(flatten)]
    pub reason: RemovalReason,
}

/// Survivors and removals of a cull.
#[derive(Debug, Clone, Default)]
pub struct VisibilityOutcome {
    pub survivors: Vec<Source>,
    pub removed: Vec<RemovedSource>,
}

impl VisibilityOutcome {
    fn remove(&mut self, source: &Source, reason: RemovalReason) {
        log::warn!("Removing source {}: {}", source.name, reason);
        self.removed.push(RemovedSource {
            name: source.name.clone(),
            reason,
        });
    }
}

/// Thresholds for both culls.
#[derive(Debug, Clone, Copy)]
pub struct VisibilityCriteria {
    pub min_elevation: Degrees,
    /// Length of one visit including overhead; a later rise leaves no room for it.
    pub visit_duration: Seconds,
    /// Minimum time above the elevation limit inside the window.
    pub required_time_up: Seconds,
    /// Fraction of the limit used when searching for a set.
    pub set_hysteresis: f64,
    /// Fraction of the limit used when searching for a rise.
    pub rise_hysteresis: f64,
}

impl VisibilityCriteria {
    /// Requires `margin * n_visits * (per_visit + min_spacing)` above the limit.
    pub fn from_params(params: &PlanningParameters, margin: f64) -> Self {
        let per_source = params.per_visit_duration() + params.min_spacing_seconds();
        Self {
            min_elevation: params.min_elevation,
            visit_duration: params.per_visit_duration(),
            required_time_up: per_source * (margin * params.n_visits as f64),
            set_hysteresis: 0.99,
            rise_hysteresis: 1.01,
        }
    }

    pub fn with_hysteresis(mut self, set: f64, rise: f64) -> Self {
        self.set_hysteresis = set;
        self.rise_hysteresis = rise;
        self
    }
}

/// Drops sources that are down at the window start and do not rise in time
/// to complete a visit before the window end.
pub fn cull_unrisen(
    sources: &[Source],
    window: &ObservingWindow,
    criteria: &VisibilityCriteria,
    oracle: &dyn PositionOracle,
) -> VisibilityOutcome {
    let mut outcome = VisibilityOutcome::default();
    for source in sources {
        match rises_in_window(source, window, criteria, oracle) {
            Ok(None) => outcome.survivors.push(source.clone()),
            Ok(Some(reason)) => outcome.remove(source, reason),
            Err(e) => outcome.remove(
                source,
                RemovalReason::OracleFailure {
                    message: e.to_string(),
                },
            ),
        }
    }
    outcome
}

fn rises_in_window(
    source: &Source,
    window: &ObservingWindow,
    criteria: &VisibilityCriteria,
    oracle: &dyn PositionOracle,
) -> Result<Option<RemovalReason>, OracleError> {
    if oracle
        .position_at(source, window.start)?
        .is_above(criteria.min_elevation)
    {
        return Ok(None);
    }
    Ok(
        match oracle.next_rise(source, criteria.min_elevation, window.start)? {
            HorizonCrossing::NeverUp => Some(RemovalReason::NeverRises),
            HorizonCrossing::AlwaysUp => None,
            HorizonCrossing::At(rise)
                if rise.add_seconds(criteria.visit_duration).value() >= window.end.value() =>
            {
                Some(RemovalReason::RisesTooLate { rise })
            }
            HorizonCrossing::At(_) => None,
        },
    )
}

/// Total time `source` spends above the limit inside `window`.
///
/// Rise and set searches alternate from the window start, using the
/// hysteresis-adjusted limits so a source grazing the limit does not flicker.
pub fn time_above_horizon(
    source: &Source,
    window: &ObservingWindow,
    criteria: &VisibilityCriteria,
    oracle: &dyn PositionOracle,
) -> Result<Seconds, OracleError> {
    let set_limit = criteria.min_elevation * criteria.set_hysteresis;
    let rise_limit = criteria.min_elevation * criteria.rise_hysteresis;

    let mut total = Seconds::new(0.0);
    let mut at = window.start;
    let mut up = oracle
        .position_at(source, at)?
        .is_above(criteria.min_elevation);

    for _ in 0..MAX_CROSSINGS {
        if at.value() >= window.end.value() {
            break;
        }
        if up {
            match oracle.next_set(source, set_limit, at)? {
                HorizonCrossing::At(set) => {
                    total += set.min(window.end).seconds_since(at);
                    at = set;
                    up = false;
                }
                HorizonCrossing::AlwaysUp => {
                    total += window.end.seconds_since(at);
                    break;
                }
                HorizonCrossing::NeverUp => break,
            }
        } else {
            match oracle.next_rise(source, rise_limit, at)? {
                HorizonCrossing::At(rise) => {
                    at = rise;
                    up = true;
                }
                HorizonCrossing::AlwaysUp => {
                    total += window.end.seconds_since(at);
                    break;
                }
                HorizonCrossing::NeverUp => break,
            }
        }
    }
    Ok(total)
}

/// Drops sources that are not up long enough to collect their visits.
pub fn cull_insufficient_time(
    sources: &[Source],
    window: &ObservingWindow,
    criteria: &VisibilityCriteria,
    oracle: &dyn PositionOracle,
) -> VisibilityOutcome {
    let mut outcome = VisibilityOutcome::default();
    for source in sources {
        match time_above_horizon(source, window, criteria, oracle) {
            Ok(time_up) if time_up.value() >= criteria.required_time_up.value() => {
                outcome.survivors.push(source.clone())
            }
            Ok(time_up) => outcome.remove(
                source,
                RemovalReason::InsufficientTimeUp {
                    time_up,
                    required: criteria.required_time_up,
                },
            ),
            Err(e) => outcome.remove(
                source,
                RemovalReason::OracleFailure {
                    message: e.to_string(),
                },
            ),
        }
    }
    outcome
}

/// Runs both culls in order.
pub fn filter_catalogue(
    sources: &[Source],
    window: &ObservingWindow,
    criteria: &VisibilityCriteria,
    oracle: &dyn PositionOracle,
) -> VisibilityOutcome {
    let risen = cull_unrisen(sources, window, criteria, oracle);
    let mut outcome = cull_insufficient_time(&risen.survivors, window, criteria, oracle);
    let mut removed = risen.removed;
    removed.append(&mut outcome.removed);
    outcome.removed = removed;

    log::info!(
        "Visibility filter kept {} of {} sources ({} removed)",
        outcome.survivors.len(),
        sources.len(),
        outcome.removed.len()
    );
    outcome
}
