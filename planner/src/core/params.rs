//! Per-run planning parameters.

use qtty::{Degrees, Minute, Minutes, Second, Seconds};
use serde::{Deserialize, Serialize};

use super::domain::ObservingBlock;
use super::error::{PlannerError, PlannerResult};
use crate::config::PlannerConfig;

/// Correlator cycles added to every visit for slewing and settling.
pub const OVERHEAD_CYCLES: usize = 2;

/// Everything a planning run needs besides the catalogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningParameters {
    pub block: ObservingBlock,
    /// Visits required per source.
    pub n_visits: usize,
    /// On-source time of one visit.
    pub visit_duration: Minutes,
    /// Minimum time between two visits of the same source.
    pub min_spacing: Minutes,
    pub min_elevation: Degrees,
    /// Correlator cycle time.
    pub cycle_time: Seconds,
    /// Minimum slew between any two seeds.
    pub min_seed_separation: Seconds,
    /// Maximum slew between the seeds of neighbouring segments.
    pub max_seed_adjacency: Seconds,
    /// Total slop below which refinement stops.
    pub slop_tolerance: Seconds,
    /// Source offered as the first seed, ahead of the most constrained one.
    #[serde(default)]
    pub start_source: Option<String>,
}

impl PlanningParameters {
    /// Builds parameters for `block`, taking everything not given here from `config`.
    pub fn from_config(
        block: ObservingBlock,
        n_visits: usize,
        visit_duration: Minutes,
        min_spacing: Minutes,
        config: &PlannerConfig,
    ) -> Self {
        let planning = &config.planning;
        Self {
            block,
            n_visits,
            visit_duration,
            min_spacing,
            min_elevation: Degrees::new(planning.min_elevation_deg),
            cycle_time: Seconds::new(planning.cycle_time_s),
            min_seed_separation: Seconds::new(planning.min_seed_separation_s),
            max_seed_adjacency: Seconds::new(planning.max_seed_adjacency_s),
            slop_tolerance: Seconds::new(planning.slop_tolerance_s),
            start_source: None,
        }
    }

    /// Starts the plan with `name` as the first seed.
    pub fn with_start_source(mut self, name: impl Into<String>) -> Self {
        self.start_source = Some(name.into());
        self
    }

    /// Rejects parameter sets the planner cannot work with.
    pub fn validate(&self) -> PlannerResult<()> {
        if self.n_visits == 0 {
            return Err(PlannerError::InvalidParameter(
                "visit count must be at least 1".to_string(),
            ));
        }
        let positive = [
            ("visit duration", self.visit_duration.to::<Second>().value()),
            ("minimum spacing", self.min_spacing.to::<Second>().value()),
            ("cycle time", self.cycle_time.value()),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(PlannerError::InvalidParameter(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        let non_negative = [
            ("minimum seed separation", self.min_seed_separation.value()),
            ("maximum seed adjacency", self.max_seed_adjacency.value()),
            ("slop tolerance", self.slop_tolerance.value()),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(PlannerError::InvalidParameter(format!(
                    "{} must not be negative, got {}",
                    name, value
                )));
            }
        }
        let elevation = self.min_elevation.value();
        if !(-90.0..90.0).contains(&elevation) {
            return Err(PlannerError::InvalidParameter(format!(
                "minimum elevation must lie in [-90, 90) degrees, got {}",
                elevation
            )));
        }
        Ok(())
    }

    /// Visit duration plus the overhead cycles.
    pub fn per_visit_duration(&self) -> Seconds {
        self.visit_duration.to::<Second>() + self.cycle_time * OVERHEAD_CYCLES as f64
    }

    /// Width of one segment, half the minimum spacing.
    pub fn segment_width(&self) -> Seconds {
        self.min_spacing.to::<Second>() / 2.0
    }

    /// Correlator cycles needed to cover one visit.
    pub fn cycle_count(&self) -> usize {
        let cycles = self.visit_duration.to::<Second>().value() / self.cycle_time.value();
        cycles.ceil().max(1.0) as usize
    }

    pub fn min_spacing_seconds(&self) -> Seconds {
        self.min_spacing.to::<Second>()
    }

    pub fn visit_duration_minutes(&self) -> f64 {
        self.visit_duration.to::<Minute>().value()
    }
}
