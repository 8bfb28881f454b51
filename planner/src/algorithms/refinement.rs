//! Iterative slop refinement.
//!
//! A pass sequences every seeded segment in time order. Between two
//! consecutive sequenced segments the antenna needs only the slew from the
//! last source of one to the first source of the next; any further idle time
//! is slop, including time spent over unseeded segments in between.
//! Boundaries with large slop grow the slew budget of the earlier segment,
//! which lets it take more companions on the next pass.

use std::collections::BTreeSet;

use qtty::Seconds;
use serde::{Deserialize, Serialize};

use super::companions::CompanionSelector;
use super::sequencer::SegmentSequencer;
use super::slew::SlewModel;
use crate::core::domain::{Segment, Source, VisitLedger};
use crate::core::error::{OracleError, SequencerError};
use crate::core::params::PlanningParameters;
use crate::ephemeris::{PositionCache, PositionOracle};
use crate::time::{sidereal_gap, sidereal_to_solar, ModifiedJulianDate};

/// Tuning of the refinement loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefinementSettings {
    /// Share of a segment reserved for slewing.
    #[serde(default = "default_overhead_fraction")]
    pub overhead_fraction: f64,
    /// Share of a segment available for visits.
    #[serde(default = "default_integration_fraction")]
    pub integration_fraction: f64,
    /// Boundary slop above which a segment's budget grows, seconds.
    #[serde(default = "default_slop_trigger")]
    pub slop_trigger_s: f64,
    /// Budget added per trigger-worth of slop, seconds.
    #[serde(default = "default_budget_growth")]
    pub budget_growth_s: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

fn default_overhead_fraction() -> f64 {
    0.15
}

fn default_integration_fraction() -> f64 {
    0.85
}

fn default_slop_trigger() -> f64 {
    120.0
}

fn default_budget_growth() -> f64 {
    60.0
}

fn default_max_iterations() -> usize {
    25
}

impl Default for RefinementSettings {
    fn default() -> Self {
        Self {
            overhead_fraction: default_overhead_fraction(),
            integration_fraction: default_integration_fraction(),
            slop_trigger_s: default_slop_trigger(),
            budget_growth_s: default_budget_growth(),
            max_iterations: default_max_iterations(),
        }
    }
}

/// Slop at the boundary between two consecutive sequenced segments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundarySlop {
    pub earlier: usize,
    pub later: usize,
    /// Sidereal gap between the achieved end and the next achieved start.
    pub gap: Seconds,
    /// Slew from the last source of `earlier` to the first of `later`.
    pub slew: Seconds,
    pub slop: Seconds,
}

/// A segment that lost its seed during a pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentFailure {
    pub index: usize,
    pub seed: String,
    pub reason: String,
}

/// Result of one pass over the segments.
#[derive(Debug, Clone)]
pub struct PassResult {
    pub boundaries: Vec<BoundarySlop>,
    pub total_slop: Seconds,
    pub failures: Vec<SegmentFailure>,
    pub ledger: VisitLedger,
}

/// Result of the whole loop.
#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    /// The last pass run.
    pub pass: PassResult,
    pub iterations: usize,
    pub converged: bool,
    /// Budget increases applied across all iterations.
    pub adjustments: usize,
    /// Extra budget per segment after the last adjustment.
    pub extra_budget: Vec<Seconds>,
}

/// Runs passes over seeded segments until slop is within tolerance.
pub struct Refiner<'a> {
    sources: &'a [Source],
    params: &'a PlanningParameters,
    settings: RefinementSettings,
    slew: SlewModel,
    sequencer: &'a dyn SegmentSequencer,
    oracle: &'a dyn PositionOracle,
}

impl<'a> Refiner<'a> {
    pub fn new(
        sources: &'a [Source],
        params: &'a PlanningParameters,
        settings: RefinementSettings,
        slew: SlewModel,
        sequencer: &'a dyn SegmentSequencer,
        oracle: &'a dyn PositionOracle,
    ) -> Self {
        Self {
            sources,
            params,
            settings,
            slew,
            sequencer,
            oracle,
        }
    }

    /// Slew budget of a segment before any extra is added.
    pub fn base_budget(&self) -> Seconds {
        self.params.segment_width() * self.settings.overhead_fraction
    }

    /// Sequences every seeded segment once, in time order.
    ///
    /// Sequences from earlier passes are discarded. A segment whose sequencing
    /// fails loses its seed and is reported in [`PassResult::failures`].
    pub fn run_pass(&self, segments: &mut [Segment], extra: &[Seconds]) -> PassResult {
        let cache = PositionCache::new(self.oracle);
        let mut ledger = VisitLedger::new();
        let excluded: BTreeSet<String> =
            segments.iter().filter_map(|s| s.seed.clone()).collect();
        let mut selector = CompanionSelector::new(
            self.sources,
            excluded,
            self.params,
            self.slew,
            self.settings.integration_fraction,
        );
        for segment in segments.iter_mut() {
            segment.clear_sequence();
        }

        let mut failures = Vec::new();
        // Achieved end and last visited source of the previous sequenced segment
        let mut previous: Option<(ModifiedJulianDate, String)> = None;
        for segment in segments.iter_mut() {
            let Some(seed) = segment.seed.clone() else {
                continue;
            };
            let extra_budget = extra.get(segment.index).copied().unwrap_or(Seconds::new(0.0));
            let budget = self.base_budget() + extra_budget;
            let result = self
                .actual_start(segment, &seed, previous.as_ref(), &ledger, &cache)
                .and_then(|start| {
                    selector.plan_segment(
                        segment,
                        start,
                        budget,
                        &mut ledger,
                        self.params,
                        self.sequencer,
                        &cache,
                    )
                });
            match result {
                Ok(sequenced) => {
                    if let Some(last) = sequenced.visits.last() {
                        previous = Some((sequenced.end, last.source.clone()));
                    }
                }
                Err(e) => {
                    log::warn!(
                        "Segment {} degraded to unseeded (seed {}): {}",
                        segment.index,
                        seed,
                        e
                    );
                    segment.seed = None;
                    segment.clear_sequence();
                    failures.push(SegmentFailure {
                        index: segment.index,
                        seed,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let boundaries = boundary_slop(segments, &self.slew);
        let total_slop = boundaries
            .iter()
            .fold(Seconds::new(0.0), |total, b| total + b.slop);
        PassResult {
            boundaries,
            total_slop,
            failures,
            ledger,
        }
    }

    /// Later of the nominal start, the arrival from the previous segment and
    /// the seed's earliest allowed revisit.
    fn actual_start(
        &self,
        segment: &Segment,
        seed_name: &str,
        previous: Option<&(ModifiedJulianDate, String)>,
        ledger: &VisitLedger,
        oracle: &dyn PositionOracle,
    ) -> Result<ModifiedJulianDate, SequencerError> {
        let lookup = |name: &str| -> Result<&'a Source, OracleError> {
            self.sources
                .iter()
                .find(|s| s.name == name)
                .ok_or_else(|| OracleError::UnknownSource(name.to_string()))
        };
        let seed = lookup(seed_name)?;

        let mut start = segment.start;
        if let Some((end, last)) = previous {
            let last = lookup(last)?;
            let from = oracle.position_at(last, *end)?;
            let to = oracle.position_at(seed, *end)?;
            start = start.max(end.add_seconds(self.slew.slew_time(&from, &to)));
        }
        if let Some(visited) = ledger.last_visit(seed_name) {
            start = start.max(visited.add_seconds(self.params.min_spacing_seconds()));
        }
        Ok(start)
    }

    /// Runs passes until the total slop is within tolerance, the iteration
    /// cap is hit, or no boundary warrants a budget change.
    ///
    /// Every pass starts from the seeds the segments had on entry, so a
    /// segment degraded in one pass is retried in the next.
    pub fn run(&self, segments: &mut [Segment], mut extra: Vec<Seconds>) -> RefinementOutcome {
        extra.resize(segments.len(), Seconds::new(0.0));
        let seeds: Vec<Option<String>> = segments.iter().map(|s| s.seed.clone()).collect();
        let tolerance = self.params.slop_tolerance.value();
        let trigger = self.settings.slop_trigger_s;
        let max_iterations = self.settings.max_iterations.max(1);
        let mut adjustments = 0;

        let mut iteration = 0;
        loop {
            iteration += 1;
            for (segment, seed) in segments.iter_mut().zip(&seeds) {
                segment.seed = seed.clone();
            }
            let pass = self.run_pass(segments, &extra);
            log::info!(
                "Refinement pass {}: total slop {:.1} s over {} boundaries",
                iteration,
                pass.total_slop.value(),
                pass.boundaries.len()
            );

            if pass.total_slop.value() <= tolerance {
                return RefinementOutcome {
                    pass,
                    iterations: iteration,
                    converged: true,
                    adjustments,
                    extra_budget: extra,
                };
            }
            if iteration >= max_iterations {
                log::warn!(
                    "Refinement did not converge after {} passes (slop {:.1} s, tolerance {:.1} s)",
                    iteration,
                    pass.total_slop.value(),
                    tolerance
                );
                return RefinementOutcome {
                    pass,
                    iterations: iteration,
                    converged: false,
                    adjustments,
                    extra_budget: extra,
                };
            }

            let mut changed = 0;
            for boundary in &pass.boundaries {
                if boundary.slop.value() > trigger {
                    let growth = self.settings.budget_growth_s * boundary.slop.value() / trigger;
                    if let Some(slot) = extra.get_mut(boundary.earlier) {
                        *slot += Seconds::new(growth);
                        changed += 1;
                    }
                }
            }
            adjustments += changed;
            if changed == 0 {
                log::warn!(
                    "Refinement stalled after {} passes: no boundary slop above {:.0} s",
                    iteration,
                    trigger
                );
                return RefinementOutcome {
                    pass,
                    iterations: iteration,
                    converged: false,
                    adjustments,
                    extra_budget: extra,
                };
            }
        }
    }
}

/// Slop at every boundary between consecutive sequenced segments.
///
/// Segments without a sequence are skipped, so the boundary spans them.
pub fn boundary_slop(segments: &[Segment], slew: &SlewModel) -> Vec<BoundarySlop> {
    let sequenced: Vec<&Segment> = segments
        .iter()
        .filter(|s| s.achieved.is_some() && !s.sequence.is_empty())
        .collect();
    sequenced
        .windows(2)
        .filter_map(|pair| {
            let (earlier, later) = (pair[0], pair[1]);
            let (a, b) = (earlier.achieved?, later.achieved?);
            let last = earlier.sequence.last()?;
            let first = later.sequence.first()?;
            let gap = sidereal_to_solar(sidereal_gap(a.end_lst, b.start_lst));
            let slew = slew.slew_time(&last.position, &first.position);
            let slop = Seconds::new((gap.value() - slew.value()).max(0.0));
            Some(BoundarySlop {
                earlier: earlier.index,
                later: later.index,
                gap,
                slew,
                slop,
            })
        })
        .collect()
}
