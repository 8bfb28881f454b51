//! End-to-end planning run.

use std::collections::HashMap;

use crate::algorithms::refinement::Refiner;
use crate::algorithms::seeding::{assign_seeds, SeedingCriteria};
use crate::algorithms::segmenter::partition_window;
use crate::algorithms::sequencer::SegmentSequencer;
use crate::algorithms::visibility::{filter_catalogue, VisibilityCriteria};
use crate::config::PlannerConfig;
use crate::core::domain::{Catalogue, ObservingWindow, Segment, Source};
use crate::core::error::{PlannerError, PlannerResult};
use crate::core::params::PlanningParameters;
use crate::ephemeris::PositionOracle;
use crate::services::emitter::{
    build_report, calibration_entry, emit_schedule, visit_counts, PlanReport, Schedule,
};
use crate::services::validation::{validate_schedule, ValidationIssue};

/// Everything a planning run produces.
#[derive(Debug, Clone)]
pub struct PlanOutput {
    pub schedule: Schedule,
    pub report: PlanReport,
    /// Segments as left by the last refinement pass.
    pub segments: Vec<Segment>,
    /// Rule violations found in the final schedule; empty for a sound plan.
    pub issues: Vec<ValidationIssue>,
    pub window: ObservingWindow,
}

impl PlanOutput {
    /// Unscheduled and exhausted sources of `catalogue`.
    pub fn residual_sources(&self, catalogue: &Catalogue, n_visits: usize) -> Vec<Source> {
        residual_sources(catalogue, &self.segments, n_visits)
    }
}

/// Sources for a follow-up run, in catalogue order.
///
/// Holds every source never visited (culled or never scheduled) and every
/// source that reached `n_visits`. Partially visited sources are left out.
pub fn residual_sources(
    catalogue: &Catalogue,
    segments: &[Segment],
    n_visits: usize,
) -> Vec<Source> {
    let counts: HashMap<&str, usize> = visit_counts(segments);
    let residual: Vec<Source> = catalogue
        .iter()
        .filter(|s| {
            let count = counts.get(s.name.as_str()).copied().unwrap_or(0);
            count == 0 || count >= n_visits
        })
        .cloned()
        .collect();
    log::debug!(
        "Residual catalogue holds {} of {} sources",
        residual.len(),
        catalogue.len()
    );
    residual
}

/// Plans `catalogue` over the block in `params`.
///
/// Fails only on invalid parameters (including a start source missing from
/// the catalogue), an empty window or bad calibrator configuration.
/// Everything else (culled sources, unseeded segments, sequencing failures,
/// non-convergence) is reported in the output.
pub fn plan(
    catalogue: &Catalogue,
    params: &PlanningParameters,
    config: &PlannerConfig,
    oracle: &dyn PositionOracle,
    sequencer: &dyn SegmentSequencer,
) -> PlannerResult<PlanOutput> {
    params.validate()?;
    if let Some(start) = params.start_source.as_deref() {
        if !catalogue.contains(start) {
            return Err(PlannerError::InvalidParameter(format!(
                "start source {} is not in the catalogue",
                start
            )));
        }
    }
    let margin = config.calibration.margin();
    let window = ObservingWindow::from_block(&params.block, margin)?;
    let calibrators = config.calibration.sources()?;
    log::info!(
        "Planning {} sources from {} to {} ({} visits of {:.1} min, spacing {:.1} min)",
        catalogue.len(),
        window.start,
        window.end,
        params.n_visits,
        params.visit_duration_minutes(),
        params.min_spacing.value()
    );

    let criteria = VisibilityCriteria::from_params(params, config.visibility.duration_margin)
        .with_hysteresis(config.visibility.set_hysteresis, config.visibility.rise_hysteresis);
    let filtered = filter_catalogue(catalogue.sources(), &window, &criteria, oracle);
    let candidates = filtered.survivors;

    let mut segments = partition_window(
        &window,
        params.segment_width(),
        &candidates,
        params.min_elevation,
        oracle,
    );
    let seeding = assign_seeds(
        &mut segments,
        &candidates,
        &SeedingCriteria::from_params(params),
        &config.kinematics,
        oracle,
    );

    let refiner = Refiner::new(
        &candidates,
        params,
        config.refinement,
        config.kinematics,
        sequencer,
        oracle,
    );
    let outcome = refiner.run(&mut segments, Vec::new());

    let calibration = calibration_entry(
        &params.block,
        margin,
        &calibrators,
        params.min_elevation,
        oracle,
    );
    let schedule = emit_schedule(&segments, &candidates, params, calibration, &outcome);
    let report = build_report(
        &candidates,
        &segments,
        params.n_visits,
        filtered.removed,
        seeding,
        &outcome,
    );
    let issues = validate_schedule(&segments, &candidates, params, &config.kinematics, oracle);

    log::info!(
        "Planned {} visits in {} entries; {} sources exhausted, {} never scheduled, {} removed",
        schedule.visit_count(),
        schedule.entries.len(),
        report.exhausted.len(),
        report.never_scheduled.len(),
        report.removed.len()
    );

    Ok(PlanOutput {
        schedule,
        report,
        segments,
        issues,
        window,
    })
}
