//! Public schedule and report construction.
//!
//! The emitter turns the segments left by the last refinement pass into the
//! ordered list of [`ScheduleEntry`] values handed to a schedule writer, and
//! summarises the run in a [`PlanReport`].

use std::collections::{BTreeMap, HashMap};

use qtty::{Degrees, Seconds};
use serde::{Deserialize, Serialize};

use crate::algorithms::refinement::{RefinementOutcome, SegmentFailure};
use crate::algorithms::seeding::SeedingReport;
use crate::algorithms::visibility::RemovedSource;
use crate::core::domain::{
    EntryKind, ObservingBlock, PositionRef, ScheduleEntry, Segment, Source,
};
use crate::core::params::PlanningParameters;
use crate::ephemeris::PositionOracle;
use crate::time::ModifiedJulianDate;

/// A segment that ended the run without a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnseededSegment {
    pub index: usize,
    pub start: ModifiedJulianDate,
    pub end: ModifiedJulianDate,
    pub reason: String,
}

/// The emitted schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub entries: Vec<ScheduleEntry>,
    pub unseeded: Vec<UnseededSegment>,
    pub converged: bool,
    pub iterations: usize,
    pub total_slop: Seconds,
}

impl Schedule {
    /// Mosaic entries only.
    pub fn mosaics(&self) -> impl Iterator<Item = &ScheduleEntry> {
        self.entries.iter().filter(|e| e.kind == EntryKind::Mosaic)
    }

    pub fn visit_count(&self) -> usize {
        self.entries.iter().map(|e| e.visits.len()).sum()
    }
}

/// Summary of a planning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanReport {
    /// Number of sources per achieved visit count.
    pub visit_histogram: BTreeMap<usize, usize>,
    /// Sources that reached the visit cap.
    pub exhausted: Vec<String>,
    /// Sources that survived the visibility filter but were never visited.
    pub never_scheduled: Vec<String>,
    pub removed: Vec<RemovedSource>,
    pub seeding: SeedingReport,
    pub total_slop: Seconds,
    pub iterations: usize,
    pub converged: bool,
}

/// Visit count per source over the sequenced segments.
pub fn visit_counts(segments: &[Segment]) -> HashMap<&str, usize> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for visit in segments.iter().flat_map(|s| s.sequence.iter()) {
        *counts.entry(visit.source.as_str()).or_default() += 1;
    }
    counts
}

/// First calibrator above `min_elevation` at `at`.
pub fn select_calibrator<'a>(
    calibrators: &'a [Source],
    at: ModifiedJulianDate,
    min_elevation: Degrees,
    oracle: &dyn PositionOracle,
) -> Option<&'a Source> {
    calibrators.iter().find(|calibrator| {
        match oracle.position_at(calibrator, at) {
            Ok(position) => position.is_above(min_elevation),
            Err(e) => {
                log::warn!("Calibrator {} unavailable: {}", calibrator.name, e);
                false
            }
        }
    })
}

/// Dwell on the first visible calibrator for `margin` from the block start.
pub fn calibration_entry(
    block: &ObservingBlock,
    margin: Seconds,
    calibrators: &[Source],
    min_elevation: Degrees,
    oracle: &dyn PositionOracle,
) -> Option<ScheduleEntry> {
    let Some(calibrator) = select_calibrator(calibrators, block.start, min_elevation, oracle) else {
        log::warn!(
            "No calibrator above {:.1} deg at block start, schedule has no calibration dwell",
            min_elevation.value()
        );
        return None;
    };
    let end = block.start.add_seconds(margin).min(block.end);
    Some(ScheduleEntry {
        source_ref: calibrator.name.clone(),
        position_ref: PositionRef::from(calibrator),
        kind: EntryKind::Dwell,
        scan_length_minutes: end.seconds_since(block.start).value() / 60.0,
        start: block.start,
        end,
        start_lst: oracle.sidereal_time(block.start),
        end_lst: oracle.sidereal_time(end),
        visits: Vec::new(),
    })
}

/// One mosaic entry per sequenced segment, in time order.
pub fn mosaic_entries(
    segments: &[Segment],
    sources: &[Source],
    params: &PlanningParameters,
) -> Vec<ScheduleEntry> {
    let by_name: HashMap<&str, &Source> = sources.iter().map(|s| (s.name.as_str(), s)).collect();
    segments
        .iter()
        .filter_map(|segment| {
            let achieved = segment.achieved?;
            let seed = by_name.get(segment.seed.as_deref()?)?;
            Some(ScheduleEntry {
                source_ref: format!("segment_{:03}", segment.index),
                position_ref: PositionRef::from(*seed),
                kind: EntryKind::Mosaic,
                scan_length_minutes: params.visit_duration_minutes(),
                start: achieved.start,
                end: achieved.end,
                start_lst: achieved.start_lst,
                end_lst: achieved.end_lst,
                visits: segment.sequence.clone(),
            })
        })
        .collect()
}

fn unseeded_segments(segments: &[Segment], failures: &[SegmentFailure]) -> Vec<UnseededSegment> {
    segments
        .iter()
        .filter(|s| s.achieved.is_none())
        .map(|segment| {
            let reason = match failures.iter().find(|f| f.index == segment.index) {
                Some(failure) => format!("seed {} failed: {}", failure.seed, failure.reason),
                None if segment.visible.is_empty() => "no visible source".to_string(),
                None => "no seed assigned".to_string(),
            };
            UnseededSegment {
                index: segment.index,
                start: segment.start,
                end: segment.end,
                reason,
            }
        })
        .collect()
}

/// Builds the schedule from the segments of the last refinement pass.
pub fn emit_schedule(
    segments: &[Segment],
    sources: &[Source],
    params: &PlanningParameters,
    calibration: Option<ScheduleEntry>,
    refinement: &RefinementOutcome,
) -> Schedule {
    let mut entries: Vec<ScheduleEntry> = calibration.into_iter().collect();
    entries.extend(mosaic_entries(segments, sources, params));
    entries.sort_by(|a, b| a.start.value().total_cmp(&b.start.value()));

    let unseeded = unseeded_segments(segments, &refinement.pass.failures);
    if !unseeded.is_empty() {
        log::warn!("{} of {} segments left unseeded", unseeded.len(), segments.len());
    }

    Schedule {
        entries,
        unseeded,
        converged: refinement.converged,
        iterations: refinement.iterations,
        total_slop: refinement.pass.total_slop,
    }
}

/// Summarises the run for `candidates`, the sources that survived the
/// visibility filter.
pub fn build_report(
    candidates: &[Source],
    segments: &[Segment],
    n_visits: usize,
    removed: Vec<RemovedSource>,
    seeding: SeedingReport,
    refinement: &RefinementOutcome,
) -> PlanReport {
    let counts = visit_counts(segments);
    let mut visit_histogram = BTreeMap::new();
    let mut exhausted = Vec::new();
    let mut never_scheduled = Vec::new();
    for source in candidates {
        let count = counts.get(source.name.as_str()).copied().unwrap_or(0);
        *visit_histogram.entry(count).or_insert(0) += 1;
        if count >= n_visits {
            exhausted.push(source.name.clone());
        } else if count == 0 {
            never_scheduled.push(source.name.clone());
        }
    }

    PlanReport {
        visit_histogram,
        exhausted,
        never_scheduled,
        removed,
        seeding,
        total_slop: refinement.pass.total_slop,
        iterations: refinement.iterations,
        converged: refinement.converged,
    }
}
