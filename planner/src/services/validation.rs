//! Post-hoc checks over a planned schedule.
//!
//! The planner enforces these rules while it builds the schedule; this module
//! re-checks the final segments independently so a regression in any stage
//! shows up as a reported issue instead of a silently bad schedule.
//!
//! Rules:
//! - Visit cap: no source visited more than `n_visits` times
//! - Spacing: visits to one source at least `min_spacing` apart
//! - Seed separation: distinct seeds never closer than the minimum slew
//! - Seed adjacency: neighbouring seeds within the adjacency slew
//! - Elevation: every visit above the minimum elevation

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::algorithms::slew::SlewModel;
use crate::core::domain::{Segment, Source};
use crate::core::params::PlanningParameters;
use crate::ephemeris::PositionOracle;
use crate::time::ModifiedJulianDate;

/// Slack on time comparisons, seconds.
const TIME_TOLERANCE_S: f64 = 1e-3;

/// Issue category for grouping validation problems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    VisitCap,
    Spacing,
    SeedSeparation,
    SeedAdjacency,
    Elevation,
}

impl IssueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::VisitCap => "visit_cap",
            IssueCategory::Spacing => "spacing",
            IssueCategory::SeedSeparation => "seed_separation",
            IssueCategory::SeedAdjacency => "seed_adjacency",
            IssueCategory::Elevation => "elevation",
        }
    }
}

/// A single broken rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub category: IssueCategory,
    pub source: String,
    pub segment: Option<usize>,
    pub description: String,
}

impl ValidationIssue {
    fn new(
        category: IssueCategory,
        source: &str,
        segment: Option<usize>,
        description: String,
    ) -> Self {
        Self {
            category,
            source: source.to_string(),
            segment,
            description,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.segment {
            Some(index) => write!(
                f,
                "[{}] {} (segment {}): {}",
                self.category.as_str(),
                self.source,
                index,
                self.description
            ),
            None => write!(f, "[{}] {}: {}", self.category.as_str(), self.source, self.description),
        }
    }
}

fn check_visits(
    segments: &[Segment],
    params: &PlanningParameters,
    issues: &mut Vec<ValidationIssue>,
) {
    let mut visits: BTreeMap<&str, Vec<(ModifiedJulianDate, usize)>> = BTreeMap::new();
    for segment in segments {
        for visit in &segment.sequence {
            visits
                .entry(visit.source.as_str())
                .or_default()
                .push((visit.start, segment.index));

            if visit.position.elevation.value() < params.min_elevation.value() {
                issues.push(ValidationIssue::new(
                    IssueCategory::Elevation,
                    &visit.source,
                    Some(segment.index),
                    format!(
                        "elevation {:.2} deg below limit {:.2} deg",
                        visit.position.elevation.value(),
                        params.min_elevation.value()
                    ),
                ));
            }
        }
    }

    let spacing = params.min_spacing_seconds().value();
    for (name, mut instants) in visits {
        if instants.len() > params.n_visits {
            issues.push(ValidationIssue::new(
                IssueCategory::VisitCap,
                name,
                None,
                format!("{} visits, cap is {}", instants.len(), params.n_visits),
            ));
        }
        instants.sort_by(|a, b| a.0.value().total_cmp(&b.0.value()));
        for pair in instants.windows(2) {
            let gap = pair[1].0.seconds_since(pair[0].0).value();
            if gap + TIME_TOLERANCE_S < spacing {
                issues.push(ValidationIssue::new(
                    IssueCategory::Spacing,
                    name,
                    Some(pair[1].1),
                    format!("visits {:.1} s apart, minimum is {:.1} s", gap, spacing),
                ));
            }
        }
    }
}

fn check_seeds(
    segments: &[Segment],
    sources: &[Source],
    params: &PlanningParameters,
    slew: &SlewModel,
    oracle: &dyn PositionOracle,
    issues: &mut Vec<ValidationIssue>,
) {
    let by_name: HashMap<&str, &Source> = sources.iter().map(|s| (s.name.as_str(), s)).collect();
    let seeded: Vec<(&Segment, &Source)> = segments
        .iter()
        .filter(|s| s.achieved.is_some())
        .filter_map(|s| {
            let seed = by_name.get(s.seed.as_deref()?)?;
            Some((s, *seed))
        })
        .collect();
    let mut seeds: Vec<&Source> = seeded.iter().map(|&(_, seed)| seed).collect();
    seeds.sort_by(|a, b| a.name.cmp(&b.name));
    seeds.dedup_by(|a, b| a.name == b.name);

    let separation = params.min_seed_separation.value();
    for &(segment, seed) in &seeded {
        let Ok(here) = oracle.position_at(seed, segment.start) else {
            continue;
        };
        for other in seeds.iter().filter(|s| s.name != seed.name) {
            let Ok(there) = oracle.position_at(other, segment.start) else {
                continue;
            };
            let slew_s = slew.slew_time(&here, &there).value();
            if slew_s + TIME_TOLERANCE_S < separation {
                issues.push(ValidationIssue::new(
                    IssueCategory::SeedSeparation,
                    &other.name,
                    Some(segment.index),
                    format!(
                        "{:.1} s from seed {}, minimum is {:.1} s",
                        slew_s, seed.name, separation
                    ),
                ));
            }
        }
    }

    let adjacency = params.max_seed_adjacency.value();
    for pair in seeded.windows(2) {
        let ((earlier, first), (later, second)) = (pair[0], pair[1]);
        if later.index != earlier.index + 1 || first.name == second.name {
            continue;
        }
        let (Ok(a), Ok(b)) = (
            oracle.position_at(first, later.start),
            oracle.position_at(second, later.start),
        ) else {
            continue;
        };
        let slew_s = slew.slew_time(&a, &b).value();
        if slew_s > adjacency + TIME_TOLERANCE_S {
            issues.push(ValidationIssue::new(
                IssueCategory::SeedAdjacency,
                &second.name,
                Some(later.index),
                format!(
                    "{:.1} s from neighbouring seed {}, maximum is {:.1} s",
                    slew_s, first.name, adjacency
                ),
            ));
        }
    }
}

/// Checks the sequenced `segments` against every schedule rule.
///
/// Oracle failures skip the affected comparison.
pub fn validate_schedule(
    segments: &[Segment],
    sources: &[Source],
    params: &PlanningParameters,
    slew: &SlewModel,
    oracle: &dyn PositionOracle,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    check_visits(segments, params, &mut issues);
    check_seeds(segments, sources, params, slew, oracle, &mut issues);

    for issue in &issues {
        log::warn!("Schedule validation: {}", issue);
    }
    issues
}
