//! Greedy seed assignment, most constrained source first.
//!
//! Candidates are queued by the number of segments in which they are visible,
//! fewest first, behind an optional start source. Each candidate is taken off
//! the queue exactly once and yields a [`SeedOutcome`]: it either seeds
//! `n_visits` segments or seeds nothing.

use std::collections::{HashMap, VecDeque};

use qtty::Seconds;
use serde::{Deserialize, Serialize};

use super::segmenter::segments_up;
use super::slew::SlewModel;
use crate::core::domain::{Segment, Source};
use crate::core::error::OracleError;
use crate::core::params::PlanningParameters;
use crate::ephemeris::PositionOracle;

/// Seed placement constraints.
#[derive(Debug, Clone)]
pub struct SeedingCriteria {
    /// Segments each seed must anchor.
    pub n_visits: usize,
    /// Minimum slew between a candidate and any existing seed.
    pub min_seed_separation: Seconds,
    /// Maximum slew between a candidate and the seed of a neighbouring segment.
    pub max_seed_adjacency: Seconds,
    /// Candidate taken off the queue first.
    pub start_source: Option<String>,
}

impl SeedingCriteria {
    pub fn from_params(params: &PlanningParameters) -> Self {
        Self {
            n_visits: params.n_visits,
            min_seed_separation: params.min_seed_separation,
            max_seed_adjacency: params.max_seed_adjacency,
            start_source: params.start_source.clone(),
        }
    }
}

/// What happened to one seed candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SeedOutcome {
    /// Became the seed of these segments.
    Seeded(Vec<usize>),
    /// Within the minimum separation of the seed of `segment`.
    TooCloseToSeed { segment: usize, seed: String },
    /// Fewer acceptable segments than required visits.
    InsufficientSegments { available: usize },
    OracleFailure(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedDecision {
    pub candidate: String,
    pub segments_up: usize,
    pub outcome: SeedOutcome,
}

/// Every candidate decision plus the segments left without a seed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedingReport {
    pub decisions: Vec<SeedDecision>,
    pub unseeded: Vec<usize>,
}

impl SeedingReport {
    /// Names of candidates that became seeds, in decision order.
    pub fn seeds(&self) -> impl Iterator<Item = &str> {
        self.decisions
            .iter()
            .filter(|d| matches!(d.outcome, SeedOutcome::Seeded(_)))
            .map(|d| d.candidate.as_str())
    }
}

struct Candidate<'a> {
    source: &'a Source,
    segments_up: usize,
}

/// Assigns seeds to `segments` in place.
pub fn assign_seeds(
    segments: &mut [Segment],
    sources: &[Source],
    criteria: &SeedingCriteria,
    slew: &SlewModel,
    oracle: &dyn PositionOracle,
) -> SeedingReport {
    let by_name: HashMap<&str, &Source> = sources.iter().map(|s| (s.name.as_str(), s)).collect();

    let mut ranked: Vec<Candidate> = sources
        .iter()
        .map(|source| Candidate {
            source,
            segments_up: segments_up(segments, &source.name),
        })
        .collect();
    ranked.sort_by(|a, b| {
        a.segments_up
            .cmp(&b.segments_up)
            .then_with(|| a.source.name.cmp(&b.source.name))
    });
    if let Some(start) = criteria.start_source.as_deref() {
        match ranked.iter().position(|c| c.source.name == start) {
            Some(i) => {
                let first = ranked.remove(i);
                ranked.insert(0, first);
            }
            None => log::warn!("Start source {} is not a seed candidate", start),
        }
    }
    let mut queue: VecDeque<Candidate> = ranked.into();

    let mut report = SeedingReport::default();
    while segments.iter().any(|s| !s.is_seeded()) {
        let Some(candidate) = queue.pop_front() else {
            break;
        };
        let outcome = match evaluate(candidate.source, segments, &by_name, criteria, slew, oracle) {
            Ok(outcome) => outcome,
            Err(e) => SeedOutcome::OracleFailure(e.to_string()),
        };
        if let SeedOutcome::Seeded(indices) = &outcome {
            for &index in indices {
                segments[index].seed = Some(candidate.source.name.clone());
            }
        }
        log::debug!(
            "Seed candidate {} (up in {} segments): {:?}",
            candidate.source.name,
            candidate.segments_up,
            outcome
        );
        report.decisions.push(SeedDecision {
            candidate: candidate.source.name.clone(),
            segments_up: candidate.segments_up,
            outcome,
        });
    }

    report.unseeded = segments
        .iter()
        .filter(|s| !s.is_seeded())
        .map(|s| s.index)
        .collect();
    log::info!(
        "Seeded {} of {} segments with {} sources",
        segments.len() - report.unseeded.len(),
        segments.len(),
        report.seeds().count()
    );
    report
}

fn evaluate(
    candidate: &Source,
    segments: &[Segment],
    by_name: &HashMap<&str, &Source>,
    criteria: &SeedingCriteria,
    slew: &SlewModel,
    oracle: &dyn PositionOracle,
) -> Result<SeedOutcome, OracleError> {
    // Existing seeds, each at its own segment instant
    for segment in segments {
        let Some(seed) = seed_of(segment, by_name)? else {
            continue;
        };
        let here = oracle.position_at(candidate, segment.start)?;
        let there = oracle.position_at(seed, segment.start)?;
        if slew.slew_time(&here, &there).value() < criteria.min_seed_separation.value() {
            return Ok(SeedOutcome::TooCloseToSeed {
                segment: segment.index,
                seed: seed.name.clone(),
            });
        }
    }

    let mut accepted: Vec<usize> = Vec::with_capacity(criteria.n_visits);
    for (i, segment) in segments.iter().enumerate() {
        if accepted.len() == criteria.n_visits {
            break;
        }
        if segment.is_seeded() || !segment.is_visible(&candidate.name) {
            continue;
        }
        if accepted.last().is_some_and(|&last| i < last + 2) {
            continue;
        }
        if acceptable_at(i, candidate, segments, by_name, criteria, slew, oracle)? {
            accepted.push(i);
        }
    }

    if accepted.len() >= criteria.n_visits {
        Ok(SeedOutcome::Seeded(accepted))
    } else {
        Ok(SeedOutcome::InsufficientSegments {
            available: accepted.len(),
        })
    }
}

/// Neighbour adjacency and seed separation at segment `i`.
fn acceptable_at(
    i: usize,
    candidate: &Source,
    segments: &[Segment],
    by_name: &HashMap<&str, &Source>,
    criteria: &SeedingCriteria,
    slew: &SlewModel,
    oracle: &dyn PositionOracle,
) -> Result<bool, OracleError> {
    let at = segments[i].start;
    let here = oracle.position_at(candidate, at)?;

    let neighbours = [i.checked_sub(1), Some(i + 1).filter(|&n| n < segments.len())];
    for n in neighbours.into_iter().flatten() {
        let neighbour = &segments[n];
        let Some(seed) = seed_of(neighbour, by_name)? else {
            continue;
        };
        if seed.name == candidate.name {
            continue;
        }
        let instant = if n < i { at } else { neighbour.start };
        let from = if n < i { here } else { oracle.position_at(candidate, instant)? };
        let to = oracle.position_at(seed, instant)?;
        if slew.slew_time(&from, &to).value() > criteria.max_seed_adjacency.value() {
            return Ok(false);
        }
    }

    for segment in segments.iter().filter(|s| s.is_seeded()) {
        let Some(seed) = seed_of(segment, by_name)? else {
            continue;
        };
        if seed.name == candidate.name {
            continue;
        }
        let there = oracle.position_at(seed, at)?;
        if slew.slew_time(&here, &there).value() < criteria.min_seed_separation.value() {
            return Ok(false);
        }
    }
    Ok(true)
}

fn seed_of<'a>(
    segment: &Segment,
    by_name: &HashMap<&str, &'a Source>,
) -> Result<Option<&'a Source>, OracleError> {
    match &segment.seed {
        None => Ok(None),
        Some(name) => by_name
            .get(name.as_str())
            .copied()
            .map(Some)
            .ok_or_else(|| OracleError::UnknownSource(name.clone())),
    }
}
