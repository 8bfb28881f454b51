//! Visiting order inside one segment.
//!
//! A [`SegmentSequencer`] receives a seed, its companions and a time budget
//! and returns the visits it could fit together with the sidereal span they
//! cover. [`NearestNeighbourSequencer`] is the built-in implementation: a
//! greedy nearest-neighbour tour from the seed, tightened with 2-opt moves.

use qtty::{Degrees, Hours, Seconds};

use super::slew::SlewModel;
use crate::core::domain::{HorizontalPosition, Source, Visit};
use crate::core::error::SequencerError;
use crate::core::params::OVERHEAD_CYCLES;
use crate::ephemeris::PositionOracle;
use crate::time::ModifiedJulianDate;

/// One segment's sequencing job.
#[derive(Debug, Clone)]
pub struct SequenceRequest<'a> {
    pub seed: &'a Source,
    pub candidates: Vec<&'a Source>,
    /// Earliest start of the first visit.
    pub start: ModifiedJulianDate,
    /// Latest end of any companion visit.
    pub deadline: ModifiedJulianDate,
    pub cycle_time: Seconds,
    /// Correlator cycles of on-source time per visit.
    pub cycle_count: usize,
    pub min_elevation: Degrees,
}

impl SequenceRequest<'_> {
    /// Length of one visit including overhead cycles.
    pub fn visit_length(&self) -> Seconds {
        self.cycle_time * (self.cycle_count + OVERHEAD_CYCLES) as f64
    }
}

/// Visits of one segment, in order, with the span they cover.
#[derive(Debug, Clone, PartialEq)]
pub struct SequencedSegment {
    pub visits: Vec<Visit>,
    pub start: ModifiedJulianDate,
    pub end: ModifiedJulianDate,
    pub start_lst: Hours,
    pub end_lst: Hours,
}

/// Orders a seed and its companions inside a segment.
///
/// The seed is always visited first. Companions that cannot be fitted before
/// the deadline, or are below the elevation limit when their turn comes, are
/// left out of the result.
pub trait SegmentSequencer {
    fn sequence(
        &self,
        request: &SequenceRequest<'_>,
        oracle: &dyn PositionOracle,
    ) -> Result<SequencedSegment, SequencerError>;
}

/// Greedy nearest-neighbour tour with 2-opt improvement.
#[derive(Debug, Clone)]
pub struct NearestNeighbourSequencer {
    pub slew: SlewModel,
    /// Improvement sweeps over the greedy tour; zero disables 2-opt.
    pub two_opt_passes: usize,
}

impl Default for NearestNeighbourSequencer {
    fn default() -> Self {
        Self {
            slew: SlewModel::default(),
            two_opt_passes: 2,
        }
    }
}

impl NearestNeighbourSequencer {
    pub fn new(slew: SlewModel) -> Self {
        Self {
            slew,
            ..Self::default()
        }
    }

    /// Greedy tour: always slew to the closest remaining companion.
    fn greedy<'a>(
        &self,
        request: &SequenceRequest<'a>,
        seed_visit: &Visit,
        oracle: &dyn PositionOracle,
    ) -> Result<Vec<Visit>, SequencerError> {
        let length = request.visit_length();
        let mut visits = vec![seed_visit.clone()];
        let mut remaining: Vec<&Source> = request
            .candidates
            .iter()
            .copied()
            .filter(|c| c.name != request.seed.name)
            .collect();
        let mut now = seed_visit.end;
        let mut here = seed_visit.position;

        while !remaining.is_empty() {
            let mut best: Option<(usize, Seconds)> = None;
            for (i, candidate) in remaining.iter().enumerate() {
                let there = oracle.position_at(candidate, now)?;
                let slew = self.slew.slew_time(&here, &there);
                let closer = match best {
                    None => true,
                    Some((j, best_slew)) => {
                        slew.value() < best_slew.value()
                            || (slew.value() == best_slew.value()
                                && candidate.name < remaining[j].name)
                    }
                };
                if closer {
                    best = Some((i, slew));
                }
            }
            let Some((i, slew)) = best else {
                break;
            };
            let arrival = now.add_seconds(slew);
            let end = arrival.add_seconds(length);
            if end.value() > request.deadline.value() {
                break;
            }
            let candidate = remaining.remove(i);
            let position = oracle.position_at(candidate, arrival)?;
            if !position.is_above(request.min_elevation) {
                log::debug!("Skipping {}: below the elevation limit at arrival", candidate.name);
                continue;
            }
            visits.push(Visit {
                source: candidate.name.clone(),
                start: arrival,
                end,
                position,
            });
            now = end;
            here = position;
        }
        Ok(visits)
    }

    /// Reorders companions with 2-opt moves on static positions at the
    /// segment start. Returns the improved order when one exists.
    fn two_opt<'a>(
        &self,
        order: &[&'a Source],
        request: &SequenceRequest<'a>,
        oracle: &dyn PositionOracle,
    ) -> Result<Option<Vec<&'a Source>>, SequencerError> {
        if self.two_opt_passes == 0 || order.len() < 3 {
            return Ok(None);
        }
        let positions: Vec<HorizontalPosition> = order
            .iter()
            .map(|s| oracle.position_at(s, request.start))
            .collect::<Result<_, _>>()?;
        let mut tour: Vec<usize> = (0..order.len()).collect();
        let length = |tour: &[usize]| -> f64 {
            tour.windows(2)
                .map(|w| self.slew.slew_time(&positions[w[0]], &positions[w[1]]).value())
                .sum()
        };

        let mut best = length(&tour);
        let mut improved_any = false;
        for _ in 0..self.two_opt_passes {
            let mut improved = false;
            for i in 1..tour.len() - 1 {
                for j in i + 1..tour.len() {
                    let mut candidate = tour.clone();
                    candidate[i..=j].reverse();
                    let candidate_length = length(&candidate);
                    if candidate_length + 1e-9 < best {
                        tour = candidate;
                        best = candidate_length;
                        improved = true;
                    }
                }
            }
            if !improved {
                break;
            }
            improved_any = true;
        }
        Ok(improved_any.then(|| tour.iter().map(|&i| order[i]).collect()))
    }

    /// Times a fixed visiting order; `None` if any visit misses its limits.
    fn retime(
        &self,
        order: &[&Source],
        seed_visit: &Visit,
        request: &SequenceRequest<'_>,
        oracle: &dyn PositionOracle,
    ) -> Result<Option<Vec<Visit>>, SequencerError> {
        let length = request.visit_length();
        let mut visits = vec![seed_visit.clone()];
        let mut now = seed_visit.end;
        let mut here = seed_visit.position;
        for source in order.iter().skip(1) {
            let there = oracle.position_at(source, now)?;
            let arrival = now.add_seconds(self.slew.slew_time(&here, &there));
            let end = arrival.add_seconds(length);
            let position = oracle.position_at(source, arrival)?;
            if end.value() > request.deadline.value() || !position.is_above(request.min_elevation) {
                return Ok(None);
            }
            visits.push(Visit {
                source: source.name.clone(),
                start: arrival,
                end,
                position,
            });
            now = end;
            here = position;
        }
        Ok(Some(visits))
    }
}

impl SegmentSequencer for NearestNeighbourSequencer {
    fn sequence(
        &self,
        request: &SequenceRequest<'_>,
        oracle: &dyn PositionOracle,
    ) -> Result<SequencedSegment, SequencerError> {
        let position = oracle.position_at(request.seed, request.start)?;
        if !position.is_above(request.min_elevation) {
            return Err(SequencerError::SeedNotVisible {
                seed: request.seed.name.clone(),
                mjd: request.start.value(),
            });
        }
        let seed_visit = Visit {
            source: request.seed.name.clone(),
            start: request.start,
            end: request.start.add_seconds(request.visit_length()),
            position,
        };

        let mut visits = self.greedy(request, &seed_visit, oracle)?;

        let order: Vec<&Source> = visits
            .iter()
            .filter_map(|v| {
                std::iter::once(request.seed)
                    .chain(request.candidates.iter().copied())
                    .find(|s| s.name == v.source)
            })
            .collect();
        if let Some(improved) = self.two_opt(&order, request, oracle)? {
            if let Some(retimed) = self.retime(&improved, &seed_visit, request, oracle)? {
                let greedy_end = visits.last().map_or(seed_visit.end, |v| v.end);
                let improved_end = retimed.last().map_or(seed_visit.end, |v| v.end);
                if retimed.len() == visits.len() && improved_end.value() <= greedy_end.value() {
                    visits = retimed;
                }
            }
        }

        let start = seed_visit.start;
        let end = visits.last().map_or(seed_visit.end, |v| v.end);
        Ok(SequencedSegment {
            start_lst: oracle.sidereal_time(start),
            end_lst: oracle.sidereal_time(end),
            visits,
            start,
            end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::test_support::{source, ScriptedOracle};

    fn request<'a>(
        seed: &'a Source,
        candidates: Vec<&'a Source>,
        minutes: f64,
    ) -> SequenceRequest<'a> {
        let start = ModifiedJulianDate::new(400.0);
        SequenceRequest {
            seed,
            candidates,
            start,
            deadline: start.add_seconds(Seconds::new(minutes * 60.0)),
            cycle_time: Seconds::new(10.0),
            cycle_count: 12,
            min_elevation: Degrees::new(12.0),
        }
    }

    fn names(segment: &SequencedSegment) -> Vec<&str> {
        segment.visits.iter().map(|v| v.source.as_str()).collect()
    }

    #[test]
    fn test_visit_length_includes_overhead() {
        let seed = source("a");
        assert_eq!(request(&seed, vec![], 30.0).visit_length().value(), 140.0);
    }

    #[test]
    fn test_nearest_neighbour_order() {
        let oracle = ScriptedOracle::new()
            .always_up("a", 0.0, 40.0)
            .always_up("b", 10.0, 40.0)
            .always_up("c", 100.0, 40.0)
            .always_up("d", 5.0, 40.0);
        let (a, b, c, d) = (source("a"), source("b"), source("c"), source("d"));
        let result = NearestNeighbourSequencer::default()
            .sequence(&request(&a, vec![&c, &b, &d], 60.0), &oracle)
            .unwrap();

        assert_eq!(names(&result), vec!["a", "d", "b", "c"]);
        assert_eq!(result.start, ModifiedJulianDate::new(400.0));
        assert_eq!(result.end, result.visits[3].end);
        for pair in result.visits.windows(2) {
            assert!(pair[1].start.value() >= pair[0].end.value());
        }
    }

    #[test]
    fn test_deadline_limits_visits() {
        let oracle = ScriptedOracle::new()
            .always_up("a", 0.0, 40.0)
            .always_up("b", 1.0, 40.0)
            .always_up("c", 2.0, 40.0);
        let (a, b, c) = (source("a"), source("b"), source("c"));
        // Room for two visits of 140 s plus a short slew, not three
        let result = NearestNeighbourSequencer::default()
            .sequence(&request(&a, vec![&b, &c], 5.0), &oracle)
            .unwrap();
        assert_eq!(names(&result), vec!["a", "b"]);
        let deadline = ModifiedJulianDate::new(400.0).add_seconds(Seconds::new(300.0));
        assert!(result.end.value() <= deadline.value());
    }

    #[test]
    fn test_seed_below_limit_is_an_error() {
        let oracle = ScriptedOracle::new().never_up("a");
        let a = source("a");
        let result =
            NearestNeighbourSequencer::default().sequence(&request(&a, vec![], 30.0), &oracle);
        assert!(matches!(result, Err(SequencerError::SeedNotVisible { .. })));
    }

    #[test]
    fn test_companion_below_limit_is_skipped() {
        let oracle = ScriptedOracle::new()
            .always_up("a", 0.0, 40.0)
            .never_up("low")
            .always_up("b", 30.0, 40.0);
        let (a, low, b) = (source("a"), source("low"), source("b"));
        let result = NearestNeighbourSequencer::default()
            .sequence(&request(&a, vec![&low, &b], 60.0), &oracle)
            .unwrap();
        assert_eq!(names(&result), vec!["a", "b"]);
    }

    #[test]
    fn test_oracle_failure_propagates() {
        let oracle = ScriptedOracle::new().always_up("a", 0.0, 40.0).failing("x");
        let (a, x) = (source("a"), source("x"));
        let result =
            NearestNeighbourSequencer::default().sequence(&request(&a, vec![&x], 30.0), &oracle);
        assert!(matches!(result, Err(SequencerError::Oracle(_))));
    }

    #[test]
    fn test_two_opt_never_ends_later() {
        let oracle = ScriptedOracle::new()
            .always_up("s", 50.0, 40.0)
            .always_up("p", 45.0, 40.0)
            .always_up("q", 30.0, 40.0)
            .always_up("r", 60.0, 60.0)
            .always_up("t", 80.0, 20.0);
        let (s, p, q, r, t) = (source("s"), source("p"), source("q"), source("r"), source("t"));
        let candidates = vec![&p, &q, &r, &t];

        let greedy_only = NearestNeighbourSequencer {
            two_opt_passes: 0,
            ..NearestNeighbourSequencer::default()
        }
        .sequence(&request(&s, candidates.clone(), 60.0), &oracle)
        .unwrap();
        let improved = NearestNeighbourSequencer::default()
            .sequence(&request(&s, candidates, 60.0), &oracle)
            .unwrap();

        assert_eq!(improved.visits.len(), greedy_only.visits.len());
        assert!(improved.end.value() <= greedy_only.end.value() + 1e-12);
        assert_eq!(improved.visits[0].source, "s");
    }
}
