//! Companion selection around a seed and hand-off to the sequencer.

use std::collections::{BTreeSet, HashMap};

use qtty::Seconds;

use super::sequencer::{SegmentSequencer, SequenceRequest, SequencedSegment};
use super::slew::SlewModel;
use crate::core::domain::{AchievedSpan, Segment, Source, VisitLedger};
use crate::core::error::{OracleError, SequencerError};
use crate::core::params::PlanningParameters;
use crate::ephemeris::PositionOracle;
use crate::time::ModifiedJulianDate;

/// Slack on the revisit spacing check, absorbing MJD rounding.
const SPACING_TOLERANCE_S: f64 = 1e-3;

/// Companions that fit in a segment: `floor(fraction * width / per_visit)`.
pub fn segment_capacity(width: Seconds, per_visit: Seconds, integration_fraction: f64) -> usize {
    if per_visit.value() <= 0.0 {
        return 0;
    }
    (integration_fraction * width.value() / per_visit.value()).floor().max(0.0) as usize
}

/// Picks companions for seeded segments within one refinement pass.
///
/// The first segment a seed anchors fixes its companion set; later segments
/// with the same seed draw only from that set, so the same group of sources
/// is revisited together.
pub struct CompanionSelector<'a> {
    sources: HashMap<&'a str, &'a Source>,
    excluded: BTreeSet<String>,
    associations: HashMap<String, BTreeSet<String>>,
    n_visits: usize,
    min_spacing: Seconds,
    capacity: usize,
    slew: SlewModel,
}

impl<'a> CompanionSelector<'a> {
    /// `excluded` names never become companions; normally every seed.
    pub fn new(
        sources: &'a [Source],
        excluded: BTreeSet<String>,
        params: &PlanningParameters,
        slew: SlewModel,
        integration_fraction: f64,
    ) -> Self {
        Self {
            sources: sources.iter().map(|s| (s.name.as_str(), s)).collect(),
            excluded,
            associations: HashMap::new(),
            n_visits: params.n_visits,
            min_spacing: params.min_spacing_seconds(),
            capacity: segment_capacity(
                params.segment_width(),
                params.per_visit_duration(),
                integration_fraction,
            ),
            slew,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Companion set previously fixed for `seed`, if any.
    pub fn association(&self, seed: &str) -> Option<&BTreeSet<String>> {
        self.associations.get(seed)
    }

    pub fn source(&self, name: &str) -> Option<&'a Source> {
        self.sources.get(name).copied()
    }

    /// Companions for `segment`, nearest to the seed first.
    ///
    /// Sources at their visit cap, excluded sources and sources visited less
    /// than the minimum spacing before `start` are skipped. Selection stops
    /// when the summed seed-to-companion slew would exceed `budget` or the
    /// segment capacity is reached.
    pub fn select(
        &mut self,
        segment: &Segment,
        seed: &Source,
        start: ModifiedJulianDate,
        budget: Seconds,
        ledger: &VisitLedger,
        oracle: &dyn PositionOracle,
    ) -> Result<Vec<&'a Source>, OracleError> {
        let first_use = !self.associations.contains_key(&seed.name);
        let pool: Vec<&str> = match self.associations.get(&seed.name) {
            Some(previous) => previous
                .iter()
                .filter(|name| segment.is_visible(name))
                .map(String::as_str)
                .collect(),
            None => segment.visible.iter().map(String::as_str).collect(),
        };

        let seed_position = oracle.position_at(seed, segment.start)?;
        let mut ranked: Vec<(&'a Source, Seconds)> = Vec::new();
        for name in pool {
            if name == seed.name || self.excluded.contains(name) {
                continue;
            }
            if ledger.is_capped(name, self.n_visits) {
                continue;
            }
            if let Some(last) = ledger.last_visit(name) {
                let since = start.seconds_since(last).value();
                if since + SPACING_TOLERANCE_S < self.min_spacing.value() {
                    continue;
                }
            }
            let Some(source) = self.source(name) else {
                continue;
            };
            let position = oracle.position_at(source, segment.start)?;
            ranked.push((source, self.slew.slew_time(&seed_position, &position)));
        }
        ranked.sort_by(|a, b| {
            a.1.value()
                .total_cmp(&b.1.value())
                .then_with(|| a.0.name.cmp(&b.0.name))
        });

        let mut selected = Vec::new();
        let mut spent = 0.0;
        for (source, slew) in ranked {
            if selected.len() >= self.capacity {
                break;
            }
            spent += slew.value();
            if spent > budget.value() {
                break;
            }
            selected.push(source);
        }

        if first_use {
            self.associations.insert(
                seed.name.clone(),
                selected.iter().map(|s| s.name.clone()).collect(),
            );
        }
        Ok(selected)
    }

    /// Selects companions, sequences the segment and records every visit.
    ///
    /// The segment's sequence and achieved span are replaced by the result.
    #[allow(clippy::too_many_arguments)]
    pub fn plan_segment(
        &mut self,
        segment: &mut Segment,
        start: ModifiedJulianDate,
        budget: Seconds,
        ledger: &mut VisitLedger,
        params: &PlanningParameters,
        sequencer: &dyn SegmentSequencer,
        oracle: &dyn PositionOracle,
    ) -> Result<SequencedSegment, SequencerError> {
        let seed_name = segment
            .seed
            .clone()
            .ok_or_else(|| {
                SequencerError::Unavailable(format!("segment {} has no seed", segment.index))
            })?;
        let seed = self
            .source(&seed_name)
            .ok_or_else(|| OracleError::UnknownSource(seed_name.clone()))?;

        let companions = self.select(segment, seed, start, budget, ledger, oracle)?;
        let request = SequenceRequest {
            seed,
            candidates: companions,
            start,
            deadline: segment.end,
            cycle_time: params.cycle_time,
            cycle_count: params.cycle_count(),
            min_elevation: params.min_elevation,
        };
        let sequenced = sequencer.sequence(&request, oracle)?;

        for visit in &sequenced.visits {
            ledger.record(&visit.source, visit.start);
        }
        segment.sequence = sequenced.visits.clone();
        segment.achieved = Some(AchievedSpan {
            start: sequenced.start,
            end: sequenced.end,
            start_lst: sequenced.start_lst,
            end_lst: sequenced.end_lst,
        });
        log::debug!(
            "Segment {} seeded by {}: {} visits",
            segment.index,
            seed_name,
            sequenced.visits.len()
        );
        Ok(sequenced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::sequencer::NearestNeighbourSequencer;
    use crate::algorithms::test_support::{source, ScriptedOracle};
    use crate::config::PlannerConfig;
    use crate::core::domain::ObservingBlock;
    use qtty::Minutes;

    const HALF_HOUR: f64 = 1.0 / 48.0;

    fn params() -> PlanningParameters {
        let block =
            ObservingBlock::new(ModifiedJulianDate::new(500.0), ModifiedJulianDate::new(500.5))
                .unwrap();
        PlanningParameters::from_config(
            block,
            2,
            Minutes::new(2.0),
            Minutes::new(60.0),
            &PlannerConfig::default(),
        )
    }

    fn segment(index: usize, visible: &[&str], seed: &str) -> Segment {
        let start = ModifiedJulianDate::new(500.0 + index as f64 * HALF_HOUR);
        let end = ModifiedJulianDate::new(500.0 + (index + 1) as f64 * HALF_HOUR);
        let mut segment = Segment::new(index, start, end);
        segment.visible = visible.iter().map(|s| s.to_string()).collect();
        segment.seed = Some(seed.to_string());
        segment
    }

    fn oracle() -> ScriptedOracle {
        ScriptedOracle::new()
            .always_up("seed", 0.0, 40.0)
            .always_up("near", 5.0, 40.0)
            .always_up("mid", 20.0, 40.0)
            .always_up("far", 90.0, 40.0)
            .always_up("other", 10.0, 40.0)
    }

    fn catalogue() -> Vec<Source> {
        ["seed", "near", "mid", "far", "other"].iter().map(|n| source(n)).collect()
    }

    fn names(sources: &[&Source]) -> Vec<String> {
        sources.iter().map(|s| s.name.clone()).collect()
    }

    #[test]
    fn test_capacity() {
        assert_eq!(segment_capacity(Seconds::new(1_800.0), Seconds::new(140.0), 0.85), 10);
        assert_eq!(segment_capacity(Seconds::new(100.0), Seconds::new(140.0), 0.85), 0);
        assert_eq!(segment_capacity(Seconds::new(100.0), Seconds::new(0.0), 0.85), 0);
    }

    #[test]
    fn test_nearest_first_within_budget() {
        let sources = catalogue();
        let p = params();
        let mut selector =
            CompanionSelector::new(&sources, BTreeSet::new(), &p, SlewModel::default(), 0.85);
        let seg = segment(0, &["seed", "near", "mid", "far"], "seed");
        let ledger = VisitLedger::new();
        let o = oracle();

        let all = selector
            .select(&seg, &sources[0], seg.start, Seconds::new(1e6), &ledger, &o)
            .unwrap();
        assert_eq!(names(&all), vec!["near", "mid", "far"]);

        // near ~ 9 s, near + mid ~ 42 s
        let mut selector =
            CompanionSelector::new(&sources, BTreeSet::new(), &p, SlewModel::default(), 0.85);
        let some = selector
            .select(&seg, &sources[0], seg.start, Seconds::new(30.0), &ledger, &o)
            .unwrap();
        assert_eq!(names(&some), vec!["near"]);
    }

    #[test]
    fn test_exclusions() {
        let sources = catalogue();
        let p = params();
        let excluded: BTreeSet<String> = ["mid".to_string()].into_iter().collect();
        let mut selector =
            CompanionSelector::new(&sources, excluded, &p, SlewModel::default(), 0.85);
        let seg = segment(4, &["seed", "near", "mid", "far", "other"], "seed");
        let o = oracle();

        let mut ledger = VisitLedger::new();
        // Capped
        ledger.record("near", ModifiedJulianDate::new(499.0));
        ledger.record("near", ModifiedJulianDate::new(499.1));
        // Visited 30 minutes before the segment start
        ledger.record("other", seg.start.add_seconds(Seconds::new(-1_800.0)));

        let selected = selector
            .select(&seg, &sources[0], seg.start, Seconds::new(1e6), &ledger, &o)
            .unwrap();
        assert_eq!(names(&selected), vec!["far"]);
    }

    #[test]
    fn test_reused_seed_draws_from_first_companions() {
        let sources = catalogue();
        let p = params();
        let mut selector =
            CompanionSelector::new(&sources, BTreeSet::new(), &p, SlewModel::default(), 0.85);
        let o = oracle();
        let ledger = VisitLedger::new();

        let first = segment(0, &["seed", "near", "far"], "seed");
        selector
            .select(&first, &sources[0], first.start, Seconds::new(1e6), &ledger, &o)
            .unwrap();
        let expected: BTreeSet<String> =
            ["far".to_string(), "near".to_string()].into_iter().collect();
        assert_eq!(selector.association("seed"), Some(&expected));

        // "near" is no longer visible, "mid" and "other" were never associated
        let later = segment(2, &["seed", "mid", "far", "other"], "seed");
        let selected = selector
            .select(&later, &sources[0], later.start, Seconds::new(1e6), &ledger, &o)
            .unwrap();
        assert_eq!(names(&selected), vec!["far"]);
        assert_eq!(selector.association("seed"), Some(&expected));
    }

    #[test]
    fn test_plan_segment_records_visits() {
        let sources = catalogue();
        let p = params();
        let mut selector =
            CompanionSelector::new(&sources, BTreeSet::new(), &p, SlewModel::default(), 0.85);
        let o = oracle();
        let mut ledger = VisitLedger::new();
        let mut seg = segment(0, &["seed", "near", "mid"], "seed");
        let start = seg.start;

        let sequenced = selector
            .plan_segment(
                &mut seg,
                start,
                Seconds::new(1e6),
                &mut ledger,
                &p,
                &NearestNeighbourSequencer::default(),
                &o,
            )
            .unwrap();

        assert_eq!(sequenced.visits.len(), 3);
        assert_eq!(seg.sequence.len(), 3);
        assert!(seg.achieved.is_some());
        assert_eq!(ledger.count("seed"), 1);
        assert_eq!(ledger.count("near"), 1);
        assert_eq!(ledger.count("mid"), 1);
        assert_eq!(ledger.count("far"), 0);
    }

    #[test]
    fn test_plan_segment_without_seed_fails() {
        let sources = catalogue();
        let p = params();
        let mut selector =
            CompanionSelector::new(&sources, BTreeSet::new(), &p, SlewModel::default(), 0.85);
        let mut seg = segment(0, &["seed"], "seed");
        seg.seed = None;
        let start = seg.start;
        let result = selector.plan_segment(
            &mut seg,
            start,
            Seconds::new(1e6),
            &mut VisitLedger::new(),
            &p,
            &NearestNeighbourSequencer::default(),
            &oracle(),
        );
        assert!(matches!(result, Err(SequencerError::Unavailable(_))));
    }
}
