//! Domain models for sources, observing windows, segments and schedule entries.
//!
//! Instants are [`ModifiedJulianDate`] values and physical quantities use the
//! `qtty` types, so every position query carries its own explicit instant.

use std::collections::{BTreeSet, HashMap};

use qtty::{Degrees, Hours, Minute, Seconds};
use serde::{Deserialize, Serialize};

use super::error::{PlannerError, PlannerResult};
use crate::time::ModifiedJulianDate;

/// Reference epoch of catalogue positions (Julian year).
pub const J2000_EPOCH: f64 = 2000.0;

/// A fixed sky source from the catalogue.
///
/// # Examples
///
/// ```
/// use visit_planner::core::domain::Source;
///
/// let source = Source::new("1934-638", 294.854, -63.713);
/// assert_eq!(source.name, "1934-638");
/// assert_eq!(source.ra.value(), 294.854);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    /// Right ascension, degrees.
    pub ra: Degrees,
    /// Declination, degrees.
    pub dec: Degrees,
    /// Reference epoch of the position (Julian year).
    pub epoch: f64,
}

impl Source {
    /// Creates a J2000 source from right ascension and declination in degrees.
    pub fn new(name: impl Into<String>, ra_deg: f64, dec_deg: f64) -> Self {
        Self {
            name: name.into(),
            ra: Degrees::new(ra_deg),
            dec: Degrees::new(dec_deg),
            epoch: J2000_EPOCH,
        }
    }
}

/// Azimuth/elevation of a source at a specific instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HorizontalPosition {
    pub azimuth: Degrees,
    pub elevation: Degrees,
}

impl HorizontalPosition {
    pub fn new(azimuth_deg: f64, elevation_deg: f64) -> Self {
        Self {
            azimuth: Degrees::new(azimuth_deg),
            elevation: Degrees::new(elevation_deg),
        }
    }

    /// Strictly above `threshold`.
    pub fn is_above(&self, threshold: Degrees) -> bool {
        self.elevation.value() > threshold.value()
    }
}

/// The set of sources available to one planning run, unique by name.
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    sources: Vec<Source>,
    index: HashMap<String, usize>,
}

impl Catalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalogue, keeping the first source of any duplicated name.
    pub fn from_sources<I: IntoIterator<Item = Source>>(sources: I) -> Self {
        let mut catalogue = Self::new();
        for source in sources {
            if !catalogue.push(source.clone()) {
                log::warn!("Duplicate source '{}' ignored", source.name);
            }
        }
        catalogue
    }

    /// Adds a source; returns `false` if the name is already present.
    pub fn push(&mut self, source: Source) -> bool {
        if self.index.contains_key(&source.name) {
            return false;
        }
        self.index.insert(source.name.clone(), self.sources.len());
        self.sources.push(source);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Source> {
        self.index.get(name).map(|&i| &self.sources[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter()
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// The observing block as requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservingBlock {
    pub start: ModifiedJulianDate,
    pub end: ModifiedJulianDate,
}

impl ObservingBlock {
    /// Creates a block; fails when `end <= start`.
    pub fn new(start: ModifiedJulianDate, end: ModifiedJulianDate) -> PlannerResult<Self> {
        if end.value() <= start.value() {
            return Err(PlannerError::InvalidWindow(format!(
                "block end {} is not after block start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> Seconds {
        self.end.seconds_since(self.start)
    }
}

/// The part of the block available to the planner.
///
/// The calibration margin is removed from both ends of the block: the leading
/// margin holds the bandpass calibration dwell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservingWindow {
    pub start: ModifiedJulianDate,
    pub end: ModifiedJulianDate,
}

impl ObservingWindow {
    /// Creates a window; fails when `end <= start`.
    pub fn new(start: ModifiedJulianDate, end: ModifiedJulianDate) -> PlannerResult<Self> {
        if end.value() <= start.value() {
            return Err(PlannerError::InvalidWindow(format!(
                "window end {} is not after window start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// Shrinks `block` by `margin` at both ends.
    pub fn from_block(block: &ObservingBlock, margin: Seconds) -> PlannerResult<Self> {
        if margin.value() < 0.0 {
            return Err(PlannerError::InvalidParameter(format!(
                "calibration margin must not be negative, got {} s",
                margin.value()
            )));
        }
        let start = block.start.add_seconds(margin);
        let end = block.end.add_seconds(-margin);
        Self::new(start, end).map_err(|_| {
            PlannerError::InvalidWindow(format!(
                "block of {:.1} min leaves no time after removing a {:.1} min \
                 calibration margin at both ends",
                block.duration().to::<Minute>().value(),
                margin.to::<Minute>().value()
            ))
        })
    }

    pub fn duration(&self) -> Seconds {
        self.end.seconds_since(self.start)
    }

    pub fn contains(&self, at: ModifiedJulianDate) -> bool {
        at.value() >= self.start.value() && at.value() <= self.end.value()
    }
}

/// One scheduled observation of a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub source: String,
    pub start: ModifiedJulianDate,
    pub end: ModifiedJulianDate,
    /// Position at the start of the visit.
    pub position: HorizontalPosition,
}

/// Time span a sequenced segment actually covers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AchievedSpan {
    pub start: ModifiedJulianDate,
    pub end: ModifiedJulianDate,
    pub start_lst: Hours,
    pub end_lst: Hours,
}

/// A fixed-width slice of the observing window.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub index: usize,
    /// Representative instant of the segment.
    pub start: ModifiedJulianDate,
    pub end: ModifiedJulianDate,
    /// Sources above the minimum elevation at the segment midpoint.
    pub visible: BTreeSet<String>,
    pub seed: Option<String>,
    pub sequence: Vec<Visit>,
    pub achieved: Option<AchievedSpan>,
}

impl Segment {
    pub fn new(index: usize, start: ModifiedJulianDate, end: ModifiedJulianDate) -> Self {
        Self {
            index,
            start,
            end,
            visible: BTreeSet::new(),
            seed: None,
            sequence: Vec::new(),
            achieved: None,
        }
    }

    pub fn midpoint(&self) -> ModifiedJulianDate {
        ModifiedJulianDate::new(0.5 * (self.start.value() + self.end.value()))
    }

    pub fn width(&self) -> Seconds {
        self.end.seconds_since(self.start)
    }

    pub fn is_seeded(&self) -> bool {
        self.seed.is_some()
    }

    pub fn is_visible(&self, name: &str) -> bool {
        self.visible.contains(name)
    }

    /// Drops the visit sequence and achieved span of a previous pass.
    pub fn clear_sequence(&mut self) {
        self.sequence.clear();
        self.achieved = None;
    }
}

/// Visits recorded so far in one refinement pass, keyed by source name.
#[derive(Debug, Clone, Default)]
pub struct VisitLedger {
    visits: HashMap<String, Vec<ModifiedJulianDate>>,
}

impl VisitLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.visits.clear();
    }

    pub fn record(&mut self, name: &str, at: ModifiedJulianDate) {
        self.visits.entry(name.to_string()).or_default().push(at);
    }

    pub fn count(&self, name: &str) -> usize {
        self.visits.get(name).map_or(0, Vec::len)
    }

    pub fn last_visit(&self, name: &str) -> Option<ModifiedJulianDate> {
        self.visits
            .get(name)
            .and_then(|visits| visits.iter().copied().reduce(ModifiedJulianDate::max))
    }

    pub fn is_capped(&self, name: &str, cap: usize) -> bool {
        self.count(name) >= cap
    }

    /// Names with at least one visit, with their visit counts.
    pub fn counts(&self) -> impl Iterator<Item = (&str, usize)> {
        self.visits.iter().map(|(name, v)| (name.as_str(), v.len()))
    }
}

/// Kind of schedule entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A single-source observation.
    Dwell,
    /// A segment visiting a seed and its companions.
    Mosaic,
}

/// Reference position of a schedule entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRef {
    pub name: String,
    pub ra: Degrees,
    pub dec: Degrees,
}

impl From<&Source> for PositionRef {
    fn from(source: &Source) -> Self {
        Self {
            name: source.name.clone(),
            ra: source.ra,
            dec: source.dec,
        }
    }
}

/// One entry of the emitted schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub source_ref: String,
    pub position_ref: PositionRef,
    pub kind: EntryKind,
    pub scan_length_minutes: f64,
    pub start: ModifiedJulianDate,
    pub end: ModifiedJulianDate,
    pub start_lst: Hours,
    pub end_lst: Hours,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub visits: Vec<Visit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mjd(v: f64) -> ModifiedJulianDate {
        ModifiedJulianDate::new(v)
    }

    #[test]
    fn test_window_rejects_inverted_bounds() {
        assert!(ObservingWindow::new(mjd(10.0), mjd(10.0)).is_err());
        assert!(ObservingWindow::new(mjd(10.0), mjd(9.0)).is_err());
        assert!(ObservingBlock::new(mjd(10.0), mjd(9.5)).is_err());
    }

    #[test]
    fn test_window_from_block_removes_margin_at_both_ends() {
        let block = ObservingBlock::new(mjd(60_000.0), mjd(60_000.25)).unwrap();
        let window = ObservingWindow::from_block(&block, Seconds::new(600.0)).unwrap();
        assert!((window.duration().value() - (6.0 * 3_600.0 - 1_200.0)).abs() < 1e-3);
        assert!(window.start.value() > block.start.value());
        assert!(window.end.value() < block.end.value());
    }

    #[test]
    fn test_window_from_block_too_short() {
        let block = ObservingBlock::new(mjd(60_000.0), mjd(60_000.01)).unwrap();
        let result = ObservingWindow::from_block(&block, Seconds::new(600.0));
        assert!(matches!(result, Err(PlannerError::InvalidWindow(_))));
    }

    #[test]
    fn test_catalogue_keeps_first_duplicate() {
        let catalogue = Catalogue::from_sources(vec![
            Source::new("a", 10.0, -40.0),
            Source::new("b", 20.0, -40.0),
            Source::new("a", 30.0, -40.0),
        ]);
        assert_eq!(catalogue.len(), 2);
        assert_eq!(catalogue.get("a").unwrap().ra.value(), 10.0);
        assert!(catalogue.contains("b"));
        assert!(catalogue.get("c").is_none());
    }

    #[test]
    fn test_ledger_counts_and_last_visit() {
        let mut ledger = VisitLedger::new();
        ledger.record("a", mjd(2.0));
        ledger.record("a", mjd(1.0));
        assert_eq!(ledger.count("a"), 2);
        assert_eq!(ledger.count("b"), 0);
        assert_eq!(ledger.last_visit("a"), Some(mjd(2.0)));
        assert!(ledger.is_capped("a", 2));
        assert!(!ledger.is_capped("a", 3));
        ledger.reset();
        assert_eq!(ledger.count("a"), 0);
    }

    #[test]
    fn test_segment_midpoint_and_width() {
        let segment = Segment::new(0, mjd(60_000.0), mjd(60_000.0 + 1.0 / 48.0));
        assert!((segment.width().value() - 1_800.0).abs() < 1e-3);
        assert!((segment.midpoint().value() - (60_000.0 + 1.0 / 96.0)).abs() < 1e-9);
        assert!(!segment.is_seeded());
    }

    #[test]
    fn test_horizontal_position_threshold_is_strict() {
        let position = HorizontalPosition::new(100.0, 12.0);
        assert!(!position.is_above(Degrees::new(12.0)));
        assert!(position.is_above(Degrees::new(11.9)));
    }
}
