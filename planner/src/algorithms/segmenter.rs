//! Partition of the observing window into fixed-width segments.

use qtty::{Degrees, Seconds};

use crate::core::domain::{ObservingWindow, Segment, Source};
use crate::ephemeris::PositionOracle;

/// Splits `window` into contiguous segments of `width` and records which
/// `sources` are above `min_elevation` at each segment midpoint.
///
/// The last segment is shortened to end with the window. Segments where no
/// source is up are kept; they simply cannot be seeded.
pub fn partition_window(
    window: &ObservingWindow,
    width: Seconds,
    sources: &[Source],
    min_elevation: Degrees,
    oracle: &dyn PositionOracle,
) -> Vec<Segment> {
    let total = window.duration().value();
    let count = if width.value() > 0.0 {
        ((total / width.value()) - 1e-9).ceil().max(1.0) as usize
    } else {
        1
    };

    let mut segments = Vec::with_capacity(count);
    for index in 0..count {
        let start = window.start.add_seconds(width * index as f64);
        let end = if index + 1 == count {
            window.end
        } else {
            window.start.add_seconds(width * (index + 1) as f64).min(window.end)
        };

        let mut segment = Segment::new(index, start, end);
        let midpoint = segment.midpoint();
        for source in sources {
            match oracle.position_at(source, midpoint) {
                Ok(position) if position.is_above(min_elevation) => {
                    segment.visible.insert(source.name.clone());
                }
                Ok(_) => {}
                Err(e) => log::warn!(
                    "Treating {} as not visible in segment {}: {}",
                    source.name,
                    index,
                    e
                ),
            }
        }
        segments.push(segment);
    }

    let empty = segments.iter().filter(|s| s.visible.is_empty()).count();
    log::info!(
        "Partitioned window into {} segments of {:.0} s ({} with no visible source)",
        segments.len(),
        width.value(),
        empty
    );
    segments
}

/// Number of segments in which each source is visible.
pub fn segments_up(segments: &[Segment], name: &str) -> usize {
    segments.iter().filter(|s| s.is_visible(name)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::test_support::{source, ScriptedOracle};
    use crate::time::ModifiedJulianDate;

    const HOUR: f64 = 1.0 / 24.0;

    fn window(hours: f64) -> ObservingWindow {
        ObservingWindow::new(
            ModifiedJulianDate::new(200.0),
            ModifiedJulianDate::new(200.0 + hours * HOUR),
        )
        .unwrap()
    }

    #[test]
    fn test_exact_partition() {
        let oracle = ScriptedOracle::new();
        let segments = partition_window(
            &window(2.0),
            Seconds::new(1_800.0),
            &[],
            Degrees::new(12.0),
            &oracle,
        );
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[0].start, ModifiedJulianDate::new(200.0));
        assert_eq!(segments[3].end, window(2.0).end);
        for pair in segments.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert!(segments.iter().all(|s| s.visible.is_empty()));
    }

    #[test]
    fn test_last_segment_is_truncated() {
        let oracle = ScriptedOracle::new();
        let segments = partition_window(
            &window(1.25),
            Seconds::new(1_800.0),
            &[],
            Degrees::new(12.0),
            &oracle,
        );
        assert_eq!(segments.len(), 3);
        assert!((segments[2].width().value() - 900.0).abs() < 1e-3);
    }

    #[test]
    fn test_visibility_at_midpoint() {
        // Up for the second half hour only; midpoint of segment 1 is 200 + 0.75 h
        let oracle = ScriptedOracle::new()
            .up_between("a", 0.0, 40.0, &[(200.0 + 0.5 * HOUR, 200.0 + HOUR)])
            .always_up("b", 90.0, 40.0)
            .failing("c");
        let sources = vec![source("a"), source("b"), source("c")];
        let segments = partition_window(
            &window(1.0),
            Seconds::new(1_800.0),
            &sources,
            Degrees::new(12.0),
            &oracle,
        );

        assert_eq!(segments.len(), 2);
        assert!(!segments[0].is_visible("a"));
        assert!(segments[1].is_visible("a"));
        assert!(segments.iter().all(|s| s.is_visible("b")));
        assert!(segments.iter().all(|s| !s.is_visible("c")));
        assert_eq!(segments_up(&segments, "a"), 1);
        assert_eq!(segments_up(&segments, "b"), 2);
    }
}
