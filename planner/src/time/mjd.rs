use std::fmt;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use qtty::{Day, Days, Second, Seconds};
use serde::{Deserialize, Serialize};

/// MJD of the Unix epoch, 1970-01-01T00:00:00Z.
pub const UNIX_EPOCH_MJD: f64 = 40_587.0;

/// Offset between Julian Date and Modified Julian Date.
pub const MJD_TO_JD: f64 = 2_400_000.5;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Format of observing block instants, e.g. `2017-05-02:14:30:00` (UTC).
pub const BLOCK_INSTANT_FORMAT: &str = "%Y-%m-%d:%H:%M:%S";

/// An instant expressed as a Modified Julian Date (UTC).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ModifiedJulianDate(Days);

impl ModifiedJulianDate {
    /// Create a new MJD value.
    pub fn new<V: Into<Days>>(v: V) -> Self {
        Self(v.into())
    }

    /// Raw MJD value as f64.
    pub fn value(&self) -> f64 {
        self.0.value()
    }

    /// Julian Date of this instant.
    pub fn julian_date(&self) -> f64 {
        self.value() + MJD_TO_JD
    }

    /// Convert a UTC datetime into an MJD instant.
    pub fn from_utc(datetime: DateTime<Utc>) -> Self {
        let seconds =
            datetime.timestamp() as f64 + f64::from(datetime.timestamp_subsec_nanos()) * 1e-9;
        Self::new(seconds / SECONDS_PER_DAY + UNIX_EPOCH_MJD)
    }

    /// Convert back to a UTC datetime, `None` when out of chrono's range.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        let seconds = (self.value() - UNIX_EPOCH_MJD) * SECONDS_PER_DAY;
        if !seconds.is_finite() {
            return None;
        }
        let whole = seconds.floor();
        let nanos = (((seconds - whole) * 1e9).round() as u32).min(999_999_999);
        DateTime::from_timestamp(whole as i64, nanos)
    }

    /// This instant shifted by `offset`.
    pub fn add_seconds(self, offset: Seconds) -> Self {
        Self(self.0 + offset.to::<Day>())
    }

    /// Elapsed time from `earlier` to `self` (negative if `earlier` is later).
    pub fn seconds_since(self, earlier: ModifiedJulianDate) -> Seconds {
        (self.0 - earlier.0).to::<Second>()
    }

    /// The later of two instants.
    pub fn max(self, other: ModifiedJulianDate) -> Self {
        if other.value() > self.value() {
            other
        } else {
            self
        }
    }

    /// The earlier of two instants.
    pub fn min(self, other: ModifiedJulianDate) -> Self {
        if other.value() < self.value() {
            other
        } else {
            self
        }
    }
}

impl From<f64> for ModifiedJulianDate {
    fn from(v: f64) -> Self {
        ModifiedJulianDate::new(v)
    }
}

impl fmt::Display for ModifiedJulianDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_utc() {
            Some(datetime) => write!(f, "{}", datetime.format("%Y-%m-%d %H:%M:%S UTC")),
            None => write!(f, "MJD {:.6}", self.value()),
        }
    }
}

/// Parse an observing block instant in [`BLOCK_INSTANT_FORMAT`] (UTC).
///
/// # Example
///
/// ```
/// use visit_planner::time::parse_block_instant;
///
/// let start = parse_block_instant("1970-01-02:00:00:00").unwrap();
/// assert_eq!(start.value(), 40_588.0);
/// ```
pub fn parse_block_instant(text: &str) -> Result<ModifiedJulianDate> {
    let naive = NaiveDateTime::parse_from_str(text.trim(), BLOCK_INSTANT_FORMAT)
        .with_context(|| {
            format!(
                "Invalid block instant '{}', expected yyyy-mm-dd:HH:MM:SS",
                text
            )
        })?;
    Ok(ModifiedJulianDate::from_utc(Utc.from_utc_datetime(&naive)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_known_mjd_conversion() {
        // MJD 59580.0 = 2022-01-01 00:00:00 UTC
        let datetime = ModifiedJulianDate::new(59_580.0).to_utc().unwrap();
        assert_eq!(datetime.year(), 2022);
        assert_eq!(datetime.month(), 1);
        assert_eq!(datetime.day(), 1);
        assert_eq!(datetime.hour(), 0);
    }

    #[test]
    fn test_from_utc_matches_epoch() {
        let epoch = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(ModifiedJulianDate::from_utc(epoch).value(), UNIX_EPOCH_MJD);
    }

    #[test]
    fn test_add_and_difference() {
        let start = ModifiedJulianDate::new(60_000.0);
        let later = start.add_seconds(Seconds::new(3_600.0));
        assert!((later.value() - 60_000.0 - 1.0 / 24.0).abs() < 1e-9);
        assert!((later.seconds_since(start).value() - 3_600.0).abs() < 1e-4);
        assert!((start.seconds_since(later).value() + 3_600.0).abs() < 1e-4);
    }

    #[test]
    fn test_parse_block_instant() {
        let instant = parse_block_instant("2022-01-01:06:00:00").unwrap();
        assert!((instant.value() - 59_580.25).abs() < 1e-9);
    }

    #[test]
    fn test_parse_block_instant_rejects_garbage() {
        assert!(parse_block_instant("2022-01-01 06:00").is_err());
        assert!(parse_block_instant("").is_err());
    }

    #[test]
    fn test_min_max() {
        let a = ModifiedJulianDate::new(1.0);
        let b = ModifiedJulianDate::new(2.0);
        assert_eq!(a.max(b), b);
        assert_eq!(a.min(b), a);
    }
}
