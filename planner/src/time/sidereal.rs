//! Sidereal time helpers.
//!
//! Segment boundaries are compared in local sidereal time, the same clock the
//! sequencer reports achieved spans in. Sidereal hours wrap every 24 h, so a
//! gap between two readings has two interpretations; [`sidereal_gap`] picks
//! the one closest to zero.

use qtty::{Degrees, Hours, Seconds};

use super::mjd::ModifiedJulianDate;

/// Ratio of sidereal to solar time rates.
pub const SIDEREAL_RATE: f64 = 1.002_737_909_350_795;

const J2000_JD: f64 = 2_451_545.0;
const HOURS_PER_DAY: f64 = 24.0;

/// Greenwich mean sidereal time in hours, `[0, 24)`.
pub fn gmst_hours(at: ModifiedJulianDate) -> Hours {
    let days = at.julian_date() - J2000_JD;
    Hours::new((18.697_374_558 + 24.065_709_824_419_08 * days).rem_euclid(HOURS_PER_DAY))
}

/// Local mean sidereal time at an east-positive `longitude`, `[0, 24)`.
pub fn local_sidereal_time(at: ModifiedJulianDate, longitude: Degrees) -> Hours {
    Hours::new((gmst_hours(at).value() + longitude.value() / 15.0).rem_euclid(HOURS_PER_DAY))
}

/// Signed sidereal gap from `from` to `to`.
///
/// Both the forward reading `(to - from) mod 24` and its backward counterpart
/// are candidates; the one with the smaller magnitude wins. Result lies in
/// `[-12, 12]` hours.
pub fn sidereal_gap(from: Hours, to: Hours) -> Hours {
    let forward = (to.value() - from.value()).rem_euclid(HOURS_PER_DAY);
    let backward = forward - HOURS_PER_DAY;
    if forward.abs() <= backward.abs() {
        Hours::new(forward)
    } else {
        Hours::new(backward)
    }
}

/// Convert a sidereal-time interval into elapsed solar seconds.
pub fn sidereal_to_solar(interval: Hours) -> Seconds {
    Seconds::new(interval.value() * 3_600.0 / SIDEREAL_RATE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gmst_at_j2000() {
        // 2000-01-01 12:00 UT, GMST ~ 18.697 h
        let gmst = gmst_hours(ModifiedJulianDate::new(51_544.5));
        assert!((gmst.value() - 18.697_374_558).abs() < 1e-6);
    }

    #[test]
    fn test_gmst_advances_faster_than_solar() {
        let t0 = ModifiedJulianDate::new(60_000.0);
        let t1 = t0.add_seconds(Seconds::new(3_600.0));
        let advance = sidereal_gap(gmst_hours(t0), gmst_hours(t1));
        assert!((advance.value() - SIDEREAL_RATE).abs() < 1e-6);
    }

    #[test]
    fn test_local_sidereal_time_wraps() {
        let at = ModifiedJulianDate::new(60_000.0);
        let lst = local_sidereal_time(at, Degrees::new(359.0));
        assert!(lst.value() >= 0.0 && lst.value() < 24.0);
    }

    #[test]
    fn test_sidereal_gap_picks_nearest_wrap() {
        assert!((sidereal_gap(Hours::new(23.5), Hours::new(0.5)).value() - 1.0).abs() < 1e-12);
        assert!((sidereal_gap(Hours::new(0.5), Hours::new(23.5)).value() + 1.0).abs() < 1e-12);
        assert!((sidereal_gap(Hours::new(3.0), Hours::new(5.0)).value() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_sidereal_to_solar() {
        let solar = sidereal_to_solar(Hours::new(SIDEREAL_RATE));
        assert!((solar.value() - 3_600.0).abs() < 1e-9);
    }
}
