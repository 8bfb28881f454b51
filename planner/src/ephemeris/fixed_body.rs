//! Analytic positions of fixed J2000 sources.
//!
//! Positions are computed from the mean sidereal time and the spherical
//! hour-angle transform. Precession, nutation, aberration and refraction are
//! ignored; over a single observing block the error is far below the
//! elevation margins the planner works with.

use qtty::{Degrees, Hours, Seconds};
use serde::{Deserialize, Serialize};

use super::{HorizonCrossing, PositionOracle};
use crate::core::domain::{HorizontalPosition, Source};
use crate::core::error::OracleError;
use crate::time::{local_sidereal_time, ModifiedJulianDate, SIDEREAL_RATE};

const HOURS_PER_DAY: f64 = 24.0;

/// Geographic site of the telescope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observatory {
    pub name: String,
    /// Geodetic latitude, north positive.
    pub latitude: Degrees,
    /// Longitude, east positive.
    pub longitude: Degrees,
    #[serde(default)]
    pub elevation_m: f64,
}

impl Observatory {
    /// Australia Telescope Compact Array, Narrabri.
    pub fn atca() -> Self {
        Self {
            name: "ATCA".to_string(),
            latitude: Degrees::new(-30.314_98),
            longitude: Degrees::new(149.563_94),
            elevation_m: 240.0,
        }
    }
}

impl Default for Observatory {
    fn default() -> Self {
        Self::atca()
    }
}

/// Position oracle for fixed sources seen from one observatory.
#[derive(Debug, Clone, Default)]
pub struct FixedBodyOracle {
    observatory: Observatory,
}

impl FixedBodyOracle {
    pub fn new(observatory: Observatory) -> Self {
        Self { observatory }
    }

    pub fn observatory(&self) -> &Observatory {
        &self.observatory
    }

    /// Hour angle of `source` at `at`, `[0, 24)` hours.
    pub fn hour_angle(&self, source: &Source, at: ModifiedJulianDate) -> Hours {
        let lst = self.sidereal_time(at).value();
        Hours::new((lst - source.ra.value() / 15.0).rem_euclid(HOURS_PER_DAY))
    }

    /// Half the diurnal arc above `horizon`, or the reason there is none.
    fn semi_diurnal_arc(
        &self,
        source: &Source,
        horizon: Degrees,
    ) -> Result<Hours, HorizonCrossing> {
        let phi = self.observatory.latitude.value().to_radians();
        let delta = source.dec.value().to_radians();
        let h0 = horizon.value().to_radians();

        let denominator = phi.cos() * delta.cos();
        let numerator = h0.sin() - phi.sin() * delta.sin();
        if denominator.abs() < 1e-12 {
            // Source at the celestial pole or observatory at a geographic pole
            return Err(if numerator < 0.0 {
                HorizonCrossing::AlwaysUp
            } else {
                HorizonCrossing::NeverUp
            });
        }
        let cos_h0 = numerator / denominator;
        if cos_h0 < -1.0 {
            Err(HorizonCrossing::AlwaysUp)
        } else if cos_h0 > 1.0 {
            Err(HorizonCrossing::NeverUp)
        } else {
            Ok(Hours::new(cos_h0.acos().to_degrees() / 15.0))
        }
    }

    /// Next instant the hour angle of `source` equals `target`.
    fn next_hour_angle(
        &self,
        source: &Source,
        target: f64,
        after: ModifiedJulianDate,
    ) -> ModifiedJulianDate {
        let current = self.hour_angle(source, after).value();
        let mut delta = (target - current).rem_euclid(HOURS_PER_DAY);
        if delta < 1e-9 {
            delta += HOURS_PER_DAY;
        }
        after.add_seconds(Seconds::new(delta * 3_600.0 / SIDEREAL_RATE))
    }

    fn check(&self, source: &Source) -> Result<(), OracleError> {
        if source.ra.value().is_finite() && source.dec.value().is_finite() {
            Ok(())
        } else {
            Err(OracleError::UnknownSource(source.name.clone()))
        }
    }
}

impl PositionOracle for FixedBodyOracle {
    fn position_at(
        &self,
        source: &Source,
        at: ModifiedJulianDate,
    ) -> Result<HorizontalPosition, OracleError> {
        self.check(source)?;
        let phi = self.observatory.latitude.value().to_radians();
        let delta = source.dec.value().to_radians();
        let hour = (self.hour_angle(source, at).value() * 15.0).to_radians();

        let sin_alt =
            (phi.sin() * delta.sin() + phi.cos() * delta.cos() * hour.cos()).clamp(-1.0, 1.0);
        let altitude = sin_alt.asin();

        let y = -delta.cos() * hour.sin();
        let x = delta.sin() * phi.cos() - delta.cos() * phi.sin() * hour.cos();
        let azimuth = y.atan2(x).to_degrees().rem_euclid(360.0);

        if !(azimuth.is_finite() && altitude.is_finite()) {
            return Err(OracleError::PositionUnavailable {
                name: source.name.clone(),
                mjd: at.value(),
            });
        }
        Ok(HorizontalPosition::new(azimuth, altitude.to_degrees()))
    }

    fn next_rise(
        &self,
        source: &Source,
        horizon: Degrees,
        after: ModifiedJulianDate,
    ) -> Result<HorizonCrossing, OracleError> {
        self.check(source)?;
        Ok(match self.semi_diurnal_arc(source, horizon) {
            Ok(arc) => HorizonCrossing::At(self.next_hour_angle(source, -arc.value(), after)),
            Err(crossing) => crossing,
        })
    }

    fn next_set(
        &self,
        source: &Source,
        horizon: Degrees,
        after: ModifiedJulianDate,
    ) -> Result<HorizonCrossing, OracleError> {
        self.check(source)?;
        Ok(match self.semi_diurnal_arc(source, horizon) {
            Ok(arc) => HorizonCrossing::At(self.next_hour_angle(source, arc.value(), after)),
            Err(crossing) => crossing,
        })
    }

    fn sidereal_time(&self, at: ModifiedJulianDate) -> Hours {
        local_sidereal_time(at, self.observatory.longitude)
    }
}
