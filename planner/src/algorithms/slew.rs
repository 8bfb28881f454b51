//! Antenna slew kinematics.
//!
//! Each axis follows a trapezoidal velocity profile: constant acceleration up
//! to the axis speed limit, cruise, symmetric deceleration. Short moves never
//! reach the speed limit and follow a triangular profile instead. The axes
//! move independently, so a slew takes as long as its slower axis.
//!
//! Azimuth distance is the plain absolute difference; a move from 350 deg to
//! 10 deg is treated as 340 deg, not 20 deg.

use qtty::Seconds;
use serde::{Deserialize, Serialize};

use crate::core::domain::HorizontalPosition;

/// Mount speed limits and acceleration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlewModel {
    #[serde(default = "default_azimuth_rate")]
    pub azimuth_rate_deg_per_min: f64,
    #[serde(default = "default_elevation_rate")]
    pub elevation_rate_deg_per_min: f64,
    #[serde(default = "default_acceleration")]
    pub acceleration_deg_per_min2: f64,
}

fn default_azimuth_rate() -> f64 {
    38.0
}

fn default_elevation_rate() -> f64 {
    19.0
}

fn default_acceleration() -> f64 {
    800.0
}

impl Default for SlewModel {
    fn default() -> Self {
        Self {
            azimuth_rate_deg_per_min: default_azimuth_rate(),
            elevation_rate_deg_per_min: default_elevation_rate(),
            acceleration_deg_per_min2: default_acceleration(),
        }
    }
}

impl SlewModel {
    /// Time to move the mount from `from` to `to`.
    pub fn slew_time(&self, from: &HorizontalPosition, to: &HorizontalPosition) -> Seconds {
        let azimuth = (to.azimuth.value() - from.azimuth.value()).abs();
        let elevation = (to.elevation.value() - from.elevation.value()).abs();
        let acceleration = self.acceleration_deg_per_min2;
        let azimuth_minutes = axis_minutes(azimuth, self.azimuth_rate_deg_per_min, acceleration);
        let elevation_minutes =
            axis_minutes(elevation, self.elevation_rate_deg_per_min, acceleration);
        Seconds::new(azimuth_minutes.max(elevation_minutes) * 60.0)
    }
}

/// Minutes to cover `distance` degrees on one axis.
fn axis_minutes(distance: f64, rate: f64, acceleration: f64) -> f64 {
    if distance <= 0.0 {
        return 0.0;
    }
    let crossover = 0.5 * rate * rate / acceleration;
    if distance <= crossover {
        2.0 * (distance / acceleration).sqrt()
    } else {
        rate / acceleration + (distance - crossover) / rate
    }
}

/// Slew time under the default mount model.
pub fn slew_time(from: &HorizontalPosition, to: &HorizontalPosition) -> Seconds {
    SlewModel::default().slew_time(from, to)
}
