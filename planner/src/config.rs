//! Planner configuration file support.
//!
//! This module reads the site, mount and tuning settings of the planner from
//! a TOML file. Every section is optional; missing values fall back to the
//! defaults for the Australia Telescope Compact Array.
//!
//! ```toml
//! [observatory]
//! name = "ATCA"
//! latitude = -30.31498
//! longitude = 149.56394
//!
//! [planning]
//! min_elevation_deg = 12.0
//! cycle_time_s = 10.0
//!
//! [calibration]
//! dwell_minutes = 10.0
//! calibrators = [
//!     { name = "1934-638", ra = "19:39:25.026", dec = "-63:42:45.63" },
//! ]
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use qtty::{Minutes, Second, Seconds};

use crate::algorithms::refinement::RefinementSettings;
use crate::algorithms::slew::SlewModel;
use crate::core::domain::Source;
use crate::core::error::{PlannerError, PlannerResult};
use crate::ephemeris::Observatory;
use crate::parsing::sexagesimal::{parse_dec, parse_ra};

/// Planner configuration from file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub observatory: Observatory,
    #[serde(default)]
    pub kinematics: SlewModel,
    #[serde(default)]
    pub planning: PlanningSettings,
    #[serde(default)]
    pub catalogue: CatalogueSettings,
    #[serde(default)]
    pub visibility: VisibilitySettings,
    #[serde(default)]
    pub refinement: RefinementSettings,
    #[serde(default)]
    pub calibration: CalibrationSettings,
}

/// Defaults for the per-run planning parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningSettings {
    #[serde(default = "default_min_elevation")]
    pub min_elevation_deg: f64,
    #[serde(default = "default_cycle_time")]
    pub cycle_time_s: f64,
    #[serde(default = "default_min_seed_separation")]
    pub min_seed_separation_s: f64,
    #[serde(default = "default_max_seed_adjacency")]
    pub max_seed_adjacency_s: f64,
    #[serde(default = "default_slop_tolerance")]
    pub slop_tolerance_s: f64,
}

/// Catalogue file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogueSettings {
    /// Field delimiter of tabular catalogues.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

/// Visibility cull settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisibilitySettings {
    /// Multiplier on the time a source's visits need.
    #[serde(default = "default_duration_margin")]
    pub duration_margin: f64,
    #[serde(default = "default_set_hysteresis")]
    pub set_hysteresis: f64,
    #[serde(default = "default_rise_hysteresis")]
    pub rise_hysteresis: f64,
}

/// Bandpass calibration dwell settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationSettings {
    /// Length of the dwell, also the margin removed from both ends of the block.
    #[serde(default = "default_dwell_minutes")]
    pub dwell_minutes: f64,
    /// Calibrators in order of preference.
    #[serde(default = "default_calibrators")]
    pub calibrators: Vec<CalibratorEntry>,
}

/// A calibrator with sexagesimal coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratorEntry {
    pub name: String,
    pub ra: String,
    pub dec: String,
}

fn default_min_elevation() -> f64 {
    12.0
}

fn default_cycle_time() -> f64 {
    10.0
}

fn default_min_seed_separation() -> f64 {
    60.0
}

fn default_max_seed_adjacency() -> f64 {
    300.0
}

fn default_slop_tolerance() -> f64 {
    600.0
}

fn default_delimiter() -> char {
    ','
}

fn default_duration_margin() -> f64 {
    1.2
}

fn default_set_hysteresis() -> f64 {
    0.99
}

fn default_rise_hysteresis() -> f64 {
    1.01
}

fn default_dwell_minutes() -> f64 {
    10.0
}

fn default_calibrators() -> Vec<CalibratorEntry> {
    vec![
        CalibratorEntry {
            name: "1934-638".to_string(),
            ra: "19:39:25.026".to_string(),
            dec: "-63:42:45.63".to_string(),
        },
        CalibratorEntry {
            name: "0823-500".to_string(),
            ra: "08:25:26.869".to_string(),
            dec: "-50:10:38.49".to_string(),
        },
    ]
}

impl Default for PlanningSettings {
    fn default() -> Self {
        Self {
            min_elevation_deg: default_min_elevation(),
            cycle_time_s: default_cycle_time(),
            min_seed_separation_s: default_min_seed_separation(),
            max_seed_adjacency_s: default_max_seed_adjacency(),
            slop_tolerance_s: default_slop_tolerance(),
        }
    }
}

impl Default for CatalogueSettings {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
        }
    }
}

impl Default for VisibilitySettings {
    fn default() -> Self {
        Self {
            duration_margin: default_duration_margin(),
            set_hysteresis: default_set_hysteresis(),
            rise_hysteresis: default_rise_hysteresis(),
        }
    }
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            dwell_minutes: default_dwell_minutes(),
            calibrators: default_calibrators(),
        }
    }
}

impl CalibrationSettings {
    /// Margin removed from both ends of the observing block.
    pub fn margin(&self) -> Seconds {
        Minutes::new(self.dwell_minutes).to::<Second>()
    }

    /// Calibrators as sources, in order of preference.
    pub fn sources(&self) -> PlannerResult<Vec<Source>> {
        self.calibrators
            .iter()
            .map(|entry| {
                let ra = parse_ra(&entry.ra).map_err(|e| {
                    PlannerError::ConfigurationError(format!("Calibrator {}: {}", entry.name, e))
                })?;
                let dec = parse_dec(&entry.dec).map_err(|e| {
                    PlannerError::ConfigurationError(format!("Calibrator {}: {}", entry.name, e))
                })?;
                Ok(Source::new(entry.name.clone(), ra.value(), dec.value()))
            })
            .collect()
    }
}

impl PlannerConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> PlannerResult<Self> {
        let config: PlannerConfig = toml::from_str(content).map_err(|e| {
            PlannerError::ConfigurationError(format!("Failed to parse config file: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load planner configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(PlannerConfig)` if successful
    /// * `Err(PlannerError)` if file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> PlannerResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            PlannerError::ConfigurationError(format!("Failed to read config file: {}", e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load planner configuration from the default location.
    ///
    /// Searches for `planner.toml` in:
    /// 1. Current directory
    /// 2. `planner/` directory
    /// 3. Parent directory
    ///
    /// # Returns
    /// * `Ok(Some(PlannerConfig))` if found and parsed successfully
    /// * `Ok(None)` if no config file exists
    /// * `Err(PlannerError)` if a file exists but cannot be parsed
    pub fn from_default_location() -> PlannerResult<Option<Self>> {
        let search_paths = [
            PathBuf::from("planner.toml"),
            PathBuf::from("planner/planner.toml"),
            PathBuf::from("../planner.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                log::info!("Using planner configuration {}", path.display());
                return Self::from_file(&path).map(Some);
            }
        }
        Ok(None)
    }

    /// Check values that would make planning meaningless.
    pub fn validate(&self) -> PlannerResult<()> {
        let latitude = self.observatory.latitude.value();
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(PlannerError::ConfigurationError(format!(
                "observatory latitude {} is outside [-90, 90]",
                latitude
            )));
        }
        let kinematics = &self.kinematics;
        if kinematics.azimuth_rate_deg_per_min <= 0.0
            || kinematics.elevation_rate_deg_per_min <= 0.0
            || kinematics.acceleration_deg_per_min2 <= 0.0
        {
            return Err(PlannerError::ConfigurationError(
                "kinematic rates and acceleration must be positive".to_string(),
            ));
        }
        let refinement = &self.refinement;
        if refinement.slop_trigger_s <= 0.0 {
            return Err(PlannerError::ConfigurationError(
                "refinement.slop_trigger_s must be positive".to_string(),
            ));
        }
        if self.calibration.dwell_minutes < 0.0 {
            return Err(PlannerError::ConfigurationError(
                "calibration.dwell_minutes must not be negative".to_string(),
            ));
        }
        self.calibration.sources()?;
        Ok(())
    }
}
