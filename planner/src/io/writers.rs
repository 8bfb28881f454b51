//! Output of residual catalogues and schedules.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::loaders::CatalogueSourceType;
use crate::core::domain::Source;
use crate::parsing::{csv_parser, json_parser};
use crate::services::emitter::{PlanReport, Schedule};

/// Writes `sources` in the given catalogue format, so the residual of a run
/// can be fed back to the planner unchanged.
pub fn write_residual_catalogue(
    path: &Path,
    sources: &[Source],
    source_type: CatalogueSourceType,
    delimiter: char,
) -> Result<()> {
    match source_type {
        CatalogueSourceType::Json => json_parser::write_catalogue_json(path, sources),
        CatalogueSourceType::Csv => csv_parser::write_catalogue_csv(path, sources, delimiter),
    }?;
    log::info!("Wrote {} residual sources to {}", sources.len(), path.display());
    Ok(())
}

/// Destination of an emitted schedule.
pub trait ScheduleWriter {
    fn write(&self, schedule: &Schedule, report: &PlanReport) -> Result<()>;
}

#[derive(Serialize)]
struct ScheduleDocument<'a> {
    schedule: &'a Schedule,
    report: &'a PlanReport,
}

/// Pretty-printed JSON document holding the schedule and its report.
pub fn schedule_to_json_string(schedule: &Schedule, report: &PlanReport) -> Result<String> {
    serde_json::to_string_pretty(&ScheduleDocument { schedule, report })
        .context("Failed to serialize schedule")
}

/// Writes the schedule and report as one JSON document.
#[derive(Debug, Clone)]
pub struct JsonScheduleWriter {
    path: PathBuf,
}

impl JsonScheduleWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScheduleWriter for JsonScheduleWriter {
    fn write(&self, schedule: &Schedule, report: &PlanReport) -> Result<()> {
        let json = schedule_to_json_string(schedule, report)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write schedule file: {}", self.path.display()))?;
        log::info!(
            "Wrote {} schedule entries to {}",
            schedule.entries.len(),
            self.path.display()
        );
        Ok(())
    }
}
