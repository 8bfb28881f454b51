//! Mosaic schedule planner binary.
//!
//! Reads a source catalogue, plans an observing block and writes the schedule
//! as JSON together with the residual catalogue of unscheduled and exhausted
//! sources.
//!
//! # Usage
//!
//! ```bash
//! plan-schedule <catalogue> <start> <end> <n_visits> <visit_minutes> <spacing_minutes> \
//!     [start_source] [--config planner.toml] [--output schedule.json] \
//!     [--residual residual.csv]
//! ```
//!
//! `start` and `end` are UTC instants in `yyyy-mm-dd:HH:MM:SS` form.
//! `start_source` names the catalogue source that seeds the first mosaic.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log level (default: info)

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use qtty::Minutes;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use visit_planner::algorithms::NearestNeighbourSequencer;
use visit_planner::ephemeris::FixedBodyOracle;
use visit_planner::io::{
    write_residual_catalogue, CatalogueLoader, JsonScheduleWriter, ScheduleWriter,
};
use visit_planner::time::parse_block_instant;
use visit_planner::{plan, ObservingBlock, PlannerConfig, PlanningParameters};

const USAGE: &str = "usage: plan-schedule <catalogue> <start> <end> <n_visits> <visit_minutes> \
<spacing_minutes> [start_source] [--config FILE] [--output FILE] [--residual FILE]";

struct Arguments {
    catalogue: PathBuf,
    start: String,
    end: String,
    n_visits: usize,
    visit_minutes: f64,
    spacing_minutes: f64,
    start_source: Option<String>,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    residual: Option<PathBuf>,
}

fn parse_arguments(args: &[String]) -> Result<Arguments> {
    let mut positional = Vec::new();
    let mut config = None;
    let mut output = None;
    let mut residual = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let slot = match arg.as_str() {
            "--config" => &mut config,
            "--output" => &mut output,
            "--residual" => &mut residual,
            "-h" | "--help" => bail!("{}", USAGE),
            flag if flag.starts_with("--") => bail!("unknown option {}\n{}", flag, USAGE),
            _ => {
                positional.push(arg.clone());
                continue;
            }
        };
        let value = iter
            .next()
            .with_context(|| format!("{} needs a value\n{}", arg, USAGE))?;
        *slot = Some(PathBuf::from(value));
    }

    if !(6..=7).contains(&positional.len()) {
        bail!("expected 6 or 7 arguments, found {}\n{}", positional.len(), USAGE);
    }
    let start_source = if positional.len() == 7 {
        positional.pop()
    } else {
        None
    };
    let [catalogue, start, end, n_visits, visit_minutes, spacing_minutes] =
        <[String; 6]>::try_from(positional).map_err(|found| {
            anyhow::anyhow!("expected 6 arguments, found {}\n{}", found.len(), USAGE)
        })?;

    Ok(Arguments {
        catalogue: PathBuf::from(catalogue),
        start,
        end,
        n_visits: n_visits
            .parse()
            .with_context(|| format!("Invalid visit count '{}'", n_visits))?,
        visit_minutes: visit_minutes
            .parse()
            .with_context(|| format!("Invalid visit duration '{}'", visit_minutes))?,
        spacing_minutes: spacing_minutes
            .parse()
            .with_context(|| format!("Invalid minimum spacing '{}'", spacing_minutes))?,
        start_source,
        config,
        output,
        residual,
    })
}

fn load_config(path: Option<&Path>) -> Result<PlannerConfig> {
    let config = match path {
        Some(path) => Some(PlannerConfig::from_file(path)?),
        None => PlannerConfig::from_default_location()?,
    };
    Ok(config.unwrap_or_else(|| {
        info!("No planner.toml found, using built-in defaults");
        PlannerConfig::default()
    }))
}

/// `<stem>.schedule.json` next to the catalogue.
fn default_output(catalogue: &Path) -> PathBuf {
    let stem = catalogue
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("catalogue");
    catalogue.with_file_name(format!("{}.schedule.json", stem))
}

/// `<stem>.residual.<ext>` next to the catalogue.
fn default_residual(catalogue: &Path) -> PathBuf {
    let stem = catalogue
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("catalogue");
    let extension = catalogue.extension().and_then(|s| s.to_str()).unwrap_or("csv");
    catalogue.with_file_name(format!("{}.residual.{}", stem, extension))
}

fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let args = parse_arguments(&args)?;
    let config = load_config(args.config.as_deref())?;

    let start = parse_block_instant(&args.start)?;
    let end = parse_block_instant(&args.end)?;
    let block = ObservingBlock::new(start, end)?;
    let mut params = PlanningParameters::from_config(
        block,
        args.n_visits,
        Minutes::new(args.visit_minutes),
        Minutes::new(args.spacing_minutes),
        &config,
    );
    if let Some(start_source) = args.start_source {
        info!("Starting with source {}", start_source);
        params = params.with_start_source(start_source);
    }

    let loaded = CatalogueLoader::load_from_file(&args.catalogue, config.catalogue.delimiter)?;
    if loaded.catalogue.is_empty() {
        bail!("No usable sources in {}", args.catalogue.display());
    }

    info!("Observatory: {}", config.observatory.name);
    let oracle = FixedBodyOracle::new(config.observatory.clone());
    let sequencer = NearestNeighbourSequencer::new(config.kinematics);
    let output = plan(&loaded.catalogue, &params, &config, &oracle, &sequencer)?;

    let schedule_path = args.output.unwrap_or_else(|| default_output(&args.catalogue));
    JsonScheduleWriter::new(schedule_path).write(&output.schedule, &output.report)?;

    let residual = output.residual_sources(&loaded.catalogue, params.n_visits);
    let residual_path = args.residual.unwrap_or_else(|| default_residual(&args.catalogue));
    write_residual_catalogue(
        &residual_path,
        &residual,
        loaded.source_type,
        config.catalogue.delimiter,
    )?;

    if !output.schedule.converged {
        warn!(
            "Refinement stopped after {} passes with {:.0} s of slop",
            output.schedule.iterations,
            output.schedule.total_slop.value()
        );
    }
    for issue in &output.issues {
        warn!("{}", issue);
    }
    info!(
        "Scheduled {} visits; {} sources exhausted, {} written to the residual catalogue",
        output.schedule.visit_count(),
        output.report.exhausted.len(),
        residual.len()
    );
    Ok(())
}
