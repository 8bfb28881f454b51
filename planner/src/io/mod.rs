//! High-level catalogue loading and output writing.
//!
//! Loaders combine the parsers with catalogue construction (format detection,
//! duplicate removal, error context); writers produce the residual catalogue
//! and the schedule document.
//!
//! # Example
//!
//! ```no_run
//! use visit_planner::io::loaders::CatalogueLoader;
//! use std::path::Path;
//!
//! let result = CatalogueLoader::load_from_file(Path::new("sources.csv"), ',')
//!     .expect("Failed to load");
//! println!("Loaded {} sources", result.num_sources);
//! ```

pub mod loaders;
pub mod writers;

#[cfg(test)]
mod loaders_tests;

pub use loaders::{CatalogueLoadResult, CatalogueLoader, CatalogueSourceType};
pub use writers::{write_residual_catalogue, JsonScheduleWriter, ScheduleWriter};
