//! Parsers for source catalogues.
//!
//! # Parsers
//!
//! - [`csv_parser`]: Delimited `name,ra,dec` catalogues
//! - [`json_parser`]: JSON catalogues with a `sources` array
//! - [`sexagesimal`]: Right ascension and declination fields
//!
//! Malformed records never abort a parse: they are logged, skipped and listed
//! in [`ParsedCatalogue::skipped`].
//!
//! # Example
//!
//! ```no_run
//! use visit_planner::parsing::csv_parser::parse_catalogue_csv;
//! use std::path::Path;
//!
//! let parsed = parse_catalogue_csv(Path::new("sources.csv"), ',')
//!     .expect("Failed to parse catalogue");
//! println!("{} sources", parsed.sources.len());
//! ```

pub mod csv_parser;
pub mod json_parser;
pub mod sexagesimal;

#[cfg(test)]
mod csv_parser_tests;

use crate::core::domain::Source;

/// A record that could not be turned into a source.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    /// 1-based line (tabular) or 0-based entry index (JSON).
    pub location: usize,
    pub reason: String,
}

/// Sources read from a catalogue and the records that were skipped.
#[derive(Debug, Clone, Default)]
pub struct ParsedCatalogue {
    pub sources: Vec<Source>,
    pub skipped: Vec<SkippedRecord>,
}

impl ParsedCatalogue {
    fn skip(&mut self, location: usize, reason: String) {
        log::warn!("Skipping catalogue record {}: {}", location, reason);
        self.skipped.push(SkippedRecord { location, reason });
    }
}
