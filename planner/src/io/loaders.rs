use anyhow::{Context, Result};
use std::path::Path;

use crate::core::domain::Catalogue;
use crate::parsing::{csv_parser, json_parser, ParsedCatalogue, SkippedRecord};

/// Represents the source type of catalogue data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogueSourceType {
    Json,
    Csv,
}

impl CatalogueSourceType {
    /// `.json` files are JSON; everything else is read as delimited text.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("json") => CatalogueSourceType::Json,
            _ => CatalogueSourceType::Csv,
        }
    }
}

/// Result of loading catalogue data
#[derive(Debug)]
pub struct CatalogueLoadResult {
    pub catalogue: Catalogue,
    pub source_type: CatalogueSourceType,
    pub num_sources: usize,
    /// Records that could not be read.
    pub skipped: Vec<SkippedRecord>,
}

impl CatalogueLoadResult {
    pub fn new(parsed: ParsedCatalogue, source_type: CatalogueSourceType) -> Self {
        let catalogue = Catalogue::from_sources(parsed.sources);
        let num_sources = catalogue.len();
        Self {
            catalogue,
            source_type,
            num_sources,
            skipped: parsed.skipped,
        }
    }
}

/// Unified interface for loading catalogues from JSON or delimited text
pub struct CatalogueLoader;

impl CatalogueLoader {
    /// Load a catalogue from a file, detecting the format from its extension
    pub fn load_from_file(path: &Path, delimiter: char) -> Result<CatalogueLoadResult> {
        let result = match CatalogueSourceType::from_path(path) {
            CatalogueSourceType::Json => Self::load_from_json(path),
            CatalogueSourceType::Csv => Self::load_from_csv(path, delimiter),
        }?;
        log::info!(
            "Loaded {} sources from {} ({} records skipped)",
            result.num_sources,
            path.display(),
            result.skipped.len()
        );
        Ok(result)
    }

    /// Load a catalogue from a JSON file
    pub fn load_from_json(json_path: &Path) -> Result<CatalogueLoadResult> {
        let parsed =
            json_parser::parse_catalogue_json(json_path).context("Failed to parse JSON file")?;
        Ok(CatalogueLoadResult::new(parsed, CatalogueSourceType::Json))
    }

    /// Load a catalogue from a JSON string
    pub fn load_from_json_str(json_str: &str) -> Result<CatalogueLoadResult> {
        let parsed = json_parser::parse_catalogue_json_str(json_str)
            .context("Failed to parse JSON string")?;
        Ok(CatalogueLoadResult::new(parsed, CatalogueSourceType::Json))
    }

    /// Load a catalogue from a delimited text file
    pub fn load_from_csv(csv_path: &Path, delimiter: char) -> Result<CatalogueLoadResult> {
        let parsed = csv_parser::parse_catalogue_csv(csv_path, delimiter)
            .context("Failed to parse CSV file")?;
        Ok(CatalogueLoadResult::new(parsed, CatalogueSourceType::Csv))
    }

    /// Load a catalogue from delimited text
    pub fn load_from_csv_str(content: &str, delimiter: char) -> CatalogueLoadResult {
        let parsed = csv_parser::parse_catalogue_csv_str(content, delimiter);
        CatalogueLoadResult::new(parsed, CatalogueSourceType::Csv)
    }
}
