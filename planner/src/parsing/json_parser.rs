use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

use super::sexagesimal::{format_dec, format_ra, parse_dec, parse_ra};
use super::ParsedCatalogue;
use crate::core::domain::Source;

/// Coordinate field as written in the JSON catalogue: sexagesimal text or a
/// bare number (hours for right ascension, degrees for declination).
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateField(String);

fn deserialize_coordinate<'de, D>(deserializer: D) -> Result<CoordinateField, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrFloat {
        String(String),
        Float(f64),
    }

    match StringOrFloat::deserialize(deserializer)? {
        StringOrFloat::String(s) => Ok(CoordinateField(s)),
        StringOrFloat::Float(f) => Ok(CoordinateField(f.to_string())),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SourceEntry {
    name: String,
    #[serde(deserialize_with = "deserialize_coordinate")]
    right_ascension: CoordinateField,
    #[serde(deserialize_with = "deserialize_coordinate")]
    declination: CoordinateField,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceEntryOut<'a> {
    name: &'a str,
    right_ascension: String,
    declination: String,
}

#[derive(Debug, Serialize)]
struct CatalogueOut<'a> {
    sources: Vec<SourceEntryOut<'a>>,
}

/// Parse a JSON catalogue file.
pub fn parse_catalogue_json(path: &Path) -> Result<ParsedCatalogue> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalogue file: {}", path.display()))?;
    parse_catalogue_json_str(&content)
}

/// Parse a JSON catalogue of the form `{"sources": [{"name", "rightAscension", "declination"}]}`.
///
/// A missing `sources` array is an error; individual malformed entries are
/// skipped.
pub fn parse_catalogue_json_str(json_str: &str) -> Result<ParsedCatalogue> {
    let data: Value = serde_json::from_str(json_str).context("Failed to parse JSON")?;

    let entries = match data.get("sources") {
        Some(Value::Array(entries)) => entries,
        Some(_) => anyhow::bail!("'sources' is not an array"),
        None => anyhow::bail!("Missing 'sources' array in JSON"),
    };

    let mut parsed = ParsedCatalogue::default();
    for (index, entry) in entries.iter().enumerate() {
        let entry: SourceEntry = match serde_path_to_error::deserialize(entry) {
            Ok(entry) => entry,
            Err(e) => {
                parsed.skip(index, format!("{} at {}", e.inner(), e.path()));
                continue;
            }
        };
        if entry.name.trim().is_empty() {
            parsed.skip(index, "empty source name".to_string());
            continue;
        }
        match (parse_ra(&entry.right_ascension.0), parse_dec(&entry.declination.0)) {
            (Ok(ra), Ok(dec)) => parsed
                .sources
                .push(Source::new(entry.name.trim(), ra.value(), dec.value())),
            (Err(e), _) | (_, Err(e)) => parsed.skip(index, format!("{}: {}", entry.name, e)),
        }
    }

    Ok(parsed)
}

/// Render sources as a pretty-printed JSON catalogue.
pub fn catalogue_to_json_string(sources: &[Source]) -> Result<String> {
    let out = CatalogueOut {
        sources: sources
            .iter()
            .map(|s| SourceEntryOut {
                name: &s.name,
                right_ascension: format_ra(s.ra),
                declination: format_dec(s.dec),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&out).context("Failed to serialize catalogue")
}

/// Write sources as a JSON catalogue file.
pub fn write_catalogue_json(path: &Path, sources: &[Source]) -> Result<()> {
    let json = catalogue_to_json_string(sources)?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write catalogue file: {}", path.display()))
}
