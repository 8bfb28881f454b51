use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::sexagesimal::{format_dec, format_ra, parse_dec, parse_ra};
use super::ParsedCatalogue;
use crate::core::domain::Source;

/// Parse a delimited `name,ra,dec` catalogue file.
pub fn parse_catalogue_csv(path: &Path, delimiter: char) -> Result<ParsedCatalogue> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalogue file: {}", path.display()))?;
    Ok(parse_catalogue_csv_str(&content, delimiter))
}

/// Parse delimited catalogue text.
///
/// Blank lines and lines starting with `#` are ignored. A first record whose
/// coordinate fields are not angles is taken as a header.
pub fn parse_catalogue_csv_str(content: &str, delimiter: char) -> ParsedCatalogue {
    let mut parsed = ParsedCatalogue::default();
    let mut seen_record = false;

    for (i, line) in content.lines().enumerate() {
        let line_number = i + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = trimmed.split(delimiter).map(str::trim).collect();
        let first = !seen_record;
        seen_record = true;

        if fields.len() < 3 {
            parsed.skip(
                line_number,
                format!("expected name{0}ra{0}dec, found {1} fields", delimiter, fields.len()),
            );
            continue;
        }
        if fields[0].is_empty() {
            parsed.skip(line_number, "empty source name".to_string());
            continue;
        }
        match (parse_ra(fields[1]), parse_dec(fields[2])) {
            (Ok(ra), Ok(dec)) => parsed
                .sources
                .push(Source::new(fields[0], ra.value(), dec.value())),
            _ if first && is_header(&fields) => continue,
            (Err(e), _) | (_, Err(e)) => parsed.skip(line_number, format!("{}: {}", fields[0], e)),
        }
    }
    parsed
}

fn is_header(fields: &[&str]) -> bool {
    let ra = fields[1].to_ascii_lowercase();
    let dec = fields[2].to_ascii_lowercase();
    ra.starts_with("ra") && dec.starts_with("dec")
}

/// Render sources as delimited `name,ra,dec` text with sexagesimal fields.
pub fn catalogue_to_csv_string(sources: &[Source], delimiter: char) -> String {
    let mut out = String::new();
    for source in sources {
        out.push_str(&format!(
            "{1}{0}{2}{0}{3}\n",
            delimiter,
            source.name,
            format_ra(source.ra),
            format_dec(source.dec)
        ));
    }
    out
}

/// Write sources as a delimited catalogue file.
pub fn write_catalogue_csv(path: &Path, sources: &[Source], delimiter: char) -> Result<()> {
    fs::write(path, catalogue_to_csv_string(sources, delimiter))
        .with_context(|| format!("Failed to write catalogue file: {}", path.display()))
}
