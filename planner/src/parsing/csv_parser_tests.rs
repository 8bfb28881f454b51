#[cfg(test)]
mod tests {
    use std::io::Write;

    use crate::parsing::csv_parser::{
        catalogue_to_csv_string, parse_catalogue_csv, parse_catalogue_csv_str, write_catalogue_csv,
    };
    use crate::core::domain::Source;

    const CATALOGUE: &str = "\
# ATCA mosaic targets
name,ra,dec
J0001-1540,00:01:00.0,-15:40:00
J1230+1223, 12:30:49.42 , +12:23:28.0

J1934-6342,19:39:25.026,-63:42:45.63
";

    #[test]
    fn test_parses_sexagesimal_records() {
        let parsed = parse_catalogue_csv_str(CATALOGUE, ',');
        assert_eq!(parsed.sources.len(), 3);
        assert!(parsed.skipped.is_empty());

        let first = &parsed.sources[0];
        assert_eq!(first.name, "J0001-1540");
        assert!((first.ra.value() - 0.25).abs() < 1e-9);
        assert!((first.dec.value() - (-15.0 - 40.0 / 60.0)).abs() < 1e-9);

        let second = &parsed.sources[1];
        assert_eq!(second.name, "J1230+1223");
        assert!(second.dec.value() > 12.0);
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let text = "a,01:00:00,-30:00:00\nb,25:00:00,-30:00:00\nc,01:00:00\n\
            ,01:00:00,-30:00:00\nd,2.0,-95\ne,3.0,-20.5\n";
        let parsed = parse_catalogue_csv_str(text, ',');

        let names: Vec<&str> = parsed.sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "e"]);
        let lines: Vec<usize> = parsed.skipped.iter().map(|r| r.location).collect();
        assert_eq!(lines, vec![2, 3, 4, 5]);
        assert!((parsed.sources[1].ra.value() - 45.0).abs() < 1e-9);
        assert!((parsed.sources[1].dec.value() + 20.5).abs() < 1e-9);
    }

    #[test]
    fn test_header_only_skipped_on_first_record() {
        let text = "a,01:00:00,-30:00:00\nname,ra,dec\n";
        let parsed = parse_catalogue_csv_str(text, ',');
        assert_eq!(parsed.sources.len(), 1);
        assert_eq!(parsed.skipped.len(), 1);
    }

    #[test]
    fn test_custom_delimiter() {
        let text = "a;01:00:00;-30:00:00\nb;02:00:00;+10:00:00\n";
        let parsed = parse_catalogue_csv_str(text, ';');
        assert_eq!(parsed.sources.len(), 2);
        assert_eq!(parse_catalogue_csv_str(text, ',').sources.len(), 0);
    }

    #[test]
    fn test_writer_output_reparses() {
        let sources = vec![Source::new("x", 294.854275, -63.712675), Source::new("y", 15.0, 0.5)];
        let text = catalogue_to_csv_string(&sources, ',');
        assert!(text.starts_with("x,19:39:25.026,-63:42:45.63\n"));

        let parsed = parse_catalogue_csv_str(&text, ',');
        assert_eq!(parsed.sources.len(), 2);
        assert!((parsed.sources[1].dec.value() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_file_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", CATALOGUE).unwrap();
        let parsed = parse_catalogue_csv(file.path(), ',').unwrap();
        assert_eq!(parsed.sources.len(), 3);

        let out = tempfile::NamedTempFile::new().unwrap();
        write_catalogue_csv(out.path(), &parsed.sources, ',').unwrap();
        let reread = parse_catalogue_csv(out.path(), ',').unwrap();
        assert_eq!(reread.sources.len(), 3);
        assert_eq!(reread.sources[2].name, "J1934-6342");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse_catalogue_csv(&dir.path().join("missing.csv"), ',').unwrap_err();
        assert!(err.to_string().contains("Failed to read catalogue file"));
    }
}
