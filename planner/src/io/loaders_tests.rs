#[cfg(test)]
mod tests {
    use crate::core::domain::Source;
    use crate::io::loaders::{CatalogueLoader, CatalogueSourceType};
    use crate::io::writers::{
        schedule_to_json_string, write_residual_catalogue, JsonScheduleWriter, ScheduleWriter,
    };
    use crate::services::emitter::{PlanReport, Schedule};
    use qtty::Seconds;
    use std::io::Write;
    use std::path::Path;
    use tempfile::NamedTempFile;

    /// Helper to create a temp file with the given suffix and content
    fn create_temp_file(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    fn empty_schedule() -> (Schedule, PlanReport) {
        let schedule = Schedule {
            entries: Vec::new(),
            unseeded: Vec::new(),
            converged: true,
            iterations: 1,
            total_slop: Seconds::new(0.0),
        };
        let report = PlanReport {
            visit_histogram: Default::default(),
            exhausted: Vec::new(),
            never_scheduled: Vec::new(),
            removed: Vec::new(),
            seeding: Default::default(),
            total_slop: Seconds::new(0.0),
            iterations: 1,
            converged: true,
        };
        (schedule, report)
    }

    #[test]
    fn test_source_type_from_extension() {
        assert_eq!(CatalogueSourceType::from_path(Path::new("a.json")), CatalogueSourceType::Json);
        assert_eq!(CatalogueSourceType::from_path(Path::new("a.JSON")), CatalogueSourceType::Json);
        assert_eq!(CatalogueSourceType::from_path(Path::new("a.csv")), CatalogueSourceType::Csv);
        assert_eq!(CatalogueSourceType::from_path(Path::new("targets")), CatalogueSourceType::Csv);
    }

    #[test]
    fn test_load_csv_file_deduplicates() {
        let file = create_temp_file(
            ".csv",
            "name,ra,dec\na,01:00:00,-30:00:00\nb,02:00:00,-31:00:00\na,03:00:00,-32:00:00\n",
        );
        let result = CatalogueLoader::load_from_file(file.path(), ',').unwrap();
        assert_eq!(result.source_type, CatalogueSourceType::Csv);
        assert_eq!(result.num_sources, 2);
        assert!((result.catalogue.get("a").unwrap().ra.value() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_load_json_file() {
        let file = create_temp_file(
            ".json",
            r#"{"sources": [
                {"name": "a", "rightAscension": "01:00:00", "declination": "-30:00:00"}
            ]}"#,
        );
        let result = CatalogueLoader::load_from_file(file.path(), ',').unwrap();
        assert_eq!(result.source_type, CatalogueSourceType::Json);
        assert_eq!(result.num_sources, 1);
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn test_load_json_str_missing_sources() {
        let err = CatalogueLoader::load_from_json_str(r#"{"other": 1}"#).unwrap_err();
        assert!(format!("{:#}", err).contains("Missing 'sources'"));
    }

    #[test]
    fn test_load_csv_str_counts_skipped() {
        let result = CatalogueLoader::load_from_csv_str("a\t01:00:00\t-30:00:00\nbroken\n", '\t');
        assert_eq!(result.num_sources, 1);
        assert_eq!(result.skipped.len(), 1);
    }

    #[test]
    fn test_residual_catalogue_keeps_input_format() {
        let dir = tempfile::tempdir().unwrap();
        let sources = vec![Source::new("a", 15.0, -30.0), Source::new("b", 30.0, -31.0)];

        let csv_path = dir.path().join("residual.csv");
        write_residual_catalogue(&csv_path, &sources, CatalogueSourceType::Csv, ';').unwrap();
        let reread = CatalogueLoader::load_from_csv(&csv_path, ';').unwrap();
        assert_eq!(reread.num_sources, 2);

        let json_path = dir.path().join("residual.json");
        write_residual_catalogue(&json_path, &sources, CatalogueSourceType::Json, ',').unwrap();
        let reread = CatalogueLoader::load_from_file(&json_path, ',').unwrap();
        assert_eq!(reread.num_sources, 2);
        assert!(reread.catalogue.contains("b"));
    }

    #[test]
    fn test_json_schedule_writer() {
        let dir = tempfile::tempdir().unwrap();
        let writer = JsonScheduleWriter::new(dir.path().join("schedule.json"));
        let (schedule, report) = empty_schedule();
        writer.write(&schedule, &report).unwrap();

        let content = std::fs::read_to_string(writer.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["schedule"]["converged"], serde_json::Value::Bool(true));
        assert!(value["report"]["visit_histogram"].is_object());
        assert_eq!(content, schedule_to_json_string(&schedule, &report).unwrap());
    }
}
