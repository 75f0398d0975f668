/// End-to-end tests: NEM12 file in, SQL artifacts out.
///
/// These tests validate complete runs including:
/// - A single 30 minute day producing 48 readings
/// - Batch boundaries in both artifacts
/// - Fatal record and finish errors leaving no artifacts behind
/// - Identical output for one worker and many

use nem12sql::cli::run::{convert, RunError};
use nem12sql::config::Config;
use nem12sql::pipeline::PipelineError;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: write an input file and point both outputs into the same directory
    fn setup(dir: &TempDir, lines: &[String]) -> (PathBuf, Config) {
        let input = dir.path().join("meters.csv");
        fs::write(&input, lines.join("\n")).unwrap();

        let mut config = Config::default();
        config.output.copy_path = dir.path().join("meters.copy.csv");
        (input, config)
    }

    fn interval_line(date: &str, values: &[String]) -> String {
        format!("300,{},{},A,,,20230102003000,", date, values.join(","))
    }

    fn constant_day(date: &str, n: usize, value: &str) -> String {
        interval_line(date, &vec![value.to_string(); n])
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_single_day_produces_48_readings() {
        let dir = TempDir::new().unwrap();
        let (input, config) = setup(
            &dir,
            &[
                "100,NEM12,200301011534,MDP1,Retailer1".to_string(),
                "200,NMI0000001,E1Q1,1,E1,N1,METSER123,KWH,30,".to_string(),
                constant_day("20230101", 48, "1.5"),
                "900".to_string(),
            ],
        );

        let summary = convert(&input, &config).await.unwrap();
        assert_eq!(summary.readings, 48);
        assert_eq!(summary.batches, 1);
        assert_eq!(summary.jobs, 1);

        let insert = fs::read_to_string(dir.path().join("meters.sql")).unwrap();
        assert!(insert.starts_with(
            "INSERT INTO meter_readings (nmi, timestamp, consumption)\n  VALUES\n    \
             ('NMI0000001','2023-01-01 00:30:00',1.5),\n    \
             ('NMI0000001','2023-01-01 01:00:00',1.5),\n"
        ));
        assert!(insert.ends_with("    ('NMI0000001','2023-01-02 00:00:00',1.5);\n"));
        assert_eq!(insert.matches("('NMI0000001'").count(), 48);

        let copy = fs::read_to_string(dir.path().join("meters.copy.csv")).unwrap();
        let rows: Vec<_> = copy.split('\n').collect();
        assert_eq!(rows.len(), 48);
        assert_eq!(rows[0], "NMI0000001,2023-01-01 00:30:00,1.5");
        assert_eq!(rows[47], "NMI0000001,2023-01-02 00:00:00,1.5");

        assert_eq!(
            file_names(dir.path()),
            vec!["meters.copy.csv", "meters.csv", "meters.sql"]
        );
    }

    #[tokio::test]
    async fn test_batches_split_both_artifacts() {
        let dir = TempDir::new().unwrap();
        let values: Vec<String> = (0..24).map(|i| format!("{}.25", i)).collect();
        let (input, mut config) = setup(
            &dir,
            &[
                "200,NMI0000001,E1,,E1,N1,,KWH,60,".to_string(),
                interval_line("20230101", &values),
                "900".to_string(),
            ],
        );
        config.pipeline.batch_size = 10;

        let summary = convert(&input, &config).await.unwrap();
        assert_eq!(summary.readings, 24);
        assert_eq!(summary.batches, 3);

        let insert = fs::read_to_string(dir.path().join("meters.sql")).unwrap();
        assert_eq!(insert.matches("INSERT INTO").count(), 3);
        assert_eq!(insert.matches(");\n").count(), 3);

        let copy = fs::read_to_string(dir.path().join("meters.copy.csv")).unwrap();
        assert!(!copy.ends_with('\n'));
        let rows: Vec<_> = copy.split('\n').collect();
        assert_eq!(rows.len(), 24);
        assert_eq!(rows[0], "NMI0000001,2023-01-01 01:00:00,0.25");
        assert_eq!(rows[23], "NMI0000001,2023-01-02 00:00:00,23.25");
    }

    #[tokio::test]
    async fn test_fatal_error_leaves_no_artifacts() {
        let dir = TempDir::new().unwrap();
        let (input, mut config) = setup(
            &dir,
            &[
                "200,NMI0000001,E1,,E1,N1,,KWH,30,".to_string(),
                constant_day("20230101", 48, "1"),
                // One value short
                constant_day("20230102", 47, "1"),
                "900".to_string(),
            ],
        );
        config.pipeline.batch_size = 5;

        let err = convert(&input, &config).await.unwrap_err();
        let RunError::Pipeline(PipelineError::Record(record)) = err else {
            panic!("expected a fatal record error");
        };
        assert_eq!(record.line, 3);

        assert_eq!(file_names(dir.path()), vec!["meters.csv"]);
    }

    #[tokio::test]
    async fn test_local_errors_are_skipped() {
        let dir = TempDir::new().unwrap();
        let (input, config) = setup(
            &dir,
            &[
                "100,NEM13,200301011534,MDP1,Retailer1,extra".to_string(),
                "200,NMI0000001,E1,,E1,N1,,KWH,30,".to_string(),
                constant_day("20230101", 48, "2"),
                "400,1,48".to_string(),
                "500,O,S01234567,20030102103000,".to_string(),
                "900".to_string(),
            ],
        );

        let summary = convert(&input, &config).await.unwrap();
        assert_eq!(summary.rejected, 2);
        assert_eq!(summary.records.b2b_details, 1);
        assert_eq!(summary.readings, 48);
    }

    #[tokio::test]
    async fn test_worker_count_does_not_change_rows() {
        let mut lines = vec!["100,NEM12,200301011534,MDP1,Retailer1".to_string()];
        for meter in 0..4 {
            lines.push(format!("200,NMI100000{},E1,,E1,N1,,KWH,15,", meter));
            for day in 1..=7 {
                let values: Vec<String> = (0..96)
                    .map(|i| format!("{}.{:03}", meter * 10 + day, i))
                    .collect();
                lines.push(interval_line(&format!("202303{:02}", day), &values));
            }
        }
        lines.push("900".to_string());

        let mut outputs = Vec::new();
        for workers in [1, 8] {
            let dir = TempDir::new().unwrap();
            let (input, mut config) = setup(&dir, &lines);
            config.pipeline.workers = workers;
            config.pipeline.batch_size = 100;
            config.pipeline.interval_queue_capacity = 2;
            config.pipeline.reading_queue_capacity = 8;

            let summary = convert(&input, &config).await.unwrap();
            assert_eq!(summary.readings, 4 * 7 * 96);

            let copy = fs::read_to_string(dir.path().join("meters.copy.csv")).unwrap();
            let mut rows: Vec<String> = copy.split('\n').map(str::to_string).collect();
            rows.sort();
            outputs.push(rows);
        }

        assert_eq!(outputs[0].len(), 4 * 7 * 96);
        assert_eq!(outputs[0], outputs[1]);
        // Every reading keeps the meter of its own block
        for row in &outputs[1] {
            let mut fields = row.split(',');
            let nmi = fields.next().unwrap();
            let value = fields.nth(1).unwrap();
            let meter = &nmi[9..];
            let whole: u32 = value.split('.').next().unwrap().parse().unwrap();
            assert_eq!(whole / 10, meter.parse::<u32>().unwrap(), "{}", row);
        }
    }

    #[tokio::test]
    async fn test_failed_finish_leaves_no_artifacts() {
        let dir = TempDir::new().unwrap();
        let (input, mut config) = setup(
            &dir,
            &[
                "200,NMI0000001,E1,,E1,N1,,KWH,30,".to_string(),
                constant_day("20230101", 48, "1"),
                "900".to_string(),
            ],
        );
        // The copy artifact cannot be renamed over a non-empty directory
        let copy_dir = dir.path().join("copy.csv");
        fs::create_dir(&copy_dir).unwrap();
        fs::write(copy_dir.join("existing.csv"), "x").unwrap();
        config.output.copy_path = copy_dir;

        let err = convert(&input, &config).await.unwrap_err();
        assert!(matches!(err, RunError::Pipeline(PipelineError::Output(_))));

        assert_eq!(file_names(dir.path()), vec!["copy.csv", "meters.csv"]);
    }

    #[tokio::test]
    async fn test_missing_input_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.output.copy_path = dir.path().join("copy.csv");

        let result = convert(&dir.path().join("absent.csv"), &config).await;
        assert!(matches!(result, Err(RunError::Reader(_))));
        assert!(file_names(dir.path()).is_empty());
    }
}
