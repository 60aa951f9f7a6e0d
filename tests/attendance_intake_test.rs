use anyhow::Result;
use chrono::{TimeZone, Utc};
use odyssey_ops::{AppConfig, AttendanceJob, AttendancePipeline, EtlEngine, LocalStorage};
use std::io::Read;
use tempfile::TempDir;

const EXPORT: &str = "\u{feff}Timestamp,Full Name,Email Address,Role,Notes\n\
12/16/2025 19:02:11,  Zoe   Park ,Zoe.Park@Example.com,Dancer,\n\
12/16/2025 19:03:40,Alex Chen,alex@example.com,Instructor,Running late\n\
,,,,\n\
12/16/2025 19:05:02,,ghost@example.com,Dancer,\n\
12/16/2025 19:06:15,Zoe Park,zoe.park@example.com,Dancer,second submit\n\
12/16/2025 19:07:30,mia lopez,,Dancer,\n";

fn read_entry(archive: &mut zip::ZipArchive<std::fs::File>, name: &str) -> Result<String> {
    let mut content = String::new();
    archive.by_name(name)?.read_to_string(&mut content)?;
    Ok(content)
}

#[tokio::test]
async fn test_end_to_end_attendance_report() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("export.csv");
    std::fs::write(&input, EXPORT)?;

    let mut config = AppConfig::default();
    config.attendance.output_path = temp_dir.path().join("reports").to_string_lossy().into_owned();

    // 多倫多 12/16 晚上
    let now = Utc.with_ymd_and_hms(2025, 12, 17, 1, 0, 0).unwrap();
    let job = AttendanceJob::from_config(&config, input.to_string_lossy(), now)?;
    let storage = LocalStorage::new(&job.output_path);
    let engine = EtlEngine::new_with_monitoring(AttendancePipeline::new(storage, job), false);

    let output_path = engine.run().await?;

    assert!(output_path.ends_with("reports/attendance_20251216.zip"));
    let mut archive = zip::ZipArchive::new(std::fs::File::open(&output_path)?)?;
    assert_eq!(archive.len(), 3);

    let csv = read_entry(&mut archive, "attendance.csv")?;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "name,email,timestamp,Role,Notes");
    assert_eq!(
        lines[1],
        "Alex Chen,alex@example.com,12/16/2025 19:03:40,Instructor,Running late"
    );
    assert_eq!(lines[2], "mia lopez,,12/16/2025 19:07:30,Dancer,");
    assert_eq!(lines[3], "Zoe Park,zoe.park@example.com,12/16/2025 19:02:11,Dancer,");
    assert_eq!(lines.len(), 4);

    let summary: serde_json::Value = serde_json::from_str(&read_entry(&mut archive, "summary.json")?)?;
    assert_eq!(summary["label"], "20251216");
    assert_eq!(summary["total_rows"], 5);
    assert_eq!(summary["skipped_rows"], 1);
    assert_eq!(summary["duplicates_removed"], 1);
    assert_eq!(summary["unique_attendees"], 3);

    let attendees: serde_json::Value =
        serde_json::from_str(&read_entry(&mut archive, "attendance.json")?)?;
    assert_eq!(attendees[2]["answers"]["Role"], "Dancer");

    Ok(())
}

#[tokio::test]
async fn test_missing_name_column_fails() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("export.csv");
    std::fs::write(&input, "Timestamp,Name\n12/16/2025 19:02:11,Zoe\n")?;

    let mut config = AppConfig::default();
    config.attendance.output_path = temp_dir.path().to_string_lossy().into_owned();
    config.attendance.label = Some("practice".to_string());

    let job = AttendanceJob::from_config(&config, input.to_string_lossy(), Utc::now())?;
    let storage = LocalStorage::new(&job.output_path);
    let result = EtlEngine::new(AttendancePipeline::new(storage, job)).run().await;

    let err = tokio_test::assert_err!(result);
    assert!(err.to_string().contains("Full Name"));
    assert!(!temp_dir.path().join("attendance_practice.zip").exists());
    Ok(())
}
