use crate::core::{
    AttendanceRecord, AttendanceReport, AttendanceSheet, AttendanceSummary, ConfigProvider,
    Pipeline, Storage,
};
use crate::utils::error::{OpsError, Result};
use std::collections::HashSet;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// 讀取 Google Form 出席表 CSV，清理後打包成報表
pub struct AttendancePipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> AttendancePipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    pub fn report_filename(&self) -> String {
        format!("attendance_{}.zip", self.config.report_label())
    }
}

/// 合併名字中多餘的空白
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Google 表單允許同名問題，重複的標題加上 " (2)"、" (3)"
fn unique_headers<'a>(columns: impl Iterator<Item = (usize, &'a str)>) -> Vec<(usize, String)> {
    let mut taken = HashSet::new();
    let mut unique = Vec::new();

    for (idx, header) in columns {
        let mut candidate = header.to_string();
        let mut n = 2;
        while !taken.insert(candidate.clone()) {
            candidate = format!("{} ({})", header, n);
            n += 1;
        }
        unique.push((idx, candidate));
    }

    unique
}

fn dedupe_key(record: &AttendanceRecord) -> String {
    match &record.email {
        Some(email) => format!("email:{}", email),
        None => format!("name:{}", record.name.to_lowercase()),
    }
}

fn render_csv(attendees: &[AttendanceRecord], answer_columns: &[String]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let mut header = vec!["name", "email", "timestamp"];
    header.extend(answer_columns.iter().map(String::as_str));
    writer.write_record(&header)?;

    for attendee in attendees {
        let mut row = vec![
            attendee.name.as_str(),
            attendee.email.as_deref().unwrap_or(""),
            attendee.timestamp.as_deref().unwrap_or(""),
        ];
        row.extend(
            answer_columns
                .iter()
                .map(|column| attendee.answers.get(column).map(String::as_str).unwrap_or("")),
        );
        writer.write_record(&row)?;
    }

    let bytes = writer.into_inner().map_err(|e| OpsError::ProcessingError {
        message: format!("Failed to flush attendance CSV: {}", e),
    })?;
    String::from_utf8(bytes).map_err(|e| OpsError::ProcessingError {
        message: format!("Attendance CSV is not valid UTF-8: {}", e),
    })
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for AttendancePipeline<S, C> {
    async fn extract(&self) -> Result<AttendanceSheet> {
        tracing::debug!("Reading attendance sheet: {}", self.config.input_path());
        let raw = self.storage.read_file(self.config.input_path()).await?;
        let content = raw.strip_prefix(UTF8_BOM).unwrap_or(&raw[..]);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content);

        let headers = reader.headers()?.clone();
        let columns = self.config.columns();
        let position = |title: &str| headers.iter().position(|h| h == title);

        let name_idx = position(&columns.name).ok_or_else(|| OpsError::ValidationError {
            message: format!("Attendance sheet has no '{}' column", columns.name),
        })?;
        let timestamp_idx = position(&columns.timestamp);
        let email_idx = position(&columns.email);

        if email_idx.is_none() {
            tracing::warn!(
                "Column '{}' not found, duplicates will be matched by name",
                columns.email
            );
        }

        // 其他欄位都當作表單問題的答案
        let answer_columns = unique_headers(
            headers
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != name_idx && Some(*i) != timestamp_idx && Some(*i) != email_idx),
        );

        let mut sheet = AttendanceSheet {
            answer_columns: answer_columns.iter().map(|(_, h)| h.clone()).collect(),
            ..Default::default()
        };

        for row in reader.records() {
            let row = row?;
            if row.iter().all(str::is_empty) {
                continue;
            }
            sheet.total_rows += 1;

            let name = row.get(name_idx).unwrap_or("");
            if name.is_empty() {
                sheet.skipped_rows += 1;
                tracing::warn!("Skipping row {} without a name", sheet.total_rows);
                continue;
            }

            let cell = |idx: Option<usize>| {
                idx.and_then(|i| row.get(i))
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
            };

            sheet.records.push(AttendanceRecord {
                timestamp: cell(timestamp_idx),
                name: name.to_string(),
                email: cell(email_idx),
                answers: answer_columns
                    .iter()
                    .filter_map(|(i, header)| {
                        row.get(*i)
                            .filter(|v| !v.is_empty())
                            .map(|v| (header.clone(), v.to_string()))
                    })
                    .collect(),
            });
        }

        Ok(sheet)
    }

    async fn transform(&self, sheet: AttendanceSheet) -> Result<AttendanceReport> {
        let mut seen = HashSet::new();
        let mut attendees = Vec::with_capacity(sheet.records.len());
        let mut duplicates_removed = 0;

        for mut record in sheet.records {
            record.name = normalize_name(&record.name);
            record.email = record.email.map(|email| email.to_lowercase());

            // 同一人重複送出表單時保留第一筆
            if !seen.insert(dedupe_key(&record)) {
                duplicates_removed += 1;
                tracing::debug!("Dropping duplicate submission from {}", record.name);
                continue;
            }
            attendees.push(record);
        }

        attendees.sort_by_key(|record| record.name.to_lowercase());

        let summary = AttendanceSummary {
            label: self.config.report_label().to_string(),
            total_rows: sheet.total_rows,
            skipped_rows: sheet.skipped_rows,
            duplicates_removed,
            unique_attendees: attendees.len(),
        };

        Ok(AttendanceReport {
            csv_output: render_csv(&attendees, &sheet.answer_columns)?,
            json_output: serde_json::to_string_pretty(&attendees)?,
            attendees,
            summary,
        })
    }

    async fn load(&self, report: AttendanceReport) -> Result<String> {
        let filename = self.report_filename();
        let output_path = format!("{}/{}", self.config.output_path(), filename);

        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

            zip.start_file::<_, ()>("attendance.csv", FileOptions::default())?;
            zip.write_all(report.csv_output.as_bytes())?;

            zip.start_file::<_, ()>("attendance.json", FileOptions::default())?;
            zip.write_all(report.json_output.as_bytes())?;

            zip.start_file::<_, ()>("summary.json", FileOptions::default())?;
            let summary = serde_json::to_string_pretty(&report.summary)?;
            zip.write_all(summary.as_bytes())?;

            // 完成並取回底層 Vec<u8>
            let cursor = zip.finish()?;
            cursor.into_inner()
        };

        tracing::debug!("Writing {} ({} bytes) to storage", filename, zip_data.len());
        self.storage.write_file(&filename, &zip_data).await?;

        Ok(output_path)
    }
}
