use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 一筆出席登記 (Google Form 回覆的一列)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub timestamp: Option<String>,
    pub name: String,
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub answers: BTreeMap<String, String>,
}

/// 出席表中對應各欄位的標題
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttendanceColumns {
    pub timestamp: String,
    pub name: String,
    pub email: String,
}

impl Default for AttendanceColumns {
    fn default() -> Self {
        Self {
            timestamp: "Timestamp".to_string(),
            name: "Full Name".to_string(),
            email: "Email Address".to_string(),
        }
    }
}

/// extract 階段的輸出
#[derive(Debug, Clone, Default)]
pub struct AttendanceSheet {
    pub records: Vec<AttendanceRecord>,
    pub answer_columns: Vec<String>,
    pub total_rows: usize,
    pub skipped_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceSummary {
    pub label: String,
    pub total_rows: usize,
    pub skipped_rows: usize,
    pub duplicates_removed: usize,
    pub unique_attendees: usize,
}

#[derive(Debug, Clone)]
pub struct AttendanceReport {
    pub attendees: Vec<AttendanceRecord>,
    pub summary: AttendanceSummary,
    pub csv_output: String,
    pub json_output: String,
}
