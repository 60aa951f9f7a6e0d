#[cfg(feature = "cli")]
pub mod cli;
pub mod storage;
pub mod toml_config;

use crate::checkin::event::date_label;
use crate::core::ConfigProvider;
use crate::domain::model::AttendanceColumns;
use crate::utils::error::Result;
use crate::utils::validation::validate_file_extensions;
use chrono::{DateTime, Utc};

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use storage::LocalStorage;
pub use toml_config::{AppConfig, AttendanceSettings, EmailSettings, MonitoringConfig};

/// 單次出席表處理所需的設定
#[derive(Debug, Clone)]
pub struct AttendanceJob {
    pub input_path: String,
    pub output_path: String,
    pub label: String,
    pub columns: AttendanceColumns,
}

impl AttendanceJob {
    /// 沒有指定標籤時，以活動時區的當天日期命名；輸入必須是 Google Forms 匯出的 CSV
    pub fn from_config(config: &AppConfig, input_path: impl Into<String>, now: DateTime<Utc>) -> Result<Self> {
        let input_path = input_path.into();
        validate_file_extensions("attendance.input", std::slice::from_ref(&input_path), &["csv"])?;

        let label = match &config.attendance.label {
            Some(label) => label.clone(),
            None => date_label(now, config.checkin.tz()?),
        };

        Ok(Self {
            input_path,
            output_path: config.attendance.output_path.clone(),
            label,
            columns: config.attendance.columns.clone(),
        })
    }
}

impl ConfigProvider for AttendanceJob {
    fn input_path(&self) -> &str {
        &self.input_path
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn report_label(&self) -> &str {
        &self.label
    }

    fn columns(&self) -> &AttendanceColumns {
        &self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_label_defaults_to_local_date() {
        // 多倫多時間 12/16 晚上 9 點，UTC 已經是 12/17
        let now = Utc.with_ymd_and_hms(2025, 12, 17, 2, 0, 0).unwrap();
        let job = AttendanceJob::from_config(&AppConfig::default(), "export.csv", now).unwrap();

        assert_eq!(job.report_label(), "20251216");
        assert_eq!(job.output_path(), "./output");
        assert_eq!(job.columns().name, "Full Name");
    }

    #[test]
    fn test_input_must_be_csv() {
        let result = AttendanceJob::from_config(&AppConfig::default(), "attendance_jan06.xlsx", Utc::now());
        assert!(matches!(
            result,
            Err(crate::utils::error::OpsError::InvalidConfigValueError { ref field, .. }) if field == "attendance.input"
        ));

        assert!(AttendanceJob::from_config(&AppConfig::default(), "/tmp/Export.CSV", Utc::now()).is_ok());
    }

    #[test]
    fn test_explicit_label_wins() {
        let mut config = AppConfig::default();
        config.attendance.label = Some("showcase".to_string());

        let job = AttendanceJob::from_config(&config, "export.csv", Utc::now()).unwrap();
        assert_eq!(job.report_label(), "showcase");
    }
}
