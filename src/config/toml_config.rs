use crate::checkin::CheckinSettings;
use crate::domain::model::AttendanceColumns;
use crate::email::SmtpConfig;
use crate::forms::FormsApiConfig;
use crate::utils::error::{OpsError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "odyssey.toml";
pub const SECRET_KEY_ENV: &str = "SECRET_KEY";

/// odyssey.toml 的完整內容，每個區塊都可省略
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub checkin: CheckinSettings,
    pub smtp: SmtpConfig,
    pub email: EmailSettings,
    pub forms: FormsApiConfig,
    pub attendance: AttendanceSettings,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailSettings {
    pub recipients: Vec<String>,
    pub attachments: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttendanceSettings {
    pub output_path: String,
    /// 未設定時使用當地日期 YYYYMMDD
    pub label: Option<String>,
    pub columns: AttendanceColumns,
}

impl Default for AttendanceSettings {
    fn default() -> Self {
        Self {
            output_path: "./output".to_string(),
            label: None,
            columns: AttendanceColumns::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub json_logs: bool,
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置，${VAR} 以環境變數替換
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_vars(content, |name| std::env::var(name).ok())?;
        Self::parse(&processed_content)
    }

    fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| OpsError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 有指定路徑就一定要讀到；沒指定時預設檔案不存在則使用預設值
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                Self::from_file(path)
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                tracing::debug!("Loading configuration from {}", DEFAULT_CONFIG_FILE);
                Self::from_file(DEFAULT_CONFIG_FILE)
            }
            None => {
                tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                Ok(Self::default())
            }
        }
    }

    /// 祕密只從環境取得，不寫在設定檔裡
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup(SECRET_KEY_ENV).filter(|s| !s.trim().is_empty()) {
            self.checkin.secret_key = secret;
        }
    }
}

/// 替換 ${VAR_NAME}；找不到的變數保持原樣
pub fn substitute_vars<F>(content: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| OpsError::ConfigError {
        message: format!("Invalid substitution pattern: {}", e),
    })?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        lookup(var_name).unwrap_or_else(|| format!("${{{}}}", var_name))
    });

    Ok(result.into_owned())
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("attendance.output_path", &self.attendance.output_path)?;
        validation::validate_non_empty_string(
            "attendance.columns.name",
            &self.attendance.columns.name,
        )?;
        if let Some(label) = &self.attendance.label {
            validation::validate_non_empty_string("attendance.label", label)?;
        }

        validation::validate_timezone("checkin.timezone", &self.checkin.timezone)?;
        validation::validate_non_empty_string("smtp.server", &self.smtp.server)?;
        for recipient in &self.email.recipients {
            validation::validate_email_address("email.recipients", recipient)?;
        }

        self.forms.validate()
    }
}
