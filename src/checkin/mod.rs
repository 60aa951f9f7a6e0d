pub mod event;
pub mod qr;
pub mod token;

use crate::utils::error::{OpsError, Result};
use crate::utils::validation::{self, Validate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use qr::{generate_checkin_qr, CheckinArtifact};
pub use token::{TokenPayload, TokenSigner};

/// 出席 QR code 的產生設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckinSettings {
    pub base_url: String,
    /// 只從環境變數 SECRET_KEY 取得，設定檔裡的值會被忽略
    #[serde(skip, default = "placeholder_secret")]
    pub secret_key: String,
    pub logo_path: PathBuf,
    pub output_dir: PathBuf,
    pub qr_size: u32,
    pub logo_scale: f32,
    pub border_frac: f32,
    pub corner_radius: u32,
    pub valid_for_hours: i64,
    pub sign_salt: String,
    pub timezone: String,
}

fn placeholder_secret() -> String {
    token::PLACEHOLDER_SECRET.to_string()
}

impl Default for CheckinSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            secret_key: placeholder_secret(),
            logo_path: PathBuf::from("static/Odyssey_Logo.png"),
            output_dir: PathBuf::from("."),
            qr_size: 800,
            logo_scale: 0.25,
            border_frac: 0.03,
            corner_radius: 18,
            valid_for_hours: 48,
            sign_salt: "attendance-token".to_string(),
            timezone: "America/Toronto".to_string(),
        }
    }
}

impl CheckinSettings {
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| OpsError::InvalidConfigValueError {
                field: "checkin.timezone".to_string(),
                value: self.timezone.clone(),
                reason: format!("Unknown timezone: {}", e),
            })
    }

    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::hours(self.valid_for_hours)
    }
}

impl Validate for CheckinSettings {
    fn validate(&self) -> Result<()> {
        validation::validate_url("checkin.base_url", &self.base_url)?;
        validation::validate_timezone("checkin.timezone", &self.timezone)?;
        validation::validate_non_empty_string("checkin.sign_salt", &self.sign_salt)?;
        validation::validate_range("checkin.qr_size", self.qr_size, 100, 4000)?;
        // logo 太大會蓋掉 H 級錯誤修正能還原的範圍
        validation::validate_range("checkin.logo_scale", self.logo_scale, 0.0, 0.3)?;
        validation::validate_range("checkin.border_frac", self.border_frac, 0.0, 0.5)?;
        validation::validate_range("checkin.valid_for_hours", self.valid_for_hours, 1, 24 * 30)?;
        Ok(())
    }
}
