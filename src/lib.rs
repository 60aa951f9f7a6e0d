pub mod checkin;
pub mod config;
pub mod core;
pub mod domain;
pub mod email;
pub mod forms;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{AppConfig, AttendanceJob, LocalStorage};

pub use checkin::{generate_checkin_qr, CheckinArtifact, CheckinSettings, TokenPayload, TokenSigner};
pub use core::{etl::EtlEngine, pipeline::AttendancePipeline};
pub use email::{send_to_recipients, EmailClient, EmailDraft, EmailMessage, SmtpConfig, SmtpMailer};
pub use forms::{create_practice_form, FormTemplate, FormsApiClient, FormsApiConfig, GoogleForm};
pub use utils::error::{OpsError, Result};
