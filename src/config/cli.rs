use crate::config::toml_config::AppConfig;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "odyssey")]
#[command(about = "Operations tooling for the Odyssey dance troupe", version)]
pub struct CliConfig {
    // 未指定時讀取 ./odyssey.toml (若存在)
    #[arg(long, global = true, help = "Path to the TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log CPU and memory usage")]
    pub monitor: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Clean a Google Forms attendance export and bundle the report
    Attendance(AttendanceArgs),
    /// Generate a signed check-in QR code for the current event
    Qr(QrArgs),
    /// Verify a check-in token or check-in URL
    Verify(VerifyArgs),
    /// Send the attendance email to every recipient
    Email(EmailArgs),
    /// Manage Google Forms
    #[command(subcommand)]
    Forms(FormsCommand),
}

#[derive(Debug, Clone, Args)]
pub struct AttendanceArgs {
    /// Attendance CSV exported from Google Forms
    pub input: PathBuf,

    #[arg(long)]
    pub output_path: Option<String>,

    #[arg(long, help = "Report label, defaults to today's date (YYYYMMDD)")]
    pub label: Option<String>,

    #[arg(long, help = "Email the report to the configured recipients")]
    pub send: bool,
}

#[derive(Debug, Clone, Args)]
pub struct QrArgs {
    #[arg(long)]
    pub base_url: Option<String>,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long)]
    pub logo: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct VerifyArgs {
    /// Token, or a full check-in URL carrying `sig=`
    pub token: String,

    #[arg(long)]
    pub max_age_hours: Option<i64>,
}

#[derive(Debug, Clone, Args)]
pub struct EmailArgs {
    #[arg(long = "to", value_delimiter = ',')]
    pub recipients: Vec<String>,

    #[arg(long = "attach")]
    pub attachments: Vec<PathBuf>,

    #[arg(long, help = "Only check the SMTP login, send nothing")]
    pub test_connection: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum FormsCommand {
    /// Create a form from a JSON template
    Create {
        template: PathBuf,

        #[arg(long, help = "Key of the template inside a multi-template file")]
        key: Option<String>,

        #[arg(long)]
        publish: bool,
    },
    /// Fetch a form's JSON by id
    Get {
        form_id: String,

        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Create a blank Odyssey-Attendance form
    Practice {
        #[arg(long)]
        publish: bool,
    },
}

impl CliConfig {
    /// 命令列參數覆蓋設定檔
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if self.monitor {
            config.monitoring.enabled = true;
        }
        if self.json_logs {
            config.monitoring.json_logs = true;
        }

        match &self.command {
            Command::Attendance(args) => {
                if let Some(output_path) = &args.output_path {
                    config.attendance.output_path = output_path.clone();
                }
                if let Some(label) = &args.label {
                    config.attendance.label = Some(label.clone());
                }
            }
            Command::Qr(args) => {
                if let Some(base_url) = &args.base_url {
                    config.checkin.base_url = base_url.clone();
                }
                if let Some(output_dir) = &args.output_dir {
                    config.checkin.output_dir = output_dir.clone();
                }
                if let Some(logo) = &args.logo {
                    config.checkin.logo_path = logo.clone();
                }
            }
            Command::Verify(args) => {
                if let Some(hours) = args.max_age_hours {
                    config.checkin.valid_for_hours = hours;
                }
            }
            Command::Email(args) => {
                if !args.recipients.is_empty() {
                    config.email.recipients = args.recipients.clone();
                }
                if !args.attachments.is_empty() {
                    config.email.attachments = args.attachments.clone();
                }
            }
            Command::Forms(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attendance_overrides() {
        let cli = CliConfig::parse_from([
            "odyssey",
            "--monitor",
            "attendance",
            "export.csv",
            "--output-path",
            "./weekly",
            "--label",
            "20251216",
            "--send",
        ]);
        let mut config = AppConfig::default();

        cli.apply_overrides(&mut config);

        assert!(config.monitoring.enabled);
        assert_eq!(config.attendance.output_path, "./weekly");
        assert_eq!(config.attendance.label.as_deref(), Some("20251216"));
        match cli.command {
            Command::Attendance(args) => assert!(args.send),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_email_recipients_are_comma_separated() {
        let cli = CliConfig::parse_from([
            "odyssey",
            "email",
            "--to",
            "a@example.com,b@example.com",
            "--attach",
            "output/attendance_20251216.zip",
        ]);
        let mut config = AppConfig::default();

        cli.apply_overrides(&mut config);

        assert_eq!(config.email.recipients, vec!["a@example.com", "b@example.com"]);
        assert_eq!(config.email.attachments.len(), 1);
    }

    #[test]
    fn test_forms_subcommands_and_global_flags() {
        let cli = CliConfig::parse_from(["odyssey", "forms", "get", "form-123", "--verbose"]);
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Command::Forms(FormsCommand::Get { ref form_id, .. }) if form_id == "form-123"
        ));
    }

    #[test]
    fn test_qr_overrides_keep_other_settings() {
        let cli = CliConfig::parse_from([
            "odyssey",
            "qr",
            "--base-url",
            "https://odyssey.example.com/checkin",
        ]);
        let mut config = AppConfig::default();

        cli.apply_overrides(&mut config);

        assert_eq!(config.checkin.base_url, "https://odyssey.example.com/checkin");
        assert_eq!(config.checkin.qr_size, 800);
    }
}
