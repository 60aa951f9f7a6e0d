use anyhow::Result;
use odyssey_ops::email::SecurityContract;
use odyssey_ops::utils::validation::Validate;
use odyssey_ops::AppConfig;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_config_file_with_environment_placeholders() -> Result<()> {
    std::env::set_var("ODYSSEY_TEST_CHECKIN_URL", "https://odyssey.example.com/checkin");

    let mut file = NamedTempFile::new()?;
    writeln!(
        file,
        r#"
[checkin]
base_url = "${{ODYSSEY_TEST_CHECKIN_URL}}"
timezone = "America/Vancouver"

[smtp]
server = "smtp.example.com"
port = 587
security = "starttls"

[email]
recipients = ["odyssey.management@example.com"]
attachments = ["static/weekly_notes.pdf"]

[forms]
token_path = "secrets/token.json"

[attendance.columns]
name = "Name"
email = "Email"
"#
    )?;

    let mut config = AppConfig::from_file(file.path())?;
    config.apply_env(|name| (name == "SECRET_KEY").then(|| "troupe-secret".to_string()));

    assert_eq!(config.checkin.base_url, "https://odyssey.example.com/checkin");
    assert_eq!(config.checkin.timezone, "America/Vancouver");
    assert_eq!(config.checkin.secret_key, "troupe-secret");
    assert_eq!(config.smtp.security, SecurityContract::StartTls);
    assert_eq!(config.smtp.port, 587);
    assert_eq!(config.email.attachments.len(), 1);
    assert_eq!(config.forms.token_path.to_string_lossy(), "secrets/token.json");
    assert_eq!(
        config.forms.base_url,
        "https://forms.googleapis.com/v1"
    );
    assert_eq!(config.attendance.columns.name, "Name");
    assert_eq!(config.attendance.columns.timestamp, "Timestamp");
    assert_eq!(config.attendance.output_path, "./output");
    config.validate()?;
    config.checkin.validate()?;
    Ok(())
}

#[test]
fn test_invalid_timezone_fails_validation() -> Result<()> {
    let config = AppConfig::from_toml_str("[checkin]\ntimezone = \"Mars/Olympus_Mons\"\n")?;
    assert!(config.validate().is_err());
    Ok(())
}

#[test]
fn test_empty_file_gives_defaults() -> Result<()> {
    let config = AppConfig::from_toml_str("")?;

    assert_eq!(config.smtp.server, "smtp.gmail.com");
    assert_eq!(config.checkin.valid_for_hours, 48);
    assert!(!config.monitoring.enabled);
    assert!(config.email.recipients.is_empty());
    config.validate()?;
    Ok(())
}
