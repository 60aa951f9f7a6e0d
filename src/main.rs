use chrono::Utc;
use clap::Parser;
use odyssey_ops::config::cli::{AttendanceArgs, Command, EmailArgs, FormsCommand, VerifyArgs};
use odyssey_ops::forms::{create_from_template, pull_form_json};
use odyssey_ops::utils::error::ErrorSeverity;
use odyssey_ops::utils::{logger, validation::Validate};
use odyssey_ops::{
    create_practice_form, generate_checkin_qr, send_to_recipients, AppConfig, AttendanceJob,
    AttendancePipeline, CliConfig, EmailClient, EmailDraft, EtlEngine, FormTemplate,
    FormsApiClient, GoogleForm, LocalStorage, OpsError, Result, SmtpMailer, TokenSigner,
};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 不存在也沒關係
    dotenvy::dotenv().ok();

    let cli = CliConfig::parse();
    let loaded = AppConfig::load(cli.config.as_deref());

    // 初始化日誌
    let json_logs = cli.json_logs
        || loaded
            .as_ref()
            .map(|config| config.monitoring.json_logs)
            .unwrap_or(false);
    if json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting odyssey CLI");

    let result = match loaded {
        Ok(mut config) => {
            config.apply_env(|name| std::env::var(name).ok());
            cli.apply_overrides(&mut config);
            run(cli.command, config).await
        }
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        // 記錄詳細錯誤信息
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn run(command: Command, config: AppConfig) -> Result<()> {
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        return Err(e);
    }
    if config.monitoring.enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    match command {
        Command::Attendance(args) => run_attendance(args, &config).await,
        Command::Qr(_) => run_qr(&config),
        Command::Verify(args) => run_verify(args, &config),
        Command::Email(args) => run_email(args, &config).await,
        Command::Forms(command) => run_forms(command, &config).await,
    }
}

async fn run_attendance(args: AttendanceArgs, config: &AppConfig) -> Result<()> {
    let input = std::path::absolute(&args.input)?;
    let job = AttendanceJob::from_config(config, input.to_string_lossy(), Utc::now())?;

    // 創建存儲和管道
    let storage = LocalStorage::new(&job.output_path);
    let pipeline = AttendancePipeline::new(storage, job);
    let engine = EtlEngine::new_with_monitoring(pipeline, config.monitoring.enabled);

    let output_path = engine.run().await?;
    tracing::info!("✅ Attendance report completed successfully!");
    println!("✅ Attendance report completed successfully!");
    println!("📁 Output saved to: {}", output_path);

    if args.send {
        let mut attachments = vec![PathBuf::from(&output_path)];
        attachments.extend(config.email.attachments.iter().cloned());
        send_attendance_email(config, attachments).await?;
    }
    Ok(())
}

fn run_qr(config: &AppConfig) -> Result<()> {
    config.checkin.validate()?;
    let artifact = generate_checkin_qr(&config.checkin, Utc::now())?;

    println!("✅ Check-in QR code generated");
    println!("🎟️  Event:   {}", artifact.event_id);
    println!("⏰ Expires: {}", artifact.expires_at.to_rfc3339());
    println!("🔗 URL:     {}", artifact.url);
    println!("📁 Saved:   {}", artifact.path.display());
    Ok(())
}

/// 接受單純的 token 或帶有 sig= 的完整網址
fn token_from_input(input: &str) -> String {
    url::Url::parse(input)
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == "sig")
                .map(|(_, value)| value.into_owned())
        })
        .unwrap_or_else(|| input.trim().to_string())
}

fn run_verify(args: VerifyArgs, config: &AppConfig) -> Result<()> {
    let signer = TokenSigner::new(&config.checkin.secret_key, &config.checkin.sign_salt)?;
    let payload = signer.verify(&token_from_input(&args.token), config.checkin.max_age())?;

    tracing::info!("✅ Token valid for event {}", payload.event_id);
    println!("✅ Valid check-in token");
    println!("🎟️  Event:   {}", payload.event_id);
    println!("🕒 Issued:  {}", payload.issued_at.to_rfc3339());
    println!("⏰ Expires: {}", payload.expires_at.to_rfc3339());
    Ok(())
}

async fn run_email(args: EmailArgs, config: &AppConfig) -> Result<()> {
    if args.test_connection {
        let smtp = config.smtp.clone().with_env_credentials()?;
        smtp.validate()?;
        let connected = SmtpMailer::new(&smtp)?.test_connection().await?;
        println!(
            "{} SMTP login to {}:{}",
            if connected { "✅" } else { "❌" },
            smtp.server,
            smtp.port
        );
        return Ok(());
    }

    send_attendance_email(config, config.email.attachments.clone()).await
}

async fn send_attendance_email(config: &AppConfig, attachments: Vec<PathBuf>) -> Result<()> {
    if config.email.recipients.is_empty() {
        return Err(OpsError::MissingConfigError {
            field: "email.recipients".to_string(),
        });
    }

    let smtp = config.smtp.clone().with_env_credentials()?;
    smtp.validate()?;

    let client = EmailClient::new(SmtpMailer::new(&smtp)?, &smtp.sender_email_address);
    let draft = EmailDraft::attendance(attachments);
    let reports = send_to_recipients(&client, &config.email.recipients, &draft).await;

    for report in &reports {
        let status = if report.delivered { "PASS" } else { "FAIL" };
        println!("📧 {} ... {}", report.recipient, status);
    }

    let failed = reports.iter().filter(|r| !r.delivered).count();
    if failed > 0 {
        return Err(OpsError::MailError {
            message: format!("{} of {} emails were not delivered", failed, reports.len()),
        });
    }
    Ok(())
}

fn print_form(form: &GoogleForm<FormsApiClient>) {
    println!("✅ Created form:");
    println!("  title: {}", form.template.title);
    println!("  formId: {}", form.form_id.as_deref().unwrap_or("-"));
    println!("  responderUri: {}", form.responder_uri.as_deref().unwrap_or("-"));
}

async fn run_forms(command: FormsCommand, config: &AppConfig) -> Result<()> {
    let client = FormsApiClient::new(config.forms.clone())?;
    tracing::debug!("Using {}", client);

    match command {
        FormsCommand::Create {
            template,
            key,
            publish,
        } => {
            let template = FormTemplate::from_json_file(&template, key.as_deref())?;
            tracing::info!("Loaded {}", template);
            let form = create_from_template(client, template).await?;
            if publish {
                form.publish().await?;
                tracing::info!("🌐 Form published");
            }
            print_form(&form);
        }
        FormsCommand::Get { form_id, output } => {
            let form = pull_form_json(&client, &form_id, output.as_deref()).await?;
            if output.is_none() {
                println!("{}", serde_json::to_string_pretty(&form)?);
            }
        }
        FormsCommand::Practice { publish } => {
            let form = create_practice_form(client).await?;
            if publish {
                form.publish().await?;
                tracing::info!("🌐 Form published");
            }
            print_form(&form);
        }
    }
    Ok(())
}
