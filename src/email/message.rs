use crate::email::templates;
use crate::utils::error::{OpsError, Result};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart};
use lettre::Message;
use std::path::{Path, PathBuf};

/// 一封要寄出的信
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub destination_email_address: String,
    pub subject: String,
    pub plain_text_body: String,
    pub html_body: String,
    pub attachments: Vec<PathBuf>,
}

/// 尚未指定收件人的信件內容，群發時每位收件人各自產生一封
#[derive(Debug, Clone, PartialEq)]
pub struct EmailDraft {
    pub subject: String,
    pub plain_text_body: String,
    pub html_body: String,
    pub attachments: Vec<PathBuf>,
}

impl EmailDraft {
    pub fn attendance(attachments: Vec<PathBuf>) -> Self {
        Self {
            subject: templates::ATTENDANCE_SUBJECT.to_string(),
            plain_text_body: templates::ATTENDANCE_PLAIN_TEXT.to_string(),
            html_body: templates::ATTENDANCE_HTML.to_string(),
            attachments,
        }
    }

    pub fn addressed_to(&self, recipient: &str) -> EmailMessage {
        EmailMessage {
            destination_email_address: recipient.to_string(),
            subject: self.subject.clone(),
            plain_text_body: self.plain_text_body.clone(),
            html_body: self.html_body.clone(),
            attachments: self.attachments.clone(),
        }
    }
}

fn attachment_part(path: &Path) -> Result<lettre::message::SinglePart> {
    if !path.exists() {
        return Err(OpsError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Could not find file: {}", path.display()),
        )));
    }

    let body = std::fs::read(path)?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let content_type =
        ContentType::parse(mime.essence_str()).map_err(|e| OpsError::MailError {
            message: format!("unsupported content type {}: {}", mime, e),
        })?;
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("attachment")
        .to_string();

    Ok(Attachment::new(filename).body(body, content_type))
}

impl EmailMessage {
    fn check_contents(&self) -> Result<()> {
        let required = [
            ("plain text alternative", &self.plain_text_body),
            ("HTML body", &self.html_body),
            ("subject", &self.subject),
        ];
        for (part, value) in required {
            if value.trim().is_empty() {
                return Err(OpsError::MailError {
                    message: format!("Must specify a {} in the email contents", part),
                });
            }
        }
        Ok(())
    }

    /// 組成 multipart/mixed：先放 plain/html 的 alternative，再接附件
    ///
    /// 郵件軟體會優先顯示 alternative 中最後一個版本，所以 HTML 放在後面。
    pub fn build(&self, sender: &str) -> Result<Message> {
        self.check_contents()?;

        let from: Mailbox = sender.parse()?;
        let to: Mailbox = self.destination_email_address.parse()?;

        let mut body = MultiPart::mixed().multipart(MultiPart::alternative_plain_html(
            self.plain_text_body.clone(),
            self.html_body.clone(),
        ));
        for path in &self.attachments {
            body = body.singlepart(attachment_part(path)?);
        }

        Ok(Message::builder()
            .from(from)
            .to(to)
            .subject(self.subject.clone())
            .multipart(body)?)
    }
}
