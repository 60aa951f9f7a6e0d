pub mod message;
pub mod smtp;
pub mod templates;

pub use message::{EmailDraft, EmailMessage};
pub use smtp::{send_to_recipients, EmailClient, SecurityContract, SendReport, SmtpConfig, SmtpMailer};
