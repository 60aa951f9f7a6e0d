use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpsError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("QR encoding error: {0}")]
    QrError(#[from] qrcode::types::QrError),

    #[error("Mail composition error: {message}")]
    MailError { message: String },

    #[error("SMTP transport error: {0}")]
    SmtpError(#[from] lettre::transport::smtp::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Google API returned {status}: {message}")]
    GoogleApiError { status: u16, message: String },

    #[error("Authorization error: {message}")]
    AuthError { message: String },

    #[error("Token rejected: {reason}")]
    TokenError { reason: TokenRejection },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

/// 簽章 token 被拒絕的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    Malformed,
    BadSignature,
    Expired,
    /// 簽發時間在未來
    NotYetValid,
}

impl std::fmt::Display for TokenRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            TokenRejection::Malformed => "malformed token",
            TokenRejection::BadSignature => "signature does not match",
            TokenRejection::Expired => "token has expired",
            TokenRejection::NotYetValid => "token was signed in the future",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Authorization,
    Data,
    Storage,
    Mail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl OpsError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            OpsError::ConfigError { .. }
            | OpsError::MissingConfigError { .. }
            | OpsError::InvalidConfigValueError { .. }
            | OpsError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            OpsError::ApiError(_) | OpsError::GoogleApiError { .. } => ErrorCategory::Network,
            OpsError::AuthError { .. } | OpsError::TokenError { .. } => {
                ErrorCategory::Authorization
            }
            OpsError::CsvError(_)
            | OpsError::SerializationError(_)
            | OpsError::ImageError(_)
            | OpsError::QrError(_)
            | OpsError::ProcessingError { .. }
            | OpsError::ValidationError { .. } => ErrorCategory::Data,
            OpsError::ZipError(_) | OpsError::IoError(_) => ErrorCategory::Storage,
            OpsError::MailError { .. } | OpsError::SmtpError(_) => ErrorCategory::Mail,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network | ErrorCategory::Mail => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Authorization => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            OpsError::MissingConfigError { .. } | OpsError::ConfigError { .. } => {
                "Check odyssey.toml and the .env file for the missing values"
            }
            OpsError::InvalidConfigValueError { .. } | OpsError::ConfigValidationError { .. } => {
                "Correct the reported configuration value and run again"
            }
            OpsError::ApiError(_) | OpsError::GoogleApiError { .. } => {
                "Check the network connection and retry in a few minutes"
            }
            OpsError::AuthError { .. } => {
                "Delete token.json and sign in again, or verify credentials.json"
            }
            OpsError::TokenError { .. } => "Generate a fresh check-in QR code for the event",
            OpsError::SmtpError(_) | OpsError::MailError { .. } => {
                "Verify the sender address and the Google app password"
            }
            OpsError::CsvError(_) | OpsError::ValidationError { .. } => {
                "Re-export the attendance sheet from Google Forms as CSV"
            }
            OpsError::IoError(_) | OpsError::ZipError(_) => {
                "Check that the paths exist and are writable"
            }
            _ => "Run again with --verbose for more detail",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Network => format!("Could not reach a remote service: {}", self),
            ErrorCategory::Authorization => format!("Not authorized: {}", self),
            ErrorCategory::Data => format!("Could not process the data: {}", self),
            ErrorCategory::Storage => format!("File operation failed: {}", self),
            ErrorCategory::Mail => format!("Email could not be sent: {}", self),
        }
    }
}

impl From<lettre::address::AddressError> for OpsError {
    fn from(e: lettre::address::AddressError) -> Self {
        OpsError::MailError {
            message: format!("invalid address: {}", e),
        }
    }
}

impl From<lettre::error::Error> for OpsError {
    fn from(e: lettre::error::Error) -> Self {
        OpsError::MailError {
            message: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OpsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_follows_category() {
        let err = OpsError::MissingConfigError {
            field: "smtp.sender".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::Critical);

        let err = OpsError::TokenError {
            reason: TokenRejection::Expired,
        };
        assert_eq!(err.category(), ErrorCategory::Authorization);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert_eq!(err.to_string(), "Token rejected: token has expired");
    }

    #[test]
    fn test_user_friendly_message_mentions_cause() {
        let err = OpsError::ValidationError {
            message: "missing column 'Full Name'".to_string(),
        };
        assert!(err.user_friendly_message().contains("Full Name"));
    }
}
