//! 簽章 token：防止出席 QR code 的連結被竄改或重複使用
//!
//! Token 格式為 `payload.timestamp.signature`，三段皆為無 padding 的 URL-safe base64。
//! 簽章金鑰由 `SHA-256(salt ‖ "signer" ‖ secret)` 衍生，簽章為 HMAC-SHA256。

use crate::utils::error::{OpsError, Result, TokenRejection};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// 未設定 SECRET_KEY 時的預設值，不允許用來簽章
pub const PLACEHOLDER_SECRET: &str = "PLACEHOLDER";

/// 允許的時鐘誤差
const FUTURE_SKEW_SECONDS: i64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPayload {
    pub event_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TokenPayload {
    pub fn new(event_id: impl Into<String>, issued_at: DateTime<Utc>, valid_for: Duration) -> Self {
        Self {
            event_id: event_id.into(),
            issued_at,
            expires_at: issued_at + valid_for,
        }
    }
}

pub struct TokenSigner {
    key: Vec<u8>,
}

fn rejected(reason: TokenRejection) -> OpsError {
    OpsError::TokenError { reason }
}

fn encode_timestamp(seconds: i64) -> String {
    let bytes = (seconds.max(0) as u64).to_be_bytes();
    let first = bytes
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(bytes.len() - 1);
    URL_SAFE_NO_PAD.encode(&bytes[first..])
}

fn decode_timestamp(segment: &str) -> Result<i64> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| rejected(TokenRejection::Malformed))?;
    if bytes.is_empty() || bytes.len() > 8 {
        return Err(rejected(TokenRejection::Malformed));
    }
    let value = bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
    i64::try_from(value).map_err(|_| rejected(TokenRejection::Malformed))
}

impl TokenSigner {
    pub fn new(secret: &str, salt: &str) -> Result<Self> {
        if secret.trim().is_empty() || secret == PLACEHOLDER_SECRET {
            return Err(OpsError::MissingConfigError {
                field: "SECRET_KEY".to_string(),
            });
        }

        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(b"signer");
        hasher.update(secret.as_bytes());

        Ok(Self {
            key: hasher.finalize().to_vec(),
        })
    }

    fn mac(&self, value: &str) -> Result<HmacSha256> {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).map_err(|e| OpsError::ProcessingError {
                message: format!("Invalid signing key: {}", e),
            })?;
        mac.update(value.as_bytes());
        Ok(mac)
    }

    pub fn sign_at(&self, payload: &TokenPayload, now: DateTime<Utc>) -> Result<String> {
        let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload)?);
        let value = format!("{}.{}", body, encode_timestamp(now.timestamp()));
        let signature = self.mac(&value)?.finalize().into_bytes();
        Ok(format!("{}.{}", value, URL_SAFE_NO_PAD.encode(signature)))
    }

    pub fn sign(&self, payload: &TokenPayload) -> Result<String> {
        self.sign_at(payload, Utc::now())
    }

    /// 依序檢查簽章、簽發時間與 payload 內的到期時間
    pub fn verify_at(&self, token: &str, max_age: Duration, now: DateTime<Utc>) -> Result<TokenPayload> {
        let (value, signature) = token
            .rsplit_once('.')
            .ok_or_else(|| rejected(TokenRejection::Malformed))?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| rejected(TokenRejection::Malformed))?;

        self.mac(value)?
            .verify_slice(&signature)
            .map_err(|_| rejected(TokenRejection::BadSignature))?;

        let (body, timestamp) = value
            .split_once('.')
            .ok_or_else(|| rejected(TokenRejection::Malformed))?;

        let signed_at = decode_timestamp(timestamp)?;
        if signed_at > now.timestamp() + FUTURE_SKEW_SECONDS {
            return Err(rejected(TokenRejection::NotYetValid));
        }
        if now.timestamp() - signed_at > max_age.num_seconds() {
            return Err(rejected(TokenRejection::Expired));
        }

        let payload: TokenPayload = URL_SAFE_NO_PAD
            .decode(body)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .ok_or_else(|| rejected(TokenRejection::Malformed))?;

        if payload.expires_at < now {
            return Err(rejected(TokenRejection::Expired));
        }

        Ok(payload)
    }

    pub fn verify(&self, token: &str, max_age: Duration) -> Result<TokenPayload> {
        self.verify_at(token, max_age, Utc::now())
    }
}
