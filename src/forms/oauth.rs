//! Google OAuth 2.0：重用 / 更新 `token.json`，必要時走 installed-app 流程
//!
//! `token.json` 與 Google Python client 的 authorized-user 格式相容，
//! 兩邊的工具可以共用同一份授權。

use crate::utils::error::{OpsError, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use rand::Rng;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use url::Url;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub(crate) const EXPIRY_SKEW_SECONDS: i64 = 60;
const CONSENT_TIMEOUT_SECONDS: u64 = 300;

fn auth_error(message: impl Into<String>) -> OpsError {
    OpsError::AuthError {
        message: message.into(),
    }
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

/// `token.json` 的內容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizedUser {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl AuthorizedUser {
    /// 沒有 expiry 的 token 視為長期有效
    pub fn valid_token_at(&self, now: DateTime<Utc>) -> Option<&str> {
        let token = self.token.as_deref()?;
        match self.expiry {
            Some(expiry) if expiry <= now + Duration::seconds(EXPIRY_SKEW_SECONDS) => None,
            _ => Some(token),
        }
    }

    pub fn covers_scopes(&self, scopes: &[String]) -> bool {
        self.scopes.is_empty() || scopes.iter().all(|scope| self.scopes.contains(scope))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| auth_error(format!("{} is not a valid token file: {}", path.display(), e)))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

/// Google Cloud Console 下載的 `credentials.json`
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecretsFile {
    pub installed: Option<ClientSecret>,
    pub web: Option<ClientSecret>,
}

impl ClientSecretsFile {
    pub fn load(path: &Path) -> Result<ClientSecret> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            auth_error(format!(
                "Could not read client secrets {}: {}",
                path.display(),
                e
            ))
        })?;
        let file: ClientSecretsFile = serde_json::from_str(&content)?;
        file.installed
            .or(file.web)
            .ok_or_else(|| auth_error("credentials.json has neither 'installed' nor 'web' section"))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

pub struct GoogleAuthenticator {
    token_path: PathBuf,
    client_secrets_path: PathBuf,
    scopes: Vec<String>,
    http: Client,
}

impl GoogleAuthenticator {
    pub fn new(
        token_path: PathBuf,
        client_secrets_path: PathBuf,
        scopes: Vec<String>,
        http: Client,
    ) -> Self {
        Self {
            token_path,
            client_secrets_path,
            scopes,
            http,
        }
    }

    /// 取得可用的 access token，過期就更新，沒有授權就請使用者登入
    pub async fn access_token(&self) -> Result<String> {
        Ok(self.access_token_with_expiry().await?.0)
    }

    /// 同 access_token，另外回傳到期時間讓呼叫端自行快取
    pub async fn access_token_with_expiry(&self) -> Result<(String, Option<DateTime<Utc>>)> {
        let now = Utc::now();
        let existing = if self.token_path.exists() {
            Some(AuthorizedUser::load(&self.token_path)?)
        } else {
            None
        };

        let user = match existing {
            Some(user) if user.covers_scopes(&self.scopes) => {
                if let Some(token) = user.valid_token_at(now) {
                    tracing::debug!("Reusing access token from {}", self.token_path.display());
                    return Ok((token.to_string(), user.expiry));
                }
                if user.refresh_token.is_some() {
                    self.refresh(user).await?
                } else {
                    self.run_installed_flow().await?
                }
            }
            _ => self.run_installed_flow().await?,
        };

        user.save(&self.token_path)?;
        let token = user
            .token
            .ok_or_else(|| auth_error("Token endpoint returned no access token"))?;
        Ok((token, user.expiry))
    }

    async fn request_token(&self, token_uri: &str, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self.http.post(token_uri).form(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(auth_error(format!(
                "Token endpoint returned {}: {}",
                status, body
            )));
        }
        Ok(response.json().await?)
    }

    pub async fn refresh(&self, mut user: AuthorizedUser) -> Result<AuthorizedUser> {
        let refresh_token = user
            .refresh_token
            .clone()
            .ok_or_else(|| auth_error("No refresh token available"))?;

        tracing::info!("🔄 Refreshing Google access token");
        let response = self
            .request_token(
                &user.token_uri,
                &[
                    ("client_id", user.client_id.as_str()),
                    ("client_secret", user.client_secret.as_str()),
                    ("refresh_token", refresh_token.as_str()),
                    ("grant_type", "refresh_token"),
                ],
            )
            .await?;

        apply_token_response(&mut user, response, Utc::now());
        Ok(user)
    }

    async fn run_installed_flow(&self) -> Result<AuthorizedUser> {
        let secret = ClientSecretsFile::load(&self.client_secrets_path)?;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let redirect_uri = format!("http://127.0.0.1:{}/", listener.local_addr()?.port());
        let state = consent_state();
        let auth_url = authorization_url(&secret, &redirect_uri, &self.scopes, &state)?;

        tracing::info!("🔐 Google authorization required");
        println!("Please visit this URL to authorize this application:\n{}", auth_url);

        let accepted = tokio::time::timeout(
            std::time::Duration::from_secs(CONSENT_TIMEOUT_SECONDS),
            listener.accept(),
        )
        .await
        .map_err(|_| auth_error("Timed out waiting for the browser authorization"))?;
        let (mut stream, _) = accepted?;

        let mut request_line = String::new();
        BufReader::new(&mut stream)
            .read_line(&mut request_line)
            .await?;

        let outcome = parse_callback(&request_line, &state);
        let page = if outcome.is_ok() {
            "The authentication flow has completed. You may close this window."
        } else {
            "The authentication flow failed. Check the terminal for details."
        };
        stream
            .write_all(
                format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nConnection: close\r\n\r\n<html><body>{}</body></html>",
                    page
                )
                .as_bytes(),
            )
            .await?;
        stream.shutdown().await.ok();

        let code = outcome?;
        let response = self
            .request_token(
                &secret.token_uri,
                &[
                    ("code", code.as_str()),
                    ("client_id", secret.client_id.as_str()),
                    ("client_secret", secret.client_secret.as_str()),
                    ("redirect_uri", redirect_uri.as_str()),
                    ("grant_type", "authorization_code"),
                ],
            )
            .await?;

        let mut user = AuthorizedUser {
            token: None,
            refresh_token: None,
            client_id: secret.client_id,
            client_secret: secret.client_secret,
            token_uri: secret.token_uri,
            scopes: self.scopes.clone(),
            expiry: None,
        };
        apply_token_response(&mut user, response, Utc::now());
        tracing::info!("✅ Google authorization saved to {}", self.token_path.display());
        Ok(user)
    }
}

fn apply_token_response(user: &mut AuthorizedUser, response: TokenResponse, now: DateTime<Utc>) {
    user.token = Some(response.access_token);
    user.expiry = response
        .expires_in
        .map(|seconds| now + Duration::seconds(seconds));
    // Google 更新 token 時通常不會再給 refresh_token，保留原本的
    if let Some(refresh_token) = response.refresh_token {
        user.refresh_token = Some(refresh_token);
    }
    if let Some(scope) = response.scope {
        user.scopes = scope.split_whitespace().map(str::to_string).collect();
    }
}

/// 防 CSRF 的 state，32 bytes 亂數
fn consent_state() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn authorization_url(
    secret: &ClientSecret,
    redirect_uri: &str,
    scopes: &[String],
    state: &str,
) -> Result<Url> {
    let mut url = Url::parse(&secret.auth_uri)
        .map_err(|e| auth_error(format!("Invalid auth_uri {}: {}", secret.auth_uri, e)))?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &secret.client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("scope", &scopes.join(" "))
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent")
        .append_pair("state", state);
    Ok(url)
}

/// 解析瀏覽器導回 loopback 的請求行，例如 `GET /?code=...&state=... HTTP/1.1`
pub fn parse_callback(request_line: &str, expected_state: &str) -> Result<String> {
    let target = request_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| auth_error("Malformed authorization callback"))?;
    let url = Url::parse(&format!("http://127.0.0.1{}", target))
        .map_err(|e| auth_error(format!("Malformed authorization callback: {}", e)))?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => return Err(auth_error(format!("Authorization denied: {}", value))),
            _ => {}
        }
    }

    if state.as_deref() != Some(expected_state) {
        return Err(auth_error("Authorization state mismatch"));
    }
    code.ok_or_else(|| auth_error("Authorization callback had no code"))
}
