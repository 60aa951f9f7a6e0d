use crate::domain::ports::FormsApi;
use crate::forms::oauth::{GoogleAuthenticator, EXPIRY_SKEW_SECONDS};
use crate::utils::error::{OpsError, Result};
use crate::utils::validation::{self, Validate};
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Mutex;

pub const FORMS_BODY_SCOPE: &str = "https://www.googleapis.com/auth/forms.body";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormsApiConfig {
    pub token_path: PathBuf,
    pub client_secrets_path: PathBuf,
    pub scopes: Vec<String>,
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for FormsApiConfig {
    fn default() -> Self {
        Self {
            token_path: PathBuf::from("token.json"),
            client_secrets_path: PathBuf::from("credentials.json"),
            scopes: vec![FORMS_BODY_SCOPE.to_string()],
            base_url: "https://forms.googleapis.com/v1".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Validate for FormsApiConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("forms.base_url", &self.base_url)?;
        validation::validate_path("forms.token_path", &self.token_path.to_string_lossy())?;
        validation::validate_path(
            "forms.client_secrets_path",
            &self.client_secrets_path.to_string_lossy(),
        )?;
        if self.scopes.is_empty() {
            return Err(OpsError::MissingConfigError {
                field: "forms.scopes".to_string(),
            });
        }
        validation::validate_positive_number("forms.timeout_seconds", self.timeout_seconds as usize, 1)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expiry: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// 與 token.json 相同的判斷：到期前 60 秒就視為過期
    fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry > now + chrono::Duration::seconds(EXPIRY_SKEW_SECONDS),
            None => true,
        }
    }
}

enum TokenSource {
    Static(String),
    OAuth(GoogleAuthenticator),
}

/// Google Forms REST API 客戶端
pub struct FormsApiClient {
    config: FormsApiConfig,
    http: Client,
    source: TokenSource,
    cached_token: Mutex<Option<CachedToken>>,
}

impl FormsApiClient {
    pub fn new(config: FormsApiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        let source = TokenSource::OAuth(GoogleAuthenticator::new(
            config.token_path.clone(),
            config.client_secrets_path.clone(),
            config.scopes.clone(),
            http.clone(),
        ));

        Ok(Self {
            config,
            http,
            source,
            cached_token: Mutex::new(None),
        })
    }

    /// 直接使用現成的 access token (例如 CI 或容器中由環境注入)
    pub fn with_access_token(config: FormsApiConfig, access_token: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            config,
            http,
            source: TokenSource::Static(access_token.into()),
            cached_token: Mutex::new(None),
        })
    }

    async fn bearer_token(&self) -> Result<String> {
        let mut cached = self.cached_token.lock().await;
        if let Some(entry) = cached.as_ref().filter(|entry| entry.is_fresh_at(Utc::now())) {
            return Ok(entry.token.clone());
        }

        let entry = match &self.source {
            TokenSource::Static(token) => CachedToken {
                token: token.clone(),
                expiry: None,
            },
            TokenSource::OAuth(authenticator) => {
                tracing::debug!("Fetching a fresh Google access token");
                let (token, expiry) = authenticator.access_token_with_expiry().await?;
                CachedToken { token, expiry }
            }
        };
        let token = entry.token.clone();
        *cached = Some(entry);
        Ok(token)
    }

    fn form_url(&self, form_id: &str, action: Option<&str>) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        match action {
            Some(action) => format!("{}/forms/{}:{}", base, form_id, action),
            None => format!("{}/forms/{}", base, form_id),
        }
    }

    async fn send_json(&self, request: RequestBuilder) -> Result<Value> {
        let token = self.bearer_token().await?;
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();
        tracing::debug!("Forms API response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Google 的錯誤格式：{"error": {"code": 403, "message": "...", "status": "..."}}
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(body);
            return Err(OpsError::GoogleApiError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl FormsApi for FormsApiClient {
    async fn create_form(&self, title: &str) -> Result<Value> {
        let url = format!("{}/forms", self.config.base_url.trim_end_matches('/'));
        tracing::debug!("Creating form '{}'", title);
        self.send_json(self.http.post(url).json(&json!({"info": {"title": title}})))
            .await
    }

    async fn batch_update(&self, form_id: &str, requests_body: &Value) -> Result<Value> {
        tracing::debug!("Applying batchUpdate to form {}", form_id);
        self.send_json(
            self.http
                .post(self.form_url(form_id, Some("batchUpdate")))
                .json(requests_body),
        )
        .await
    }

    async fn get_form(&self, form_id: &str) -> Result<Value> {
        self.send_json(self.http.get(self.form_url(form_id, None)))
            .await
    }

    async fn set_publish_settings(&self, form_id: &str, published: bool) -> Result<Value> {
        let body = json!({
            "publishSettings": {
                "publishState": {
                    "isPublished": published,
                    "isAcceptingResponses": published
                }
            }
        });
        self.send_json(
            self.http
                .post(self.form_url(form_id, Some("setPublishSettings")))
                .json(&body),
        )
        .await
    }
}

impl std::fmt::Display for FormsApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FormsApiClient(token={}, secrets={})",
            self.config.token_path.display(),
            self.config.client_secrets_path.display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client_for(server: &MockServer) -> FormsApiClient {
        let config = FormsApiConfig {
            base_url: server.url("/v1"),
            ..FormsApiConfig::default()
        };
        FormsApiClient::with_access_token(config, "test-token").unwrap()
    }

    #[tokio::test]
    async fn test_create_form_posts_title() {
        let server = MockServer::start();
        let create_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/forms")
                .header("authorization", "Bearer test-token")
                .json_body(json!({"info": {"title": "Odyssey-Attendance"}}));
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({
                    "formId": "form-123",
                    "responderUri": "https://docs.google.com/forms/d/e/form-123/viewform",
                    "info": {"title": "Odyssey-Attendance"}
                }));
        });

        let created = client_for(&server)
            .create_form("Odyssey-Attendance")
            .await
            .unwrap();

        create_mock.assert();
        assert_eq!(created["formId"], "form-123");
    }

    #[tokio::test]
    async fn test_batch_update_and_get_use_form_paths() {
        let server = MockServer::start();
        let batch_mock = server.mock(|when, then| {
            when.method(POST).path("/v1/forms/form-123:batchUpdate");
            then.status(200)
                .json_body(json!({"replies": [{}]}));
        });
        let get_mock = server.mock(|when, then| {
            when.method(GET).path("/v1/forms/form-123");
            then.status(200)
                .json_body(json!({"formId": "form-123", "items": []}));
        });

        let client = client_for(&server);
        client
            .batch_update("form-123", &json!({"requests": []}))
            .await
            .unwrap();
        let form = client.get_form("form-123").await.unwrap();

        batch_mock.assert();
        get_mock.assert();
        assert_eq!(form["formId"], "form-123");
    }

    #[tokio::test]
    async fn test_publish_settings_body() {
        let server = MockServer::start();
        let publish_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/forms/form-123:setPublishSettings")
                .json_body(json!({
                    "publishSettings": {
                        "publishState": {"isPublished": true, "isAcceptingResponses": true}
                    }
                }));
            then.status(200).json_body(json!({"formId": "form-123"}));
        });

        client_for(&server)
            .set_publish_settings("form-123", true)
            .await
            .unwrap();

        publish_mock.assert();
    }

    #[tokio::test]
    async fn test_api_error_carries_google_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/forms/missing");
            then.status(404).json_body(json!({
                "error": {"code": 404, "message": "Requested entity was not found.", "status": "NOT_FOUND"}
            }));
        });

        let err = client_for(&server).get_form("missing").await.unwrap_err();

        match err {
            OpsError::GoogleApiError { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Requested entity was not found.");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_cached_token_freshness() {
        let now = Utc::now();
        let entry = |expiry| CachedToken {
            token: "t".to_string(),
            expiry,
        };

        assert!(entry(None).is_fresh_at(now));
        assert!(entry(Some(now + chrono::Duration::hours(1))).is_fresh_at(now));
        assert!(!entry(Some(now + chrono::Duration::seconds(30))).is_fresh_at(now));
        assert!(!entry(Some(now - chrono::Duration::minutes(5))).is_fresh_at(now));
    }

    #[tokio::test]
    async fn test_expired_cached_token_is_replaced() {
        let dir = tempfile::TempDir::new().unwrap();
        let server = MockServer::start();
        let token_path = dir.path().join("token.json");
        std::fs::write(
            &token_path,
            json!({
                "token": "fresh-token",
                "refresh_token": "refresh",
                "client_id": "client",
                "client_secret": "secret",
                "token_uri": server.url("/token"),
                "scopes": [FORMS_BODY_SCOPE],
                "expiry": (Utc::now() + chrono::Duration::hours(1)).to_rfc3339(),
            })
            .to_string(),
        )
        .unwrap();
        let get_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/forms/form-123")
                .header("authorization", "Bearer fresh-token");
            then.status(200).json_body(json!({"formId": "form-123"}));
        });

        let client = FormsApiClient::new(FormsApiConfig {
            base_url: server.url("/v1"),
            token_path,
            ..FormsApiConfig::default()
        })
        .unwrap();
        // 一個小時前拿到、已經過期的 token
        *client.cached_token.lock().await = Some(CachedToken {
            token: "stale-token".to_string(),
            expiry: Some(Utc::now() - chrono::Duration::minutes(1)),
        });

        client.get_form("form-123").await.unwrap();

        get_mock.assert();
        assert_eq!(
            client.cached_token.lock().await.as_ref().map(|e| e.token.as_str()),
            Some("fresh-token")
        );
    }

    #[test]
    fn test_default_config_validates() {
        let config = FormsApiConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scopes, vec![FORMS_BODY_SCOPE.to_string()]);

        let config = FormsApiConfig {
            scopes: vec![],
            ..FormsApiConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
