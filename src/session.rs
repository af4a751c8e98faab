//! Session management for the Lark Open Platform
//!
//! Provides:
//! - The `Session` seam the export pipeline is written against
//! - `LarkSession`, a reqwest client holding app credentials and a cached
//!   tenant access token that is refreshed before it expires

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{Config, Credentials};
use crate::error::{Error, Result};
use crate::models::{ConversationMetadata, ConversationSummary, Message, Page};

const TOKEN_PATH: &str = "/open-apis/auth/v3/tenant_access_token/internal";
const CHATS_PATH: &str = "/open-apis/im/v1/chats";
const CHATS_SEARCH_PATH: &str = "/open-apis/im/v1/chats/search";
const MESSAGES_PATH: &str = "/open-apis/im/v1/messages";
const USER_ID_TYPE: &str = "open_id";

/// Refresh the tenant token when less than this many seconds remain.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;

/// Authenticated access to the platform, as consumed by the exporter.
#[async_trait]
pub trait Session: Send + Sync {
    /// List accessible chats, or search them by name when `query` is set.
    async fn list_chats(
        &self,
        query: Option<&str>,
        page_token: &str,
        page_size: u32,
    ) -> Result<Page<ConversationSummary>>;

    /// Fetch the detail record of one chat.
    async fn get_chat(&self, chat_id: &str) -> Result<ConversationMetadata>;

    /// List one page of a chat's message history.
    async fn list_messages(
        &self,
        chat_id: &str,
        page_token: &str,
        page_size: u32,
    ) -> Result<Page<Message>>;

    /// Current tenant access token, for requests the session does not make itself.
    async fn access_token(&self) -> Result<String>;

    /// Turn an API path into an absolute URL.
    fn expand_url(&self, path: &str) -> String;
}

#[derive(Debug, Clone)]
struct TenantToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl TenantToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now > Duration::seconds(TOKEN_REFRESH_MARGIN_SECS)
    }
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    app_id: &'a str,
    app_secret: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    tenant_access_token: String,
    #[serde(default)]
    expire: i64,
}

/// Standard `{code, msg, data}` envelope of the Open Platform JSON API.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

/// reqwest-backed session for a custom app (tenant access token flow).
#[derive(Debug)]
pub struct LarkSession {
    http: Client,
    credentials: Credentials,
    base_url: String,
    token: Mutex<Option<TenantToken>>,
}

impl LarkSession {
    /// Create a session from configuration; fails on missing credentials.
    pub fn from_config(config: &Config) -> Result<Self> {
        let credentials = config.credentials()?;
        Self::new(credentials, &config.base_url)
    }

    /// Create a session with explicit credentials and API base url.
    pub fn new(credentials: Credentials, base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent(format!("lark_dumper/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            credentials,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: Mutex::new(None),
        })
    }

    fn cached_token(&self) -> Result<Option<String>> {
        let guard = self
            .token
            .lock()
            .map_err(|_| Error::Authentication("token cache is poisoned".to_string()))?;
        Ok(guard
            .as_ref()
            .filter(|t| t.is_fresh(Utc::now()))
            .map(|t| t.value.clone()))
    }

    async fn fetch_token(&self) -> Result<TenantToken> {
        let response = self
            .http
            .post(self.expand_url(TOKEN_PATH))
            .json(&TokenRequest {
                app_id: &self.credentials.app_id,
                app_secret: &self.credentials.app_secret,
            })
            .send()
            .await
            .map_err(|e| Error::Authentication(format!("token request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Authentication(format!("failed to read token response: {}", e)))?;

        if !status.is_success() {
            return Err(Error::Authentication(format!(
                "token endpoint returned HTTP {}: {}",
                status.as_u16(),
                text
            )));
        }

        let token: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| Error::Authentication(format!("invalid token response: {}", e)))?;

        if token.code != 0 || token.tenant_access_token.is_empty() {
            return Err(Error::Authentication(format!(
                "code {}: {}",
                token.code, token.msg
            )));
        }

        info!(expire = token.expire, "Obtained tenant access token");
        Ok(TenantToken {
            value: token.tenant_access_token,
            expires_at: Utc::now() + Duration::seconds(token.expire),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let token = self.access_token().await?;

        let response = self
            .http
            .get(self.expand_url(path))
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("GET {} failed: {}", path, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Transport(format!("failed to read {} response: {}", path, e)))?;

        if !status.is_success() {
            return Err(Error::Transport(format!(
                "GET {} returned HTTP {}: {}",
                path,
                status.as_u16(),
                text
            )));
        }

        let envelope: ApiEnvelope<T> = serde_json::from_str(&text)?;
        if envelope.code != 0 {
            return Err(Error::Api {
                code: envelope.code,
                msg: envelope.msg,
            });
        }

        envelope
            .data
            .ok_or_else(|| Error::Protocol(format!("GET {} returned no data", path)))
    }
}

#[async_trait]
impl Session for LarkSession {
    async fn list_chats(
        &self,
        query: Option<&str>,
        page_token: &str,
        page_size: u32,
    ) -> Result<Page<ConversationSummary>> {
        let mut params = vec![("user_id_type", USER_ID_TYPE.to_string())];
        let path = match query {
            Some(q) => {
                params.push(("query", q.to_string()));
                CHATS_SEARCH_PATH
            }
            None => CHATS_PATH,
        };
        params.push(("page_token", page_token.to_string()));
        params.push(("page_size", page_size.to_string()));

        debug!(path, page_token, "Fetching chat page");
        self.get_json(path, &params).await
    }

    async fn get_chat(&self, chat_id: &str) -> Result<ConversationMetadata> {
        let path = format!("{}/{}", CHATS_PATH, chat_id);
        self.get_json(&path, &[("user_id_type", USER_ID_TYPE.to_string())])
            .await
    }

    async fn list_messages(
        &self,
        chat_id: &str,
        page_token: &str,
        page_size: u32,
    ) -> Result<Page<Message>> {
        let params = [
            ("container_id_type", "chat".to_string()),
            ("container_id", chat_id.to_string()),
            ("page_token", page_token.to_string()),
            ("page_size", page_size.to_string()),
        ];

        debug!(chat_id, page_token, "Fetching message page");
        self.get_json(MESSAGES_PATH, &params).await
    }

    async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.cached_token()? {
            return Ok(token);
        }

        let fresh = self.fetch_token().await?;
        let value = fresh.value.clone();
        *self
            .token
            .lock()
            .map_err(|_| Error::Authentication("token cache is poisoned".to_string()))? =
            Some(fresh);
        Ok(value)
    }

    fn expand_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
