//! SecondMe provider
//!
//! Chat replies come back as a server-sent event stream; the client reads the
//! whole body and concatenates the `data:` frames, so callers see a plain
//! request/response call.

pub mod client;
pub mod types;

pub use client::SecondMeHttp;

use crate::{invalid_response, GenerationService, TokenGrant, TokenRefresher};
use async_trait::async_trait;
use client::PROVIDER;
use flyway_core::{FlywayError, FlywayResult, GenerationError};
use types::{ChatChunk, ChatRequest, RefreshForm, ShadesPayload, TokenData};

pub const DEFAULT_API_URL: &str = "https://app.mindos.com/gate/lab";

const CHAT_PATH: &str = "/api/secondme/chat/stream";
const SHADES_PATH: &str = "/api/secondme/user/shades";
const REFRESH_PATH: &str = "/api/oauth/token/refresh";

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Clone)]
pub struct SecondMeConfig {
    pub client_id: String,
    pub client_secret: String,
    pub api_url: String,
    pub requests_per_minute: u32,
}

impl Default for SecondMeConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            requests_per_minute: 60,
        }
    }
}

impl SecondMeConfig {
    /// Create SecondMeConfig from environment variables.
    ///
    /// Environment variables:
    /// - `SECONDME_CLIENT_ID`: OAuth client id (required for token refresh)
    /// - `SECONDME_CLIENT_SECRET`: OAuth client secret (required for token refresh)
    /// - `SECONDME_API_URL`: API base URL (default: https://app.mindos.com/gate/lab)
    /// - `SECONDME_REQUESTS_PER_MINUTE`: Outbound rate limit (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            client_id: std::env::var("SECONDME_CLIENT_ID").unwrap_or_default(),
            client_secret: std::env::var("SECONDME_CLIENT_SECRET").unwrap_or_default(),
            api_url: std::env::var("SECONDME_API_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.api_url),
            requests_per_minute: std::env::var("SECONDME_REQUESTS_PER_MINUTE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.requests_per_minute),
        }
    }

    /// Token refresh needs both OAuth client credentials.
    pub fn can_refresh(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

impl std::fmt::Debug for SecondMeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecondMeConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("api_url", &self.api_url)
            .field("requests_per_minute", &self.requests_per_minute)
            .finish()
    }
}

// ============================================================================
// CLIENT
// ============================================================================

/// SecondMe generation service and OAuth refresher.
#[derive(Debug)]
pub struct SecondMeClient {
    http: SecondMeHttp,
    config: SecondMeConfig,
}

impl SecondMeClient {
    pub fn new(config: SecondMeConfig) -> Self {
        Self {
            http: SecondMeHttp::new(config.api_url.clone(), config.requests_per_minute),
            config,
        }
    }

    pub fn from_env() -> Self {
        Self::new(SecondMeConfig::from_env())
    }

    pub fn config(&self) -> &SecondMeConfig {
        &self.config
    }
}

#[async_trait]
impl GenerationService for SecondMeClient {
    async fn send_message(&self, access_token: &str, prompt: &str) -> FlywayResult<String> {
        tracing::debug!(prompt_len = prompt.len(), "Sending chat message to SecondMe");
        let request = self
            .http
            .post(CHAT_PATH)
            .bearer_auth(access_token)
            .json(&ChatRequest { message: prompt });
        let response = self.http.send(request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| invalid_response(PROVIDER, format!("Failed to read stream: {}", e)))?;

        let reply = collect_stream(&body);
        if reply.trim().is_empty() {
            return Err(invalid_response(PROVIDER, "empty chat reply"));
        }
        Ok(reply.trim().to_string())
    }

    async fn interest_tags(&self, access_token: &str) -> FlywayResult<Vec<String>> {
        let request = self.http.get(SHADES_PATH).bearer_auth(access_token);
        let payload: ShadesPayload = self.http.send_json(request).await?;
        Ok(payload.into_names())
    }
}

#[async_trait]
impl TokenRefresher for SecondMeClient {
    async fn refresh(&self, refresh_token: &str) -> FlywayResult<TokenGrant> {
        if !self.config.can_refresh() {
            return Err(FlywayError::Generation(GenerationError::ProviderNotConfigured));
        }
        let form = RefreshForm {
            grant_type: "refresh_token",
            client_id: &self.config.client_id,
            client_secret: &self.config.client_secret,
            refresh_token,
        };
        let request = self.http.post(REFRESH_PATH).form(&form);
        let data: TokenData = self.http.send_json(request).await.map_err(|e| {
            FlywayError::Generation(GenerationError::TokenRefreshFailed {
                reason: e.to_string(),
            })
        })?;
        Ok(TokenGrant {
            access_token: data.access_token,
            refresh_token: data.refresh_token,
            expires_in: data.expires_in,
        })
    }
}

/// Concatenate the text carried by a server-sent event body.
///
/// Frames are `data: <json>` lines; `[DONE]` ends the stream. A frame that
/// is not JSON is taken as literal text.
pub fn collect_stream(body: &str) -> String {
    let mut out = String::new();
    for line in body.lines() {
        let Some(payload) = line.trim_start().strip_prefix("data:") else {
            continue;
        };
        let payload = payload.trim();
        if payload.is_empty() || payload == "[DONE]" {
            continue;
        }
        match serde_json::from_str::<ChatChunk>(payload) {
            Ok(chunk) => {
                if let Some(text) = chunk.content {
                    out.push_str(&text);
                }
                for choice in chunk.choices {
                    if let Some(text) = choice.delta.content {
                        out.push_str(&text);
                    }
                }
            }
            Err(_) => out.push_str(payload),
        }
    }
    out
}
