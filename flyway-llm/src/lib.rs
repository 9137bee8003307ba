//! Flyway LLM - Generation Service Boundary
//!
//! Provider-agnostic traits for the two things the pipeline asks of the
//! outside world: generated text plus interest tags on behalf of a user, and
//! OAuth token refresh. The SecondMe client implements both.

pub mod secondme;

pub use secondme::{SecondMeClient, SecondMeConfig};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use flyway_core::{FlywayError, FlywayResult, GenerationError, Timestamp};

// ============================================================================
// GENERATION SERVICE TRAIT
// ============================================================================

/// Text generation and profile lookups made with a user's access token.
///
/// Both calls are non-streaming from the caller's point of view.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Send a prompt and return the full reply text.
    async fn send_message(&self, access_token: &str, prompt: &str) -> FlywayResult<String>;

    /// Interest tags of the token's owner.
    async fn interest_tags(&self, access_token: &str) -> FlywayResult<Vec<String>>;
}

// ============================================================================
// TOKEN REFRESH TRAIT
// ============================================================================

/// Fresh credentials returned by the OAuth provider.
#[derive(Clone, PartialEq)]
pub struct TokenGrant {
    pub access_token: String,
    /// Absent when the provider keeps the old refresh token valid
    pub refresh_token: Option<String>,
    /// Lifetime in seconds
    pub expires_in: i64,
}

impl TokenGrant {
    /// Absolute expiry, measured from `issued_at`.
    pub fn expires_at(&self, issued_at: Timestamp) -> Timestamp {
        issued_at + Duration::seconds(self.expires_in)
    }

    pub fn expires_from_now(&self) -> Timestamp {
        self.expires_at(Utc::now())
    }
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Exchanges a refresh token for a new access token.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> FlywayResult<TokenGrant>;
}

// ============================================================================
// ERROR HELPERS
// ============================================================================

pub(crate) fn request_failed(provider: &str, status: i32, message: impl Into<String>) -> FlywayError {
    FlywayError::Generation(GenerationError::RequestFailed {
        provider: provider.to_string(),
        status,
        message: message.into(),
    })
}

pub(crate) fn rate_limited(provider: &str, retry_after_ms: i64) -> FlywayError {
    FlywayError::Generation(GenerationError::RateLimited {
        provider: provider.to_string(),
        retry_after_ms,
    })
}

pub(crate) fn invalid_response(provider: &str, reason: impl Into<String>) -> FlywayError {
    FlywayError::Generation(GenerationError::InvalidResponse {
        provider: provider.to_string(),
        reason: reason.into(),
    })
}
