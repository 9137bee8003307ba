//! Access-token lookup with refresh-before-expiry.

use chrono::{Duration, Utc};
use flyway_core::{EntityType, FlywayError, FlywayResult, StorageError, UserId};
use flyway_llm::TokenRefresher;
use flyway_storage::RecordStore;
use std::sync::Arc;

/// Hands out access tokens for bird owners.
///
/// A token that expires within `leeway` is refreshed first. A failed refresh
/// is not an error: the stored token is returned as-is and the caller finds
/// out on its next generation call. Two concurrent refreshes for the same
/// user both write; the last writer wins.
#[derive(Clone)]
pub struct CredentialManager {
    store: Arc<dyn RecordStore>,
    refresher: Arc<dyn TokenRefresher>,
    leeway: Duration,
}

impl CredentialManager {
    pub fn new(
        store: Arc<dyn RecordStore>,
        refresher: Arc<dyn TokenRefresher>,
        leeway: Duration,
    ) -> Self {
        Self {
            store,
            refresher,
            leeway,
        }
    }

    pub async fn get_valid_access_token(&self, user_id: UserId) -> FlywayResult<String> {
        let user = self.store.user_get(user_id).await?.ok_or(FlywayError::Storage(
            StorageError::NotFound {
                entity_type: EntityType::User,
                id: user_id,
            },
        ))?;

        if user.token_expires_at - Utc::now() > self.leeway {
            return Ok(user.access_token);
        }

        let Some(refresh_token) = user.refresh_token.as_deref() else {
            tracing::warn!(%user_id, "Access token near expiry and no refresh token stored");
            return Ok(user.access_token);
        };

        match self.refresher.refresh(refresh_token).await {
            Ok(grant) => {
                self.store
                    .user_update_tokens(
                        user_id,
                        &grant.access_token,
                        grant.refresh_token.as_deref(),
                        grant.expires_from_now(),
                    )
                    .await?;
                tracing::debug!(%user_id, "Refreshed access token");
                Ok(grant.access_token)
            }
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "Token refresh failed, using stored token");
                Ok(user.access_token)
            }
        }
    }
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager")
            .field("leeway", &self.leeway)
            .finish()
    }
}
