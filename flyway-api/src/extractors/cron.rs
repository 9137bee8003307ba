//! Shared-secret guard for the cron and admin endpoints.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::error::ApiError;
use crate::state::AppState;

/// Proof that the request carried `Authorization: Bearer <FLYWAY_CRON_SECRET>`,
/// or that no secret is configured.
#[derive(Debug, Clone, Copy)]
pub struct CronAuthorized;

#[async_trait]
impl FromRequestParts<AppState> for CronAuthorized {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        if state.api_config.cron_authorized(header) {
            Ok(CronAuthorized)
        } else {
            tracing::warn!(path = %parts.uri.path(), "Rejected cron request with bad secret");
            Err(ApiError::unauthorized("Invalid cron secret"))
        }
    }
}
