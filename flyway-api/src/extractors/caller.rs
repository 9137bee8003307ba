//! Caller identity taken from the `X-User-Id` header.
//!
//! The session layer in front of the API resolves the login cookie and
//! forwards the user id; handlers only ever see the parsed id.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use flyway_core::UserId;
use uuid::Uuid;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user making the request.
///
/// ```rust,ignore
/// async fn my_bird(Caller(user_id): Caller) -> ApiResult<Json<Bird>> { ... }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::unauthorized("Missing X-User-Id header"))?
            .to_str()
            .map_err(|_| ApiError::invalid_format("X-User-Id", "ASCII UUID"))?;
        let user_id = Uuid::parse_str(raw.trim())
            .map_err(|_| ApiError::invalid_format("X-User-Id", "UUID"))?;
        Ok(Caller(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    async fn extract(header: Option<&str>) -> Result<Caller, ApiError> {
        let mut builder = Request::builder().uri("/api/bird");
        if let Some(value) = header {
            builder = builder.header(USER_ID_HEADER, value);
        }
        let request = builder.body(()).map_err(|e| ApiError::internal_error(e.to_string()))?;
        let (mut parts, _) = request.into_parts();
        Caller::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_parses_uuid() -> Result<(), ApiError> {
        let id = Uuid::now_v7();
        let Caller(parsed) = extract(Some(&id.to_string())).await?;
        assert_eq!(parsed, id);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        let err = extract(None).await.err();
        assert_eq!(err.map(|e| e.status_code()), Some(StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn test_garbage_header_is_bad_request() {
        let err = extract(Some("not-a-uuid")).await.err();
        assert_eq!(err.map(|e| e.status_code()), Some(StatusCode::BAD_REQUEST));
    }
}
