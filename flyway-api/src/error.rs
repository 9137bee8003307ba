//! Error Types for the Flyway API
//!
//! This module defines error handling for the API layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//!
//! All errors are serialized as JSON with appropriate HTTP status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use flyway_core::{
    ConversationError, EntityType, FlywayError, GenerationError, StorageError, ValidationError,
};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Caller Errors (401, 403)
    // ========================================================================
    /// Caller identity or shared secret missing or wrong
    Unauthorized,

    /// Caller is known but may not read the resource
    Forbidden,

    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    ValidationFailed,
    InvalidInput,
    MissingField,
    InvalidFormat,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    EntityNotFound,
    UserNotFound,
    BirdNotFound,
    ConversationNotFound,

    // ========================================================================
    // Conflict Errors (409)
    // ========================================================================
    StateConflict,

    // ========================================================================
    // Server Errors (500, 502, 503)
    // ========================================================================
    InternalError,
    StorageError,
    /// The generation service failed or answered badly
    UpstreamError,
    ServiceUnavailable,
    TooManyRequests,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,

            ErrorCode::ValidationFailed
            | ErrorCode::InvalidInput
            | ErrorCode::MissingField
            | ErrorCode::InvalidFormat => StatusCode::BAD_REQUEST,

            ErrorCode::EntityNotFound
            | ErrorCode::UserNotFound
            | ErrorCode::BirdNotFound
            | ErrorCode::ConversationNotFound => StatusCode::NOT_FOUND,

            ErrorCode::StateConflict => StatusCode::CONFLICT,

            ErrorCode::UpstreamError => StatusCode::BAD_GATEWAY,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,

            ErrorCode::InternalError | ErrorCode::StorageError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response returned by every endpoint on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create a MissingField error.
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Required field '{}' is missing", field),
        )
    }

    /// Create an InvalidFormat error.
    pub fn invalid_format(field: &str, expected: &str) -> Self {
        Self::new(
            ErrorCode::InvalidFormat,
            format!("Field '{}' has invalid format, expected {}", field, expected),
        )
    }

    /// Create a not found error for the given entity type.
    pub fn entity_not_found(entity_type: EntityType, id: impl fmt::Display) -> Self {
        let code = match entity_type {
            EntityType::User => ErrorCode::UserNotFound,
            EntityType::Bird => ErrorCode::BirdNotFound,
            EntityType::Conversation => ErrorCode::ConversationNotFound,
            _ => ErrorCode::EntityNotFound,
        };
        Self::new(code, format!("{:?} with id {} not found", entity_type, id))
    }

    /// The caller has no bird yet.
    pub fn bird_not_found_for_user(user_id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::BirdNotFound,
            format!("User {} has no bird", user_id),
        )
    }

    pub fn state_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StateConflict, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn storage_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageError, message)
    }

    pub fn upstream_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UpstreamError, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Create a TooManyRequests error.
    pub fn too_many_requests(retry_after_ms: Option<i64>) -> Self {
        let message = match retry_after_ms {
            Some(ms) => format!("Rate limit exceeded. Retry after {} ms", ms),
            None => "Rate limit exceeded".to_string(),
        };
        Self::new(ErrorCode::TooManyRequests, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

/// Lets handlers return `Result<_, ApiError>` directly.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM DOMAIN ERRORS
// ============================================================================

impl From<FlywayError> for ApiError {
    fn from(err: FlywayError) -> Self {
        match err {
            FlywayError::Storage(StorageError::NotFound { entity_type, id }) => {
                ApiError::entity_not_found(entity_type, id)
            }
            FlywayError::Storage(e) => {
                tracing::error!(error = %e, "Storage error");
                ApiError::storage_error("Storage operation failed")
            }
            FlywayError::Validation(ValidationError::UnknownSpecies { species_id }) => {
                ApiError::invalid_input(format!("Unknown species: {}", species_id))
                    .with_details(serde_json::json!({ "species_id": species_id }))
            }
            FlywayError::Validation(e) => ApiError::validation_failed(e.to_string()),
            FlywayError::Conversation(ConversationError::NotParticipant { .. }) => {
                ApiError::forbidden("Only the birds of this encounter may read the conversation")
            }
            FlywayError::Conversation(e @ ConversationError::NotRunnable { .. }) => {
                ApiError::state_conflict(e.to_string())
            }
            FlywayError::Conversation(e) => ApiError::internal_error(e.to_string()),
            FlywayError::Generation(GenerationError::RateLimited { retry_after_ms, .. }) => {
                ApiError::too_many_requests(Some(retry_after_ms))
            }
            FlywayError::Generation(GenerationError::ProviderNotConfigured) => {
                ApiError::service_unavailable("No generation provider configured")
            }
            FlywayError::Generation(e) => {
                tracing::warn!(error = %e, "Generation service error");
                ApiError::upstream_error(e.to_string())
            }
            FlywayError::Config(e) => {
                tracing::error!(error = %e, "Configuration error");
                ApiError::internal_error(e.to_string())
            }
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::invalid_input(format!("JSON error: {}", err))
    }
}

impl From<uuid::Error> for ApiError {
    fn from(err: uuid::Error) -> Self {
        ApiError::invalid_format("id", &format!("UUID ({})", err))
    }
}

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::InvalidInput.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::BirdNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::StateConflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::UpstreamError.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ErrorCode::StorageError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_participant_is_forbidden() {
        let err: ApiError = FlywayError::from(ConversationError::NotParticipant {
            conversation_id: Uuid::nil(),
            bird_id: Uuid::nil(),
        })
        .into();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_not_found_keeps_entity_kind() {
        let err: ApiError = FlywayError::from(StorageError::NotFound {
            entity_type: EntityType::Conversation,
            id: Uuid::nil(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::ConversationNotFound);
        assert!(err.message.contains("00000000-0000-0000-0000-000000000000"));
    }

    #[test]
    fn test_unknown_species_is_bad_request() {
        let err: ApiError = FlywayError::from(ValidationError::UnknownSpecies {
            species_id: "dodo".to_string(),
        })
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.details,
            Some(serde_json::json!({ "species_id": "dodo" }))
        );
    }

    #[test]
    fn test_storage_details_are_not_leaked() {
        let err: ApiError = FlywayError::from(StorageError::TransactionFailed {
            reason: "table lock held by sweep".to_string(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::StorageError);
        assert!(!err.message.contains("sweep"));
    }

    #[test]
    fn test_error_serialization() -> Result<(), serde_json::Error> {
        let err = ApiError::missing_field("species_id");
        let json = serde_json::to_string(&err)?;
        assert!(json.contains("MISSING_FIELD"));
        assert!(json.contains("species_id"));
        assert!(!json.contains("details"));
        Ok(())
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::forbidden("nope");
        assert_eq!(format!("{}", err), "Forbidden: nope");
    }
}
