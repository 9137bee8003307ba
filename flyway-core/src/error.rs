//! Error types for Flyway operations

use thiserror::Error;
use uuid::Uuid;

/// Entity type discriminator used in error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum EntityType {
    User,
    Bird,
    Species,
    Encounter,
    Conversation,
    Message,
    Relationship,
}

/// Record store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity_type:?} with id {id}")]
    NotFound { entity_type: EntityType, id: Uuid },

    #[error("Insert failed for {entity_type:?}: {reason}")]
    InsertFailed { entity_type: EntityType, reason: String },

    #[error("Update failed for {entity_type:?} with id {id}: {reason}")]
    UpdateFailed {
        entity_type: EntityType,
        id: Uuid,
        reason: String,
    },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Row codec error on {field}: {reason}")]
    Codec { field: String, reason: String },
}

/// Errors raised by the external generation service or the OAuth provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("No generation provider configured")]
    ProviderNotConfigured,

    #[error("Request to {provider} failed with status {status}: {message}")]
    RequestFailed {
        provider: String,
        status: i32,
        message: String,
    },

    #[error("Rate limited by {provider}, retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: i64,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Token refresh failed: {reason}")]
    TokenRefreshFailed { reason: String },
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Unknown species: {species_id}")]
    UnknownSpecies { species_id: String },

    #[error("Species {species_id} has no migration waypoints")]
    EmptyMigrationRoute { species_id: String },

    #[error("Conversation {conversation_id} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        conversation_id: Uuid,
        from: String,
        to: String,
    },
}

/// Conversation pipeline errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("Conversation {conversation_id} is {status}, expected pending")]
    NotRunnable { conversation_id: Uuid, status: String },

    #[error("Bird {bird_id} did not take part in conversation {conversation_id}")]
    NotParticipant { conversation_id: Uuid, bird_id: Uuid },

    #[error("Empty reply in conversation {conversation_id} at round {round}")]
    EmptyReply { conversation_id: Uuid, round: u32 },

    #[error("Conversation {conversation_id} could not be dispatched: queue closed")]
    QueueClosed { conversation_id: Uuid },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all Flyway errors.
#[derive(Debug, Clone, Error)]
pub enum FlywayError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Conversation error: {0}")]
    Conversation(#[from] ConversationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for Flyway operations.
pub type FlywayResult<T> = Result<T, FlywayError>;

// =============================================================================
// TESTS
// =============================================================================
