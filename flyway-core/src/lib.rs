//! Flyway Core - Entity Types
//!
//! Pure data structures shared by every other crate: birds, species,
//! encounters, conversations, messages and relationships, plus the static
//! migration reference data and the month-based location lookup.

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod config;
pub mod entities;
pub mod error;
pub mod geo;
pub mod species;

pub use config::{FlywayConfig, RelationshipDeltaConfig};
pub use entities::{
    Bird, Conversation, ConversationStatus, Encounter, Location, Message, Relationship,
    RelationshipType, Species, User, Waypoint,
};
pub use error::{
    ConfigError, ConversationError, EntityType, FlywayError, FlywayResult, GenerationError, StorageError,
    ValidationError,
};
pub use geo::{current_month, distance, locate};
pub use species::{all_species, find_species, species_by_name};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Entity identifier using UUIDv7 for timestamp-sortable IDs.
pub type EntityId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

pub type UserId = EntityId;
pub type BirdId = EntityId;
pub type EncounterId = EntityId;
pub type ConversationId = EntityId;
pub type MessageId = EntityId;
pub type RelationshipId = EntityId;

/// Generate a new UUIDv7 EntityId (timestamp-sortable).
pub fn new_entity_id() -> EntityId {
    Uuid::now_v7()
}

/// Order a pair of bird ids so that `(a, b)` and `(b, a)` share one key.
pub fn unordered_pair(a: BirdId, b: BirdId) -> (BirdId, BirdId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unordered_pair_is_symmetric() {
        let a = new_entity_id();
        let b = new_entity_id();
        assert_eq!(unordered_pair(a, b), unordered_pair(b, a));
    }

    #[test]
    fn test_unordered_pair_puts_smaller_first() {
        let a = new_entity_id();
        let b = new_entity_id();
        let (lo, hi) = unordered_pair(a, b);
        assert!(lo <= hi);
    }
}
