//! Async record store trait.
//!
//! Every component that touches persistent state goes through this trait.
//! Implementations must make `encounter_create_with_conversation` atomic; the
//! remaining operations are single-record reads and writes.

use ::async_trait::async_trait;
use flyway_core::{
    Bird, BirdId, Conversation, ConversationId, ConversationStatus, Encounter, EncounterId,
    FlywayResult, Location, Message, Relationship, Species, Timestamp, User, UserId,
};
use serde::Serialize;

/// Row counts removed by an admin reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResetSummary {
    pub messages: usize,
    pub conversations: usize,
    pub encounters: usize,
    pub relationships: usize,
    pub birds: usize,
}

/// Row counts removed when a bird's social history is cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadeSummary {
    pub encounters: usize,
    pub conversations: usize,
    pub messages: usize,
    pub relationships: usize,
}

/// Store statistics for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStatistics {
    pub user_count: usize,
    pub bird_count: usize,
    pub encounter_count: usize,
    pub conversation_count: usize,
    pub message_count: usize,
    pub relationship_count: usize,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    // ========================================================================
    // USER OPERATIONS
    // ========================================================================

    async fn user_insert(&self, user: &User) -> FlywayResult<()>;

    async fn user_get(&self, id: UserId) -> FlywayResult<Option<User>>;

    /// Replace the stored OAuth credentials for a user.
    async fn user_update_tokens(
        &self,
        id: UserId,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: Timestamp,
    ) -> FlywayResult<()>;

    // ========================================================================
    // BIRD OPERATIONS
    // ========================================================================

    /// Insert a bird. Fails if the owner already has one.
    async fn bird_insert(&self, bird: &Bird) -> FlywayResult<()>;

    async fn bird_get(&self, id: BirdId) -> FlywayResult<Option<Bird>>;

    async fn bird_get_by_user(&self, user_id: UserId) -> FlywayResult<Option<Bird>>;

    /// All birds, oldest first.
    async fn bird_list(&self) -> FlywayResult<Vec<Bird>>;

    /// Overwrite species, name, traits, preferences and location.
    async fn bird_update(&self, bird: &Bird) -> FlywayResult<()>;

    async fn bird_update_location(&self, id: BirdId, location: &Location) -> FlywayResult<()>;

    // ========================================================================
    // SPECIES OPERATIONS
    // ========================================================================

    async fn species_upsert(&self, species: &Species) -> FlywayResult<()>;

    async fn species_get(&self, id: &str) -> FlywayResult<Option<Species>>;

    // ========================================================================
    // ENCOUNTER OPERATIONS
    // ========================================================================

    /// Insert an encounter and its conversation in one step. Either both
    /// rows exist afterwards or neither does.
    async fn encounter_create_with_conversation(
        &self,
        encounter: &Encounter,
        conversation: &Conversation,
    ) -> FlywayResult<()>;

    async fn encounter_get(&self, id: EncounterId) -> FlywayResult<Option<Encounter>>;

    /// Most recent encounter between `a` and `b` (either order) at or after `since`.
    async fn encounter_find_recent_between(
        &self,
        a: BirdId,
        b: BirdId,
        since: Timestamp,
    ) -> FlywayResult<Option<Encounter>>;

    async fn encounter_set_story(&self, id: EncounterId, story: &str) -> FlywayResult<()>;

    /// Encounters involving `bird_id` on either side, newest first.
    async fn encounter_list_for_bird(
        &self,
        bird_id: BirdId,
        limit: usize,
    ) -> FlywayResult<Vec<Encounter>>;

    // ========================================================================
    // CONVERSATION OPERATIONS
    // ========================================================================

    async fn conversation_get(&self, id: ConversationId) -> FlywayResult<Option<Conversation>>;

    async fn conversation_get_by_encounter(
        &self,
        encounter_id: EncounterId,
    ) -> FlywayResult<Option<Conversation>>;

    /// Apply a status transition. Illegal transitions are rejected and
    /// leave the row unchanged.
    async fn conversation_update_status(
        &self,
        id: ConversationId,
        status: ConversationStatus,
    ) -> FlywayResult<Conversation>;

    // ========================================================================
    // MESSAGE OPERATIONS
    // ========================================================================

    async fn message_insert(&self, message: &Message) -> FlywayResult<()>;

    /// Messages of a conversation ordered by round.
    async fn message_list(&self, conversation_id: ConversationId) -> FlywayResult<Vec<Message>>;

    // ========================================================================
    // RELATIONSHIP OPERATIONS
    // ========================================================================

    /// The directed edge `bird_id -> related_bird_id`, if any.
    async fn relationship_get(
        &self,
        bird_id: BirdId,
        related_bird_id: BirdId,
    ) -> FlywayResult<Option<Relationship>>;

    /// Insert or replace the edge keyed by `(bird_id, related_bird_id)`.
    async fn relationship_upsert(&self, relationship: &Relationship) -> FlywayResult<()>;

    /// Delete both directed edges between `a` and `b`.
    async fn relationship_delete_between(&self, a: BirdId, b: BirdId) -> FlywayResult<usize>;

    // ========================================================================
    // CASCADES
    // ========================================================================

    /// Remove every encounter (with conversation and messages) and every
    /// relationship edge that involves `bird_id`. The bird itself stays.
    async fn clear_social_history(&self, bird_id: BirdId) -> FlywayResult<CascadeSummary>;

    /// Remove all birds and everything that hangs off them. Users and
    /// species are kept.
    async fn reset_birds(&self) -> FlywayResult<ResetSummary>;

    async fn statistics(&self) -> FlywayResult<StoreStatistics>;
}
