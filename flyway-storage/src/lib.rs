//! Flyway Storage - Record Store Trait and In-Memory Implementation
//!
//! Defines the persistence boundary for Flyway entities. The in-memory store
//! keeps all tables behind a single lock so that multi-row writes (encounter
//! plus conversation, cascades, resets) are atomic.

pub mod codec;
pub mod record_store;

pub use codec::BirdRow;
pub use record_store::{CascadeSummary, RecordStore, ResetSummary, StoreStatistics};

use ::async_trait::async_trait;
use flyway_core::{
    Bird, BirdId, Conversation, ConversationId, ConversationStatus, Encounter, EncounterId,
    EntityType, FlywayError, FlywayResult, Location, Message, MessageId, Relationship, Species,
    StorageError, Timestamp, User, UserId,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    birds: HashMap<BirdId, BirdRow>,
    species: HashMap<String, Species>,
    encounters: HashMap<EncounterId, Encounter>,
    conversations: HashMap<ConversationId, Conversation>,
    messages: HashMap<MessageId, Message>,
    relationships: HashMap<(BirdId, BirdId), Relationship>,
}

impl Tables {
    /// Drop the given encounters together with their conversations and messages.
    fn remove_encounters(&mut self, ids: &[EncounterId], summary: &mut CascadeSummary) {
        for id in ids {
            if self.encounters.remove(id).is_some() {
                summary.encounters += 1;
            }
        }
        let conversation_ids: Vec<ConversationId> = self
            .conversations
            .values()
            .filter(|c| ids.contains(&c.encounter_id))
            .map(|c| c.conversation_id)
            .collect();
        for id in &conversation_ids {
            self.conversations.remove(id);
            summary.conversations += 1;
        }
        let before = self.messages.len();
        self.messages
            .retain(|_, m| !conversation_ids.contains(&m.conversation_id));
        summary.messages += before - self.messages.len();
    }
}

/// In-memory record store for tests and single-process deployments.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> FlywayResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| FlywayError::Storage(StorageError::LockPoisoned))
    }

    fn write(&self) -> FlywayResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| FlywayError::Storage(StorageError::LockPoisoned))
    }

    /// Raw stored row for a bird, as it sits at rest.
    pub fn bird_row(&self, id: BirdId) -> FlywayResult<Option<BirdRow>> {
        Ok(self.read()?.birds.get(&id).cloned())
    }
}

fn not_found(entity_type: EntityType, id: uuid::Uuid) -> FlywayError {
    FlywayError::Storage(StorageError::NotFound { entity_type, id })
}

fn insert_failed(entity_type: EntityType, reason: &str) -> FlywayError {
    FlywayError::Storage(StorageError::InsertFailed {
        entity_type,
        reason: reason.to_string(),
    })
}

#[async_trait]
impl RecordStore for InMemoryStore {
    // === User Operations ===

    async fn user_insert(&self, user: &User) -> FlywayResult<()> {
        let mut tables = self.write()?;
        if tables.users.contains_key(&user.user_id) {
            return Err(insert_failed(EntityType::User, "already exists"));
        }
        tables.users.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn user_get(&self, id: UserId) -> FlywayResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn user_update_tokens(
        &self,
        id: UserId,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: Timestamp,
    ) -> FlywayResult<()> {
        let mut tables = self.write()?;
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| not_found(EntityType::User, id))?;
        user.access_token = access_token.to_string();
        if let Some(refresh) = refresh_token {
            user.refresh_token = Some(refresh.to_string());
        }
        user.token_expires_at = expires_at;
        Ok(())
    }

    // === Bird Operations ===

    async fn bird_insert(&self, bird: &Bird) -> FlywayResult<()> {
        let mut tables = self.write()?;
        if tables.birds.contains_key(&bird.bird_id) {
            return Err(insert_failed(EntityType::Bird, "already exists"));
        }
        if tables.birds.values().any(|b| b.user_id == bird.user_id) {
            return Err(insert_failed(EntityType::Bird, "user already has a bird"));
        }
        tables.birds.insert(bird.bird_id, BirdRow::from(bird));
        Ok(())
    }

    async fn bird_get(&self, id: BirdId) -> FlywayResult<Option<Bird>> {
        Ok(self.read()?.birds.get(&id).map(Bird::from))
    }

    async fn bird_get_by_user(&self, user_id: UserId) -> FlywayResult<Option<Bird>> {
        Ok(self
            .read()?
            .birds
            .values()
            .find(|b| b.user_id == user_id)
            .map(Bird::from))
    }

    async fn bird_list(&self) -> FlywayResult<Vec<Bird>> {
        let tables = self.read()?;
        let mut birds: Vec<Bird> = tables.birds.values().map(Bird::from).collect();
        birds.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.bird_id.cmp(&b.bird_id))
        });
        Ok(birds)
    }

    async fn bird_update(&self, bird: &Bird) -> FlywayResult<()> {
        let mut tables = self.write()?;
        let row = tables
            .birds
            .get_mut(&bird.bird_id)
            .ok_or_else(|| not_found(EntityType::Bird, bird.bird_id))?;
        let created_at = row.created_at;
        *row = BirdRow::from(bird);
        row.created_at = created_at;
        row.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn bird_update_location(&self, id: BirdId, location: &Location) -> FlywayResult<()> {
        let mut tables = self.write()?;
        let row = tables
            .birds
            .get_mut(&id)
            .ok_or_else(|| not_found(EntityType::Bird, id))?;
        row.current_lat = location.lat;
        row.current_lng = location.lng;
        row.current_location = location.place.clone();
        row.updated_at = chrono::Utc::now();
        Ok(())
    }

    // === Species Operations ===

    async fn species_upsert(&self, species: &Species) -> FlywayResult<()> {
        self.write()?
            .species
            .insert(species.id.clone(), species.clone());
        Ok(())
    }

    async fn species_get(&self, id: &str) -> FlywayResult<Option<Species>> {
        Ok(self.read()?.species.get(id).cloned())
    }

    // === Encounter Operations ===

    async fn encounter_create_with_conversation(
        &self,
        encounter: &Encounter,
        conversation: &Conversation,
    ) -> FlywayResult<()> {
        let mut tables = self.write()?;
        if conversation.encounter_id != encounter.encounter_id {
            return Err(FlywayError::Storage(StorageError::TransactionFailed {
                reason: "conversation does not belong to encounter".to_string(),
            }));
        }
        if tables.encounters.contains_key(&encounter.encounter_id) {
            return Err(insert_failed(EntityType::Encounter, "already exists"));
        }
        if tables
            .conversations
            .contains_key(&conversation.conversation_id)
        {
            return Err(insert_failed(EntityType::Conversation, "already exists"));
        }
        for bird_id in [encounter.bird_id, encounter.met_bird_id] {
            if !tables.birds.contains_key(&bird_id) {
                return Err(not_found(EntityType::Bird, bird_id));
            }
        }
        tables
            .encounters
            .insert(encounter.encounter_id, encounter.clone());
        tables
            .conversations
            .insert(conversation.conversation_id, conversation.clone());
        Ok(())
    }

    async fn encounter_get(&self, id: EncounterId) -> FlywayResult<Option<Encounter>> {
        Ok(self.read()?.encounters.get(&id).cloned())
    }

    async fn encounter_find_recent_between(
        &self,
        a: BirdId,
        b: BirdId,
        since: Timestamp,
    ) -> FlywayResult<Option<Encounter>> {
        Ok(self
            .read()?
            .encounters
            .values()
            .filter(|e| e.is_between(a, b) && e.encountered_at >= since)
            .max_by_key(|e| e.encountered_at)
            .cloned())
    }

    async fn encounter_set_story(&self, id: EncounterId, story: &str) -> FlywayResult<()> {
        let mut tables = self.write()?;
        let encounter = tables
            .encounters
            .get_mut(&id)
            .ok_or_else(|| not_found(EntityType::Encounter, id))?;
        encounter.story = Some(story.to_string());
        Ok(())
    }

    async fn encounter_list_for_bird(
        &self,
        bird_id: BirdId,
        limit: usize,
    ) -> FlywayResult<Vec<Encounter>> {
        let tables = self.read()?;
        let mut encounters: Vec<Encounter> = tables
            .encounters
            .values()
            .filter(|e| e.involves(bird_id))
            .cloned()
            .collect();
        encounters.sort_by(|a, b| {
            b.encountered_at
                .cmp(&a.encountered_at)
                .then_with(|| b.encounter_id.cmp(&a.encounter_id))
        });
        encounters.truncate(limit);
        Ok(encounters)
    }

    // === Conversation Operations ===

    async fn conversation_get(&self, id: ConversationId) -> FlywayResult<Option<Conversation>> {
        Ok(self.read()?.conversations.get(&id).cloned())
    }

    async fn conversation_get_by_encounter(
        &self,
        encounter_id: EncounterId,
    ) -> FlywayResult<Option<Conversation>> {
        Ok(self
            .read()?
            .conversations
            .values()
            .find(|c| c.encounter_id == encounter_id)
            .cloned())
    }

    async fn conversation_update_status(
        &self,
        id: ConversationId,
        status: ConversationStatus,
    ) -> FlywayResult<Conversation> {
        let mut tables = self.write()?;
        let conversation = tables
            .conversations
            .get_mut(&id)
            .ok_or_else(|| not_found(EntityType::Conversation, id))?;
        conversation.transition(status)?;
        Ok(conversation.clone())
    }

    // === Message Operations ===

    async fn message_insert(&self, message: &Message) -> FlywayResult<()> {
        let mut tables = self.write()?;
        if !tables.conversations.contains_key(&message.conversation_id) {
            return Err(not_found(EntityType::Conversation, message.conversation_id));
        }
        if tables.messages.contains_key(&message.message_id) {
            return Err(insert_failed(EntityType::Message, "already exists"));
        }
        tables.messages.insert(message.message_id, message.clone());
        Ok(())
    }

    async fn message_list(&self, conversation_id: ConversationId) -> FlywayResult<Vec<Message>> {
        let tables = self.read()?;
        let mut messages: Vec<Message> = tables
            .messages
            .values()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.round);
        Ok(messages)
    }

    // === Relationship Operations ===

    async fn relationship_get(
        &self,
        bird_id: BirdId,
        related_bird_id: BirdId,
    ) -> FlywayResult<Option<Relationship>> {
        Ok(self
            .read()?
            .relationships
            .get(&(bird_id, related_bird_id))
            .cloned())
    }

    async fn relationship_upsert(&self, relationship: &Relationship) -> FlywayResult<()> {
        self.write()?.relationships.insert(
            (relationship.bird_id, relationship.related_bird_id),
            relationship.clone(),
        );
        Ok(())
    }

    async fn relationship_delete_between(&self, a: BirdId, b: BirdId) -> FlywayResult<usize> {
        let mut tables = self.write()?;
        let removed = [(a, b), (b, a)]
            .iter()
            .filter(|key| tables.relationships.remove(*key).is_some())
            .count();
        Ok(removed)
    }

    // === Cascades ===

    async fn clear_social_history(&self, bird_id: BirdId) -> FlywayResult<CascadeSummary> {
        let mut tables = self.write()?;
        let mut summary = CascadeSummary::default();

        let encounter_ids: Vec<EncounterId> = tables
            .encounters
            .values()
            .filter(|e| e.involves(bird_id))
            .map(|e| e.encounter_id)
            .collect();
        tables.remove_encounters(&encounter_ids, &mut summary);

        let before = tables.relationships.len();
        tables
            .relationships
            .retain(|(from, to), _| *from != bird_id && *to != bird_id);
        summary.relationships = before - tables.relationships.len();

        Ok(summary)
    }

    async fn reset_birds(&self) -> FlywayResult<ResetSummary> {
        let mut tables = self.write()?;
        let summary = ResetSummary {
            messages: tables.messages.len(),
            conversations: tables.conversations.len(),
            encounters: tables.encounters.len(),
            relationships: tables.relationships.len(),
            birds: tables.birds.len(),
        };
        tables.messages.clear();
        tables.conversations.clear();
        tables.encounters.clear();
        tables.relationships.clear();
        tables.birds.clear();
        Ok(summary)
    }

    async fn statistics(&self) -> FlywayResult<StoreStatistics> {
        let tables = self.read()?;
        Ok(StoreStatistics {
            user_count: tables.users.len(),
            bird_count: tables.birds.len(),
            encounter_count: tables.encounters.len(),
            conversation_count: tables.conversations.len(),
            message_count: tables.messages.len(),
            relationship_count: tables.relationships.len(),
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
