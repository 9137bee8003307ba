//! Read side: encounter history and conversation transcripts.

use flyway_core::{
    Bird, BirdId, Conversation, ConversationError, ConversationId, Encounter, EntityType,
    FlywayError, FlywayResult, Message, Relationship, StorageError,
};
use flyway_storage::RecordStore;
use serde::Serialize;

/// Most encounters returned by [`encounter_history`].
pub const HISTORY_LIMIT: usize = 50;

/// Public face of a bird in history views.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BirdCard {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub bird_id: BirdId,
    pub name: String,
    pub species_id: String,
    pub glyph: Option<String>,
}

impl From<&Bird> for BirdCard {
    fn from(bird: &Bird) -> Self {
        Self {
            bird_id: bird.bird_id,
            name: bird.name.clone(),
            species_id: bird.species_id.clone(),
            glyph: flyway_core::find_species(&bird.species_id).map(|s| s.glyph.clone()),
        }
    }
}

/// A conversation with its messages in round order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Transcript {
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

/// One row of a bird's encounter history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EncounterRecord {
    pub encounter: Encounter,
    /// `None` once the other bird has been removed
    pub other_bird: Option<BirdCard>,
    pub transcript: Option<Transcript>,
    /// The viewer's edge toward the other bird
    pub relationship: Option<Relationship>,
}

async fn transcript_for(store: &dyn RecordStore, conversation: Conversation) -> FlywayResult<Transcript> {
    let messages = store.message_list(conversation.conversation_id).await?;
    Ok(Transcript {
        conversation,
        messages,
    })
}

/// The newest encounters involving `bird_id`, newest first.
pub async fn encounter_history(
    store: &dyn RecordStore,
    bird_id: BirdId,
) -> FlywayResult<Vec<EncounterRecord>> {
    let encounters = store.encounter_list_for_bird(bird_id, HISTORY_LIMIT).await?;
    let mut records = Vec::with_capacity(encounters.len());
    for encounter in encounters {
        let other_id = encounter.other_bird(bird_id);
        let other_bird = store.bird_get(other_id).await?.as_ref().map(BirdCard::from);
        let transcript = match store
            .conversation_get_by_encounter(encounter.encounter_id)
            .await?
        {
            Some(conversation) => Some(transcript_for(store, conversation).await?),
            None => None,
        };
        let relationship = store.relationship_get(bird_id, other_id).await?;
        records.push(EncounterRecord {
            encounter,
            other_bird,
            transcript,
            relationship,
        });
    }
    Ok(records)
}

/// A conversation transcript, readable only by a bird in its encounter.
pub async fn conversation_detail(
    store: &dyn RecordStore,
    conversation_id: ConversationId,
    viewer: BirdId,
) -> FlywayResult<Transcript> {
    let conversation = store
        .conversation_get(conversation_id)
        .await?
        .ok_or(FlywayError::Storage(StorageError::NotFound {
            entity_type: EntityType::Conversation,
            id: conversation_id,
        }))?;
    let encounter = store
        .encounter_get(conversation.encounter_id)
        .await?
        .ok_or(FlywayError::Storage(StorageError::NotFound {
            entity_type: EntityType::Encounter,
            id: conversation.encounter_id,
        }))?;
    if !encounter.involves(viewer) {
        return Err(ConversationError::NotParticipant {
            conversation_id,
            bird_id: viewer,
        }
        .into());
    }
    transcript_for(store, conversation).await
}
