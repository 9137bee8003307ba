//! Core entity structures

use crate::{
    BirdId, ConversationId, EncounterId, MessageId, RelationshipId, Timestamp, UserId,
    ValidationError,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Strength ceiling for a relationship edge.
pub const MAX_RELATIONSHIP_STRENGTH: u32 = 100;

// ============================================================================
// REFERENCE DATA
// ============================================================================

/// One stop of a species' yearly route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Waypoint {
    /// Calendar month, 1-12
    pub month: u32,
    pub location: String,
    pub lat: f64,
    pub lng: f64,
    /// What the bird is doing there (overwintering, breeding, ...)
    pub activity: String,
}

/// Static description of a migratory bird species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Species {
    /// Stable slug, e.g. "red-crowned-crane"
    pub id: String,
    pub name: String,
    pub scientific_name: String,
    pub description: String,
    pub habitat: String,
    pub personality: Vec<String>,
    /// Display glyph used in place of an image
    pub glyph: String,
    pub migration_route: Vec<Waypoint>,
}

// ============================================================================
// BIRD
// ============================================================================

/// Where a bird currently is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    pub place: String,
}

impl Location {
    /// Euclidean distance in degrees.
    pub fn distance_to(&self, other: &Location) -> f64 {
        crate::geo::distance(self.lat, self.lng, other.lat, other.lng)
    }
}

impl From<&Waypoint> for Location {
    fn from(waypoint: &Waypoint) -> Self {
        Self {
            lat: waypoint.lat,
            lng: waypoint.lng,
            place: waypoint.location.clone(),
        }
    }
}

/// A user's virtual bird.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Bird {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub bird_id: BirdId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub user_id: UserId,
    pub species_id: String,
    pub name: String,
    /// Trait labels, usually copied from the species
    pub personality: Vec<String>,
    /// Interest labels captured at assignment time
    pub preferences: Vec<String>,
    pub location: Location,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

impl Bird {
    /// Create a bird of the given species standing at `location`.
    pub fn new(user_id: UserId, species: &Species, owner_name: Option<&str>, location: Location) -> Self {
        let now = Utc::now();
        Self {
            bird_id: crate::new_entity_id(),
            user_id,
            species_id: species.id.clone(),
            name: bird_name(owner_name, species),
            personality: species.personality.clone(),
            preferences: Vec::new(),
            location,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_preferences(mut self, preferences: Vec<String>) -> Self {
        self.preferences = preferences;
        self
    }
}

/// Display name for a bird, e.g. "Ada's Mute Swan".
pub fn bird_name(owner_name: Option<&str>, species: &Species) -> String {
    match owner_name.filter(|n| !n.trim().is_empty()) {
        Some(owner) => format!("{}'s {}", owner.trim(), species.name),
        None => format!("Little {}", species.name),
    }
}

// ============================================================================
// ENCOUNTER / CONVERSATION / MESSAGE
// ============================================================================

/// Two birds found at the same place at the same time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Encounter {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub encounter_id: EncounterId,
    /// The bird whose scan found the other one
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub bird_id: BirdId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub met_bird_id: BirdId,
    pub location: String,
    pub lat: f64,
    pub lng: f64,
    pub weather: Option<String>,
    pub scene: Option<String>,
    /// Narrative attached once the conversation completes
    pub story: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub encountered_at: Timestamp,
}

impl Encounter {
    pub fn new(bird_id: BirdId, met_bird_id: BirdId, at: &Location) -> Self {
        Self {
            encounter_id: crate::new_entity_id(),
            bird_id,
            met_bird_id,
            location: at.place.clone(),
            lat: at.lat,
            lng: at.lng,
            weather: None,
            scene: None,
            story: None,
            encountered_at: Utc::now(),
        }
    }

    pub fn with_weather(mut self, weather: impl Into<String>) -> Self {
        self.weather = Some(weather.into());
        self
    }

    pub fn with_scene(mut self, scene: impl Into<String>) -> Self {
        self.scene = Some(scene.into());
        self
    }

    pub fn involves(&self, bird_id: BirdId) -> bool {
        self.bird_id == bird_id || self.met_bird_id == bird_id
    }

    /// The participant that is not `bird_id`.
    pub fn other_bird(&self, bird_id: BirdId) -> BirdId {
        if self.bird_id == bird_id {
            self.met_bird_id
        } else {
            self.bird_id
        }
    }

    /// True when this encounter is between `a` and `b` in either order.
    pub fn is_between(&self, a: BirdId, b: BirdId) -> bool {
        (self.bird_id == a && self.met_bird_id == b) || (self.bird_id == b && self.met_bird_id == a)
    }
}

/// Lifecycle of a generated conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::Pending => "pending",
            ConversationStatus::InProgress => "in_progress",
            ConversationStatus::Completed => "completed",
            ConversationStatus::Failed => "failed",
        }
    }

    /// Completed and failed conversations never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConversationStatus::Completed | ConversationStatus::Failed)
    }

    /// Forward-only transitions; any non-terminal state may fail.
    pub fn can_transition_to(&self, next: ConversationStatus) -> bool {
        use ConversationStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress) | (Pending, Failed) | (InProgress, Completed) | (InProgress, Failed)
        )
    }
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The dialogue attached 1:1 to an encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Conversation {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub conversation_id: ConversationId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub encounter_id: EncounterId,
    pub status: ConversationStatus,
    /// Affinity score at the moment the encounter was admitted
    pub attraction_score: u32,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub completed_at: Option<Timestamp>,
}

impl Conversation {
    pub fn pending(encounter_id: EncounterId, attraction_score: u32) -> Self {
        Self {
            conversation_id: crate::new_entity_id(),
            encounter_id,
            status: ConversationStatus::Pending,
            attraction_score,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Move to `next`, stamping `completed_at` on completion.
    pub fn transition(&mut self, next: ConversationStatus) -> Result<(), ValidationError> {
        if !self.status.can_transition_to(next) {
            return Err(ValidationError::InvalidStatusTransition {
                conversation_id: self.conversation_id,
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        if next == ConversationStatus::Completed {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }
}

/// One generated line of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Message {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub message_id: MessageId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub conversation_id: ConversationId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub speaker_bird_id: BirdId,
    pub content: String,
    /// 1-based
    pub round: u32,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
}

impl Message {
    pub fn new(
        conversation_id: ConversationId,
        speaker_bird_id: BirdId,
        content: impl Into<String>,
        round: u32,
    ) -> Self {
        Self {
            message_id: crate::new_entity_id(),
            conversation_id,
            speaker_bird_id,
            content: content.into(),
            round,
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// RELATIONSHIP
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    Friendship,
    Love,
}

/// Directed edge `bird_id -> related_bird_id`. Edges are kept in pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Relationship {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub relationship_id: RelationshipId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub bird_id: BirdId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub related_bird_id: BirdId,
    pub relationship_type: RelationshipType,
    /// 0..=100
    pub strength: u32,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub started_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

impl Relationship {
    /// A fresh friendship edge starting at `delta` (clamped).
    pub fn friendship(bird_id: BirdId, related_bird_id: BirdId, delta: u32) -> Self {
        let now = Utc::now();
        Self {
            relationship_id: crate::new_entity_id(),
            bird_id,
            related_bird_id,
            relationship_type: RelationshipType::Friendship,
            strength: delta.min(MAX_RELATIONSHIP_STRENGTH),
            started_at: now,
            updated_at: now,
        }
    }

    /// Add `delta`, never exceeding the ceiling.
    pub fn reinforce(&mut self, delta: u32) {
        self.strength = self.strength.saturating_add(delta).min(MAX_RELATIONSHIP_STRENGTH);
        self.updated_at = Utc::now();
    }
}

// ============================================================================
// USER
// ============================================================================

/// Account holding the OAuth credentials used on the bird owner's behalf.
#[derive(Clone, PartialEq)]
pub struct User {
    pub user_id: UserId,
    /// Identity at the OAuth provider
    pub external_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_expires_at: Timestamp,
    pub created_at: Timestamp,
}

impl User {
    pub fn new(
        external_id: impl Into<String>,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        token_expires_at: Timestamp,
    ) -> Self {
        Self {
            user_id: crate::new_entity_id(),
            external_id: external_id.into(),
            name: None,
            email: None,
            avatar_url: None,
            access_token: access_token.into(),
            refresh_token,
            token_expires_at,
            created_at: Utc::now(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("user_id", &self.user_id)
            .field("external_id", &self.external_id)
            .field("name", &self.name)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("token_expires_at", &self.token_expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::new_entity_id;

    #[test]
    fn test_status_transitions_are_forward_only() {
        use ConversationStatus::*;
        assert!(Pending.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Failed));
        assert!(Pending.can_transition_to(Failed));

        assert!(!InProgress.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!Failed.can_transition_to(InProgress));
        assert!(!Failed.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Completed));
    }

    #[test]
    fn test_transition_stamps_completion() -> Result<(), ValidationError> {
        let mut conversation = Conversation::pending(new_entity_id(), 72);
        conversation.transition(ConversationStatus::InProgress)?;
        assert!(conversation.completed_at.is_none());
        conversation.transition(ConversationStatus::Completed)?;
        assert!(conversation.completed_at.is_some());
        assert!(conversation.status.is_terminal());
        Ok(())
    }

    #[test]
    fn test_transition_rejects_backwards_move() {
        let mut conversation = Conversation::pending(new_entity_id(), 72);
        let err = conversation.transition(ConversationStatus::Completed);
        assert!(matches!(err, Err(ValidationError::InvalidStatusTransition { .. })));
        assert_eq!(conversation.status, ConversationStatus::Pending);
    }

    #[test]
    fn test_status_serializes_snake_case() -> Result<(), serde_json::Error> {
        let json = serde_json::to_string(&ConversationStatus::InProgress)?;
        assert_eq!(json, "\"in_progress\"");
        Ok(())
    }

    #[test]
    fn test_relationship_reinforce_clamps_at_ceiling() {
        let mut edge = Relationship::friendship(new_entity_id(), new_entity_id(), 90);
        edge.reinforce(25);
        assert_eq!(edge.strength, MAX_RELATIONSHIP_STRENGTH);
        edge.reinforce(10);
        assert_eq!(edge.strength, MAX_RELATIONSHIP_STRENGTH);
    }

    #[test]
    fn test_encounter_pair_helpers() {
        let a = new_entity_id();
        let b = new_entity_id();
        let c = new_entity_id();
        let at = Location { lat: 1.0, lng: 2.0, place: "Poyang Lake".to_string() };
        let encounter = Encounter::new(a, b, &at);
        assert!(encounter.is_between(b, a));
        assert!(!encounter.is_between(a, c));
        assert_eq!(encounter.other_bird(a), b);
        assert_eq!(encounter.other_bird(b), a);
    }

    #[test]
    fn test_user_debug_redacts_tokens() {
        let user = User::new("ext", "secret-access", Some("secret-refresh".into()), Utc::now());
        let debug = format!("{:?}", user);
        assert!(!debug.contains("secret-access"));
        assert!(!debug.contains("secret-refresh"));
        assert!(debug.contains("[REDACTED]"));
    }
}
