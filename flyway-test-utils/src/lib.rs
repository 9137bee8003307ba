//! Flyway Test Utilities
//!
//! Shared test infrastructure for the Flyway workspace:
//! - Scripted generation service and token refresher
//! - Proptest generators for scoring inputs
//! - Fixtures for users, birds and encounters

pub use flyway_core::{
    Bird, Conversation, ConversationStatus, Encounter, FlywayConfig, FlywayError, FlywayResult,
    GenerationError, Location, Message, Relationship, Species, User,
};
pub use flyway_storage::{InMemoryStore, RecordStore};

use async_trait::async_trait;
use flyway_llm::{GenerationService, TokenGrant, TokenRefresher};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// SCRIPTED PROVIDERS
// ============================================================================

/// Reply used when the script queue is empty.
pub const DEFAULT_REPLY: &str = "Nice to meet you, the water here is full of small fish.";

fn scripted_failure(reason: &str) -> FlywayError {
    FlywayError::Generation(GenerationError::RequestFailed {
        provider: "scripted".to_string(),
        status: 500,
        message: reason.to_string(),
    })
}

/// Generation service driven by a script.
///
/// `send_message` pops the next queued reply (or failure) and falls back to
/// [`DEFAULT_REPLY`]. `interest_tags` answers per access token; unknown
/// tokens have no tags.
#[derive(Debug, Default)]
pub struct ScriptedGeneration {
    replies: Mutex<VecDeque<Option<String>>>,
    tags: Mutex<HashMap<String, Vec<String>>>,
    failing_tags: Mutex<HashSet<String>>,
    prompts: Mutex<Vec<(String, String)>>,
    message_calls: AtomicUsize,
    tag_calls: AtomicUsize,
}

impl ScriptedGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next `send_message` call.
    pub fn push_reply(&self, reply: impl Into<String>) {
        lock(&self.replies).push_back(Some(reply.into()));
    }

    pub fn push_replies<I, S>(&self, replies: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut queue = lock(&self.replies);
        queue.extend(replies.into_iter().map(|r| Some(r.into())));
    }

    /// Queue a failure for the next `send_message` call.
    pub fn push_failure(&self) {
        lock(&self.replies).push_back(None);
    }

    pub fn set_tags<I, S>(&self, access_token: &str, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        lock(&self.tags).insert(
            access_token.to_string(),
            tags.into_iter().map(Into::into).collect(),
        );
    }

    /// Make every tag lookup for `access_token` fail.
    pub fn fail_tags_for(&self, access_token: &str) {
        lock(&self.failing_tags).insert(access_token.to_string());
    }

    /// Every `(access_token, prompt)` pair sent so far, in order.
    pub fn prompts(&self) -> Vec<(String, String)> {
        lock(&self.prompts).clone()
    }

    pub fn message_calls(&self) -> usize {
        self.message_calls.load(Ordering::SeqCst)
    }

    pub fn tag_calls(&self) -> usize {
        self.tag_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationService for ScriptedGeneration {
    async fn send_message(&self, access_token: &str, prompt: &str) -> FlywayResult<String> {
        self.message_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.prompts).push((access_token.to_string(), prompt.to_string()));
        match lock(&self.replies).pop_front() {
            Some(Some(reply)) => Ok(reply),
            Some(None) => Err(scripted_failure("scripted failure")),
            None => Ok(DEFAULT_REPLY.to_string()),
        }
    }

    async fn interest_tags(&self, access_token: &str) -> FlywayResult<Vec<String>> {
        self.tag_calls.fetch_add(1, Ordering::SeqCst);
        if lock(&self.failing_tags).contains(access_token) {
            return Err(scripted_failure("tags unavailable"));
        }
        Ok(lock(&self.tags).get(access_token).cloned().unwrap_or_default())
    }
}

/// Token refresher that either always grants or always fails.
#[derive(Debug, Clone)]
pub struct ScriptedRefresher {
    grant: Option<TokenGrant>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedRefresher {
    /// Grants `access_token` valid for two hours.
    pub fn granting(access_token: impl Into<String>) -> Self {
        Self {
            grant: Some(TokenGrant {
                access_token: access_token.into(),
                refresh_token: Some("refresh-next".to_string()),
                expires_in: 7200,
            }),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            grant: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared call counter; stays valid after the refresher is moved.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl TokenRefresher for ScriptedRefresher {
    async fn refresh(&self, _refresh_token: &str) -> FlywayResult<TokenGrant> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.grant.clone().ok_or_else(|| {
            FlywayError::Generation(GenerationError::TokenRefreshFailed {
                reason: "scripted refusal".to_string(),
            })
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for scoring and relationship inputs.

    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    /// Interest words with deliberate substring overlaps ("bird" / "birdwatching").
    pub const TAG_VOCABULARY: &[&str] = &[
        "nature", "Nature", "bird", "birdwatching", "photo", "photography", "travel",
        "music", "hiking", "lake", "tea", "reading",
    ];

    pub fn arb_uuid_v7() -> impl Strategy<Value = Uuid> {
        Just(()).prop_map(|_| Uuid::now_v7())
    }

    pub fn arb_tag_set() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(prop::sample::select(TAG_VOCABULARY), 0..8)
            .prop_map(|tags| tags.into_iter().map(String::from).collect())
    }

    /// Trait sets drawn from the reference species personalities.
    pub fn arb_trait_set() -> impl Strategy<Value = Vec<String>> {
        let vocabulary: Vec<String> = flyway_core::all_species()
            .iter()
            .flat_map(|s| s.personality.iter().cloned())
            .collect();
        prop::collection::vec(prop::sample::select(vocabulary), 0..6)
    }

    pub fn arb_species_id() -> impl Strategy<Value = String> {
        let ids: Vec<String> = flyway_core::all_species().iter().map(|s| s.id.clone()).collect();
        prop::sample::select(ids)
    }

    pub fn arb_distance() -> impl Strategy<Value = f64> {
        prop_oneof![
            Just(0.0),
            Just(1.0),
            Just(3.0),
            Just(5.0),
            Just(5.0001),
            0.0f64..20.0,
        ]
    }

    pub fn arb_month() -> impl Strategy<Value = u32> {
        1u32..=12
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built users, birds and encounters.

    use super::*;
    use chrono::{Duration, Utc};

    /// A user whose access token is good for two hours.
    pub fn user_with_token(access_token: &str) -> User {
        User::new(
            format!("ext-{access_token}"),
            access_token,
            Some(format!("refresh-{access_token}")),
            Utc::now() + Duration::hours(2),
        )
        .with_name(access_token)
    }

    /// Panics on an unknown id; fixtures only use catalog species.
    pub fn species(species_id: &str) -> &'static Species {
        flyway_core::find_species(species_id)
            .unwrap_or_else(|| panic!("unknown fixture species {species_id}"))
    }

    pub fn location(lat: f64, lng: f64, place: &str) -> Location {
        Location {
            lat,
            lng,
            place: place.to_string(),
        }
    }

    /// A bird of `species_id` owned by `user`, parked at `at`.
    pub fn bird_at(user: &User, species_id: &str, at: Location) -> Bird {
        Bird::new(user.user_id, species(species_id), user.name.as_deref(), at)
    }

    /// Insert a user and a bird into `store`.
    pub async fn seed_bird(
        store: &dyn RecordStore,
        access_token: &str,
        species_id: &str,
        at: Location,
    ) -> FlywayResult<(User, Bird)> {
        let user = user_with_token(access_token);
        store.user_insert(&user).await?;
        let bird = bird_at(&user, species_id, at);
        store.bird_insert(&bird).await?;
        Ok((user, bird))
    }

    /// Insert an encounter between `a` and `b` with a pending conversation.
    pub async fn seed_encounter(
        store: &dyn RecordStore,
        a: &Bird,
        b: &Bird,
        score: u32,
    ) -> FlywayResult<(Encounter, Conversation)> {
        let encounter = Encounter::new(a.bird_id, b.bird_id, &a.location).with_weather("sunny");
        let conversation = Conversation::pending(encounter.encounter_id, score);
        store
            .encounter_create_with_conversation(&encounter, &conversation)
            .await?;
        Ok((encounter, conversation))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_scripted_generation_pops_then_defaults() {
        let generation = ScriptedGeneration::new();
        generation.push_reply("first");
        generation.push_failure();

        assert_eq!(generation.send_message("t", "p1").await.unwrap(), "first");
        assert!(generation.send_message("t", "p2").await.is_err());
        assert_eq!(generation.send_message("t", "p3").await.unwrap(), DEFAULT_REPLY);
        assert_eq!(generation.message_calls(), 3);
        assert_eq!(generation.prompts()[1], ("t".to_string(), "p2".to_string()));
    }

    #[tokio::test]
    async fn test_scripted_tags_per_token() {
        let generation = ScriptedGeneration::new();
        generation.set_tags("a", ["nature", "music"]);
        generation.fail_tags_for("b");

        assert_eq!(generation.interest_tags("a").await.unwrap(), vec!["nature", "music"]);
        assert!(generation.interest_tags("b").await.is_err());
        assert!(generation.interest_tags("c").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scripted_refresher_counts_calls() {
        let refresher = ScriptedRefresher::failing();
        let calls = refresher.calls();
        assert!(refresher.refresh("r").await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let grant = ScriptedRefresher::granting("fresh").refresh("r").await.unwrap();
        assert_eq!(grant.access_token, "fresh");
    }

    #[tokio::test]
    async fn test_seed_fixtures() {
        let store = InMemoryStore::new();
        let at = fixtures::location(31.0, 121.0, "Dianchi Lake, Kunming");
        let (_, a) = fixtures::seed_bird(&store, "a", "mute-swan", at.clone()).await.unwrap();
        let (_, b) = fixtures::seed_bird(&store, "b", "mute-swan", at).await.unwrap();
        let (encounter, conversation) = fixtures::seed_encounter(&store, &a, &b, 70).await.unwrap();

        assert_eq!(conversation.encounter_id, encounter.encounter_id);
        assert_eq!(conversation.status, ConversationStatus::Pending);
        assert_eq!(a.name, "a's Mute Swan");
    }

    proptest! {
        #[test]
        fn prop_tag_sets_come_from_vocabulary(tags in generators::arb_tag_set()) {
            for tag in &tags {
                prop_assert!(generators::TAG_VOCABULARY.contains(&tag.as_str()));
            }
        }

        #[test]
        fn prop_species_ids_resolve(id in generators::arb_species_id()) {
            prop_assert!(flyway_core::find_species(&id).is_some());
        }
    }
}
