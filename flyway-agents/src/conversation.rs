//! Conversation driver.
//!
//! Runs a bounded dialogue between two birds through the generation
//! service. Each turn is persisted before the next one is requested, so a
//! failure part-way leaves the earlier turns in place. The conversation ends
//! in `completed` (relationship reinforced, story attached) or `failed`.

use crate::chance::Chance;
use crate::credentials::CredentialManager;
use crate::dispatch::ConversationJob;
use crate::relationship::reinforce_pair;
use flyway_core::{
    find_species, Bird, BirdId, ConversationError, ConversationId, ConversationStatus, EncounterId,
    EntityType, FlywayConfig, FlywayError, FlywayResult, Message, RelationshipDeltaConfig,
    StorageError,
};
use flyway_llm::GenerationService;
use flyway_storage::RecordStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Replies containing any of these end the conversation once the minimum
/// number of rounds has been reached.
pub const FAREWELL_KEYWORDS: &[&str] = &[
    "goodbye",
    "bye",
    "see you",
    "farewell",
    "take care",
    "safe travels",
    "until next time",
];

/// Each distinct keyword found in the transcript adds to the relationship delta.
pub const POSITIVE_KEYWORDS: &[&str] = &[
    "happy",
    "glad",
    "like",
    "friend",
    "fun",
    "look forward",
    "wonderful",
    "joy",
    "lucky",
    "fate",
];

const DEFAULT_WEATHER: &str = "the sky is clear";

/// Where and under what conditions the two birds are talking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ConversationContext {
    /// Place name of the initiator's current waypoint
    pub location: String,
    /// What the initiator's species does there this month
    pub activity: String,
    pub weather: Option<String>,
    pub scene: Option<String>,
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ConversationOutcome {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub conversation_id: ConversationId,
    /// Number of the last round spoken
    pub rounds: u32,
    pub delta: u32,
    /// Strength of the initiator -> responder edge after the update
    pub strength: u32,
    pub story: String,
}

/// A bird plus the display name of its species.
struct Speaker {
    bird: Bird,
    species_name: String,
}

impl Speaker {
    fn new(bird: Bird) -> Self {
        let species_name = find_species(&bird.species_id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| bird.species_id.clone());
        Self { bird, species_name }
    }
}

/// Drives conversations from `pending` to a terminal state.
pub struct ConversationDriver {
    store: Arc<dyn RecordStore>,
    generation: Arc<dyn GenerationService>,
    credentials: CredentialManager,
    config: FlywayConfig,
    chance: Arc<dyn Chance>,
}

impl ConversationDriver {
    pub fn new(
        store: Arc<dyn RecordStore>,
        generation: Arc<dyn GenerationService>,
        credentials: CredentialManager,
        config: FlywayConfig,
        chance: Arc<dyn Chance>,
    ) -> Self {
        Self {
            store,
            generation,
            credentials,
            config,
            chance,
        }
    }

    /// Run the conversation named by `job`.
    ///
    /// Only a `pending` conversation is runnable. Any error after the move to
    /// `in_progress` marks the conversation `failed` and is returned.
    pub async fn run(&self, job: &ConversationJob) -> FlywayResult<ConversationOutcome> {
        let conversation = self
            .store
            .conversation_get(job.conversation_id)
            .await?
            .ok_or(FlywayError::Storage(StorageError::NotFound {
                entity_type: EntityType::Conversation,
                id: job.conversation_id,
            }))?;

        if conversation.status != ConversationStatus::Pending {
            return Err(ConversationError::NotRunnable {
                conversation_id: job.conversation_id,
                status: conversation.status.to_string(),
            }
            .into());
        }

        self.store
            .conversation_update_status(job.conversation_id, ConversationStatus::InProgress)
            .await?;
        tracing::info!(
            conversation_id = %job.conversation_id,
            initiator = %job.initiator,
            responder = %job.responder,
            "Conversation started"
        );

        let finished = match self.converse(job, conversation.encounter_id).await {
            Ok(outcome) => self
                .store
                .conversation_update_status(job.conversation_id, ConversationStatus::Completed)
                .await
                .map(|_| outcome),
            Err(e) => Err(e),
        };

        match finished {
            Ok(outcome) => {
                tracing::info!(
                    conversation_id = %job.conversation_id,
                    rounds = outcome.rounds,
                    delta = outcome.delta,
                    "Conversation completed"
                );
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!(
                    conversation_id = %job.conversation_id,
                    error = %e,
                    "Conversation failed"
                );
                if let Err(mark) = self
                    .store
                    .conversation_update_status(job.conversation_id, ConversationStatus::Failed)
                    .await
                {
                    tracing::warn!(
                        conversation_id = %job.conversation_id,
                        error = %mark,
                        "Could not mark conversation failed"
                    );
                }
                Err(e)
            }
        }
    }

    async fn converse(
        &self,
        job: &ConversationJob,
        encounter_id: EncounterId,
    ) -> FlywayResult<ConversationOutcome> {
        let initiator = Speaker::new(self.load_bird(job.initiator).await?);
        let responder = Speaker::new(self.load_bird(job.responder).await?);

        let mut transcript: Vec<Message> = Vec::new();
        let mut round = 1;
        loop {
            let (speaker, listener) = if round % 2 == 1 {
                (&initiator, &responder)
            } else {
                (&responder, &initiator)
            };
            let prompt = match transcript.last() {
                None => opening_prompt(speaker, listener, &job.context),
                Some(last) => reply_prompt(speaker, &job.context, &last.content, round),
            };

            let token = self
                .credentials
                .get_valid_access_token(speaker.bird.user_id)
                .await?;
            let reply = self.generation.send_message(&token, &prompt).await?;
            let reply = reply.trim();
            if reply.is_empty() {
                return Err(ConversationError::EmptyReply {
                    conversation_id: job.conversation_id,
                    round,
                }
                .into());
            }

            let message = Message::new(job.conversation_id, speaker.bird.bird_id, reply, round);
            self.store.message_insert(&message).await?;
            tracing::debug!(
                conversation_id = %job.conversation_id,
                round,
                speaker = %speaker.bird.bird_id,
                "Turn recorded"
            );
            transcript.push(message);

            if should_end(reply, round, &self.config, self.chance.as_ref()) {
                break;
            }
            round += 1;
        }

        let delta = relationship_delta(&transcript, &self.config.relationship);
        let (forward, _) = reinforce_pair(
            self.store.as_ref(),
            initiator.bird.bird_id,
            responder.bird.bird_id,
            delta,
        )
        .await?;

        let story = encounter_story(
            &initiator.bird.name,
            &responder.bird.name,
            &job.context.location,
            transcript.len(),
        );
        self.store.encounter_set_story(encounter_id, &story).await?;

        Ok(ConversationOutcome {
            conversation_id: job.conversation_id,
            rounds: round,
            delta,
            strength: forward.strength,
            story,
        })
    }

    async fn load_bird(&self, bird_id: BirdId) -> FlywayResult<Bird> {
        self.store
            .bird_get(bird_id)
            .await?
            .ok_or(FlywayError::Storage(StorageError::NotFound {
                entity_type: EntityType::Bird,
                id: bird_id,
            }))
    }
}

impl std::fmt::Debug for ConversationDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationDriver")
            .field("config", &self.config)
            .finish()
    }
}

// ============================================================================
// PROMPTS
// ============================================================================

fn opening_prompt(speaker: &Speaker, listener: &Speaker, context: &ConversationContext) -> String {
    let weather = context.weather.as_deref().unwrap_or(DEFAULT_WEATHER);
    format!(
        "You are {}, a {}.\nYou are at {}, {}.\n\n\
         You have just met {} ({}). Say hello, and briefly describe this place or your migration so far.\n\n\
         Reply in the first person, in 1-2 sentences, warm and natural, with a little natural-history fact.",
        speaker.bird.name,
        speaker.species_name,
        context.location,
        weather,
        listener.bird.name,
        listener.species_name,
    )
}

/// Topic hint for a reply in `round`.
fn topic_for_round(round: u32) -> &'static str {
    match round {
        0..=2 => "talk about what you eat or where you like to live",
        3 => "share your migration route or how you fly",
        4 => "describe the natural surroundings of this place",
        _ => "you may say goodbye and wish the other a safe migration",
    }
}

fn reply_prompt(
    speaker: &Speaker,
    context: &ConversationContext,
    last_line: &str,
    round: u32,
) -> String {
    format!(
        "You are {}, a {}, at {}.\n\nThe other bird said: \"{}\"\n\n\
         Reply, and {}.\n\n\
         Reply in the first person, in 1-2 sentences, with a little natural-history fact.",
        speaker.bird.name,
        speaker.species_name,
        context.location,
        last_line,
        topic_for_round(round),
    )
}

// ============================================================================
// STOPPING, SCORING, STORY
// ============================================================================

/// Whether the conversation stops after `reply` was spoken in `round`.
///
/// Never before `min_rounds`, always at `max_rounds`. In between a farewell
/// ends it, otherwise it ends with `early_stop_probability`.
pub fn should_end(reply: &str, round: u32, config: &FlywayConfig, chance: &dyn Chance) -> bool {
    if round >= config.max_rounds {
        return true;
    }
    if round < config.min_rounds {
        return false;
    }
    let reply_words = words(reply);
    if FAREWELL_KEYWORDS.iter().any(|kw| mentions(&reply_words, kw)) {
        return true;
    }
    chance.sample() < config.early_stop_probability
}

/// Relationship gain for a finished transcript.
pub fn relationship_delta(messages: &[Message], caps: &RelationshipDeltaConfig) -> u32 {
    let turns = (messages.len() as u32).min(caps.max_counted_turns);
    let lines: Vec<Vec<String>> = messages.iter().map(|m| words(&m.content)).collect();
    let hits = POSITIVE_KEYWORDS
        .iter()
        .filter(|kw| lines.iter().any(|line| mentions(line, kw)))
        .count() as u32;
    (caps.base + caps.per_turn * turns + caps.per_keyword * hits).min(caps.max_delta)
}

/// Lowercase words of `text`, split on anything that is not a letter or digit.
pub(crate) fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Whether `keyword` (one word or a phrase) occurs as whole words in `text_words`.
fn mentions(text_words: &[String], keyword: &str) -> bool {
    let phrase = words(keyword);
    if phrase.is_empty() {
        return false;
    }
    text_words.windows(phrase.len()).any(|window| window == phrase.as_slice())
}

/// Short narrative for the encounter, by transcript length.
pub fn encounter_story(a_name: &str, b_name: &str, location: &str, message_count: usize) -> String {
    let middle = match message_count {
        n if n >= 5 => "They hit it off and swapped tales from their travels.",
        n if n >= 3 => "They greeted each other and traded some news.",
        _ => "They exchanged a brief greeting.",
    };
    format!(
        "At {location}, {a_name} and {b_name} met. {middle} This chance meeting deepened their friendship a little."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chance::FixedChance;
    use flyway_core::new_entity_id;
    use flyway_storage::InMemoryStore;
    use flyway_test_utils::{fixtures, ScriptedGeneration, ScriptedRefresher};

    fn transcript(lines: &[&str]) -> Vec<Message> {
        let conversation_id = new_entity_id();
        let speaker = new_entity_id();
        lines
            .iter()
            .enumerate()
            .map(|(i, l)| Message::new(conversation_id, speaker, *l, i as u32 + 1))
            .collect()
    }

    struct Harness {
        store: Arc<InMemoryStore>,
        generation: Arc<ScriptedGeneration>,
        job: ConversationJob,
        encounter_id: EncounterId,
    }

    async fn harness() -> Harness {
        let store = Arc::new(InMemoryStore::new());
        let at = fixtures::location(24.9, 102.7, "Dianchi Lake, Kunming");
        let (_, a) = fixtures::seed_bird(store.as_ref(), "ada", "red-billed-gull", at.clone())
            .await
            .unwrap();
        let (_, b) = fixtures::seed_bird(store.as_ref(), "bo", "mute-swan", at).await.unwrap();
        let (encounter, conversation) = fixtures::seed_encounter(store.as_ref(), &a, &b, 72)
            .await
            .unwrap();
        Harness {
            store,
            generation: Arc::new(ScriptedGeneration::new()),
            job: ConversationJob {
                conversation_id: conversation.conversation_id,
                initiator: a.bird_id,
                responder: b.bird_id,
                context: ConversationContext {
                    location: "Dianchi Lake, Kunming".to_string(),
                    activity: "wintering".to_string(),
                    weather: Some("misty".to_string()),
                    scene: None,
                },
            },
            encounter_id: encounter.encounter_id,
        }
    }

    fn driver(h: &Harness, chance: FixedChance) -> ConversationDriver {
        let credentials = CredentialManager::new(
            h.store.clone(),
            Arc::new(ScriptedRefresher::failing()),
            chrono::Duration::minutes(5),
        );
        ConversationDriver::new(
            h.store.clone(),
            h.generation.clone(),
            credentials,
            FlywayConfig::default(),
            Arc::new(chance),
        )
    }

    #[test]
    fn test_delta_three_plain_messages() {
        let messages = transcript(&["Hello there.", "The reeds are tall.", "Indeed."]);
        assert_eq!(relationship_delta(&messages, &RelationshipDeltaConfig::default()), 11);
    }

    #[test]
    fn test_delta_five_messages_two_keywords() {
        let messages = transcript(&[
            "Hello there.",
            "I am glad to see you.",
            "The water is cold.",
            "It has been a wonderful winter.",
            "Glad again.",
        ]);
        assert_eq!(relationship_delta(&messages, &RelationshipDeltaConfig::default()), 19);
    }

    #[test]
    fn test_delta_is_capped() {
        let messages = transcript(&[
            "happy glad",
            "like friend",
            "fun look forward",
            "wonderful joy",
            "lucky fate",
        ]);
        assert_eq!(relationship_delta(&messages, &RelationshipDeltaConfig::default()), 25);
    }

    #[test]
    fn test_delta_ignores_keywords_inside_longer_words() {
        let messages = transcript(&[
            "It is unlikely the fundraiser will be enjoyable.",
            "Unlike you, I nest on cliffs.",
            "Fine.",
        ]);
        assert_eq!(relationship_delta(&messages, &RelationshipDeltaConfig::default()), 11);
    }

    #[test]
    fn test_delta_matches_phrases_across_punctuation() {
        let messages = transcript(&["I look, forward to spring.", "Hello.", "I LOOK FORWARD to it!"]);
        // "look forward" once, counted as one distinct keyword
        assert_eq!(relationship_delta(&messages, &RelationshipDeltaConfig::default()), 13);
    }

    #[test]
    fn test_should_end_ignores_farewell_inside_words() {
        let config = FlywayConfig::default();
        let never = FixedChance::never();
        assert!(!should_end("We crossed the Byelorussian wetlands in March.", 3, &config, &never));
        assert!(!should_end("A seesaw of updrafts, you see.", 4, &config, &never));
        assert!(should_end("Well, bye!", 3, &config, &never));
        assert!(should_end("See you at the lake.", 4, &config, &never));
    }

    #[test]
    fn test_words_split_on_punctuation() {
        assert_eq!(words("Safe-travels, FRIEND!"), vec!["safe", "travels", "friend"]);
        assert!(words("  ...  ").is_empty());
    }

    #[test]
    fn test_should_end_bounds() {
        let config = FlywayConfig::default();
        let always = FixedChance::always();
        let never = FixedChance::never();

        assert!(!should_end("Goodbye!", 2, &config, &always));
        assert!(should_end("Goodbye!", 3, &config, &never));
        assert!(should_end("Take care on the way north", 4, &config, &never));
        assert!(should_end("Tell me more", 3, &config, &always));
        assert!(!should_end("Tell me more", 4, &config, &never));
        assert!(should_end("Tell me more", 5, &config, &never));
    }

    #[test]
    fn test_story_tiers() {
        let long = encounter_story("A", "B", "Poyang Lake", 5);
        assert!(long.starts_with("At Poyang Lake, A and B met."));
        assert!(long.contains("swapped tales"));
        assert!(encounter_story("A", "B", "X", 3).contains("traded some news"));
        assert!(encounter_story("A", "B", "X", 1).contains("brief greeting"));
    }

    #[test]
    fn test_topic_hints_follow_rounds() {
        assert!(topic_for_round(2).contains("eat"));
        assert!(topic_for_round(3).contains("migration route"));
        assert!(topic_for_round(4).contains("surroundings"));
        assert!(topic_for_round(5).contains("goodbye"));
    }

    #[tokio::test]
    async fn test_full_run_alternates_speakers_to_max_rounds() -> Result<(), String> {
        let h = harness().await;
        let driver = driver(&h, FixedChance::never());

        let outcome = driver.run(&h.job).await.map_err(|e| e.to_string())?;
        assert_eq!(outcome.rounds, 5);
        // 5 + 2*5, no keywords in the default reply
        assert_eq!(outcome.delta, 15);
        assert_eq!(outcome.strength, 15);

        let messages = h.store.message_list(h.job.conversation_id).await.map_err(|e| e.to_string())?;
        let speakers: Vec<_> = messages.iter().map(|m| m.speaker_bird_id).collect();
        let (a, b) = (h.job.initiator, h.job.responder);
        assert_eq!(speakers, vec![a, b, a, b, a]);

        let tokens: Vec<_> = h.generation.prompts().into_iter().map(|(t, _)| t).collect();
        assert_eq!(tokens, vec!["ada", "bo", "ada", "bo", "ada"]);

        let conversation = h
            .store
            .conversation_get(h.job.conversation_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or("conversation")?;
        assert_eq!(conversation.status, ConversationStatus::Completed);
        assert!(conversation.completed_at.is_some());

        let encounter = h
            .store
            .encounter_get(h.encounter_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or("encounter")?;
        assert_eq!(encounter.story.as_deref(), Some(outcome.story.as_str()));

        let back = h.store.relationship_get(b, a).await.map_err(|e| e.to_string())?.ok_or("edge")?;
        assert_eq!(back.strength, 15);
        Ok(())
    }

    #[tokio::test]
    async fn test_opening_prompt_carries_context() -> Result<(), String> {
        let h = harness().await;
        driver(&h, FixedChance::always()).run(&h.job).await.map_err(|e| e.to_string())?;

        let prompts = h.generation.prompts();
        assert!(prompts[0].1.contains("Dianchi Lake, Kunming, misty"));
        assert!(prompts[0].1.contains("Mute Swan"));
        assert!(prompts[1].1.contains(flyway_test_utils::DEFAULT_REPLY));
        Ok(())
    }

    #[tokio::test]
    async fn test_early_stop_at_min_rounds() -> Result<(), String> {
        let h = harness().await;
        let outcome = driver(&h, FixedChance::always())
            .run(&h.job)
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(outcome.rounds, 3);
        assert!(outcome.story.contains("traded some news"));
        Ok(())
    }

    #[tokio::test]
    async fn test_farewell_stops_conversation() -> Result<(), String> {
        let h = harness().await;
        h.generation.push_replies([
            "Hello from the lake.",
            "I eat small fish.",
            "I fly south each year, goodbye for now!",
        ]);
        let outcome = driver(&h, FixedChance::never())
            .run(&h.job)
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(outcome.rounds, 3);
        assert_eq!(h.generation.message_calls(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_generation_failure_marks_failed_and_keeps_turns() -> Result<(), String> {
        let h = harness().await;
        h.generation.push_reply("Hello from the lake.");
        h.generation.push_failure();

        let result = driver(&h, FixedChance::never()).run(&h.job).await;
        assert!(result.is_err());

        let conversation = h
            .store
            .conversation_get(h.job.conversation_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or("conversation")?;
        assert_eq!(conversation.status, ConversationStatus::Failed);

        let messages = h.store.message_list(h.job.conversation_id).await.map_err(|e| e.to_string())?;
        assert_eq!(messages.len(), 1);
        assert!(h
            .store
            .relationship_get(h.job.initiator, h.job.responder)
            .await
            .map_err(|e| e.to_string())?
            .is_none());
        Ok(())
    }

    /// Store that refuses the final move to `completed`.
    struct RejectsCompletion(Arc<InMemoryStore>);

    #[async_trait::async_trait]
    impl RecordStore for RejectsCompletion {
        async fn user_insert(&self, user: &flyway_core::User) -> FlywayResult<()> {
            self.0.user_insert(user).await
        }
        async fn user_get(&self, id: flyway_core::UserId) -> FlywayResult<Option<flyway_core::User>> {
            self.0.user_get(id).await
        }
        async fn user_update_tokens(
            &self,
            id: flyway_core::UserId,
            access_token: &str,
            refresh_token: Option<&str>,
            expires_at: flyway_core::Timestamp,
        ) -> FlywayResult<()> {
            self.0.user_update_tokens(id, access_token, refresh_token, expires_at).await
        }
        async fn bird_insert(&self, bird: &Bird) -> FlywayResult<()> {
            self.0.bird_insert(bird).await
        }
        async fn bird_get(&self, id: BirdId) -> FlywayResult<Option<Bird>> {
            self.0.bird_get(id).await
        }
        async fn bird_get_by_user(&self, user_id: flyway_core::UserId) -> FlywayResult<Option<Bird>> {
            self.0.bird_get_by_user(user_id).await
        }
        async fn bird_list(&self) -> FlywayResult<Vec<Bird>> {
            self.0.bird_list().await
        }
        async fn bird_update(&self, bird: &Bird) -> FlywayResult<()> {
            self.0.bird_update(bird).await
        }
        async fn bird_update_location(&self, id: BirdId, location: &flyway_core::Location) -> FlywayResult<()> {
            self.0.bird_update_location(id, location).await
        }
        async fn species_upsert(&self, species: &flyway_core::Species) -> FlywayResult<()> {
            self.0.species_upsert(species).await
        }
        async fn species_get(&self, id: &str) -> FlywayResult<Option<flyway_core::Species>> {
            self.0.species_get(id).await
        }
        async fn encounter_create_with_conversation(
            &self,
            encounter: &flyway_core::Encounter,
            conversation: &flyway_core::Conversation,
        ) -> FlywayResult<()> {
            self.0.encounter_create_with_conversation(encounter, conversation).await
        }
        async fn encounter_get(&self, id: EncounterId) -> FlywayResult<Option<flyway_core::Encounter>> {
            self.0.encounter_get(id).await
        }
        async fn encounter_find_recent_between(
            &self,
            a: BirdId,
            b: BirdId,
            since: flyway_core::Timestamp,
        ) -> FlywayResult<Option<flyway_core::Encounter>> {
            self.0.encounter_find_recent_between(a, b, since).await
        }
        async fn encounter_set_story(&self, id: EncounterId, story: &str) -> FlywayResult<()> {
            self.0.encounter_set_story(id, story).await
        }
        async fn encounter_list_for_bird(
            &self,
            bird_id: BirdId,
            limit: usize,
        ) -> FlywayResult<Vec<flyway_core::Encounter>> {
            self.0.encounter_list_for_bird(bird_id, limit).await
        }
        async fn conversation_get(&self, id: ConversationId) -> FlywayResult<Option<flyway_core::Conversation>> {
            self.0.conversation_get(id).await
        }
        async fn conversation_get_by_encounter(
            &self,
            encounter_id: EncounterId,
        ) -> FlywayResult<Option<flyway_core::Conversation>> {
            self.0.conversation_get_by_encounter(encounter_id).await
        }
        async fn conversation_update_status(
            &self,
            id: ConversationId,
            status: ConversationStatus,
        ) -> FlywayResult<flyway_core::Conversation> {
            if status == ConversationStatus::Completed {
                return Err(StorageError::UpdateFailed {
                    entity_type: EntityType::Conversation,
                    id,
                    reason: "write rejected".to_string(),
                }
                .into());
            }
            self.0.conversation_update_status(id, status).await
        }
        async fn message_insert(&self, message: &Message) -> FlywayResult<()> {
            self.0.message_insert(message).await
        }
        async fn message_list(&self, conversation_id: ConversationId) -> FlywayResult<Vec<Message>> {
            self.0.message_list(conversation_id).await
        }
        async fn relationship_get(
            &self,
            bird_id: BirdId,
            related_bird_id: BirdId,
        ) -> FlywayResult<Option<flyway_core::Relationship>> {
            self.0.relationship_get(bird_id, related_bird_id).await
        }
        async fn relationship_upsert(&self, relationship: &flyway_core::Relationship) -> FlywayResult<()> {
            self.0.relationship_upsert(relationship).await
        }
        async fn relationship_delete_between(&self, a: BirdId, b: BirdId) -> FlywayResult<usize> {
            self.0.relationship_delete_between(a, b).await
        }
        async fn clear_social_history(&self, bird_id: BirdId) -> FlywayResult<flyway_storage::CascadeSummary> {
            self.0.clear_social_history(bird_id).await
        }
        async fn reset_birds(&self) -> FlywayResult<flyway_storage::ResetSummary> {
            self.0.reset_birds().await
        }
        async fn statistics(&self) -> FlywayResult<flyway_storage::StoreStatistics> {
            self.0.statistics().await
        }
    }

    #[tokio::test]
    async fn test_failed_completion_write_marks_failed() -> Result<(), String> {
        let h = harness().await;
        let store: Arc<dyn RecordStore> = Arc::new(RejectsCompletion(h.store.clone()));
        let credentials = CredentialManager::new(
            store.clone(),
            Arc::new(ScriptedRefresher::failing()),
            chrono::Duration::minutes(5),
        );
        let driver = ConversationDriver::new(
            store,
            h.generation.clone(),
            credentials,
            FlywayConfig::default(),
            Arc::new(FixedChance::always()),
        );

        let result = driver.run(&h.job).await;
        assert!(matches!(
            result,
            Err(FlywayError::Storage(StorageError::UpdateFailed { .. }))
        ));
        let conversation = h
            .store
            .conversation_get(h.job.conversation_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or("conversation")?;
        assert_eq!(conversation.status, ConversationStatus::Failed);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_reply_fails_conversation() {
        let h = harness().await;
        h.generation.push_reply("   ");
        let result = driver(&h, FixedChance::never()).run(&h.job).await;
        assert!(matches!(
            result,
            Err(FlywayError::Conversation(ConversationError::EmptyReply { round: 1, .. }))
        ));
    }

    #[tokio::test]
    async fn test_second_run_is_not_runnable() {
        let h = harness().await;
        let driver = driver(&h, FixedChance::always());
        driver.run(&h.job).await.unwrap();

        let again = driver.run(&h.job).await;
        assert!(matches!(
            again,
            Err(FlywayError::Conversation(ConversationError::NotRunnable { .. }))
        ));
        let conversation = h.store.conversation_get(h.job.conversation_id).await.unwrap().unwrap();
        assert_eq!(conversation.status, ConversationStatus::Completed);
    }
}
