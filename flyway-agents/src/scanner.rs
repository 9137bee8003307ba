//! Encounter scanner.
//!
//! Finds co-located pairs of birds, scores them and turns qualifying pairs
//! into an encounter plus a pending conversation. The conversation itself
//! is handed to the dispatch queue; a sweep never waits for it.

use crate::affinity::{self, AffinityProfile};
use crate::birds::{current_activity, relocate};
use crate::chance::{pick, Chance};
use crate::conversation::{words, ConversationContext};
use crate::credentials::CredentialManager;
use crate::dispatch::{ConversationJob, ConversationQueue};
use flyway_core::{
    current_month, unordered_pair, Bird, BirdId, Conversation, ConversationError, ConversationId,
    ConversationStatus, Encounter, EncounterId, EntityType, FlywayConfig, FlywayError, FlywayResult,
    StorageError, UserId,
};
use flyway_llm::GenerationService;
use flyway_storage::RecordStore;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

const SWEEP_WEATHER: &[&str] = &["sunny", "cloudy", "breezy", "misty", "bright sunshine"];
const ON_DEMAND_WEATHER: &[&str] = &["sunny", "cloudy", "breezy", "misty", "bright sunshine", "crisp"];

const WATER_SCENES: &[&str] = &[
    "on the shimmering water",
    "beside the reeds",
    "on the shallows",
    "by a clear lakeshore",
];
const GRASSLAND_SCENES: &[&str] = &["on the open grassland", "among green grass", "among wildflowers"];
const QUIET_SCENES: &[&str] = &["in a quiet corner", "in warm sunshine", "in a gentle breeze"];

/// Whole words of a place name that mark it as water or grassland.
const WATER_WORDS: &[&str] = &["lake", "sea", "coast", "bay"];
const GRASSLAND_WORDS: &[&str] = &["grassland", "steppe", "plateau", "meadow"];

const SCENE_TEMPLATES: &[&str] = &[
    "Lush water plants line the lake, and the light glitters on its surface",
    "Sunlight filters through the woods and dapples the ground",
    "Reeds sway across the wetland, and birdsong drifts now and then",
    "A breeze sweeps over the grassland, carrying scents from far away",
    "Mist curls through the valley like a dream",
];

/// Which sweep produced an encounter; selects the flavor vocabularies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepMode {
    /// Every pair of birds, on a schedule
    Full,
    /// One bird against all others, on request
    OnDemand,
}

/// Scene for a full-sweep encounter, chosen by the kind of place.
pub fn place_scene(place: &str, chance: &dyn Chance) -> String {
    let place_words = words(place);
    let pool = if mentions_any(&place_words, WATER_WORDS) {
        WATER_SCENES
    } else if mentions_any(&place_words, GRASSLAND_WORDS) {
        GRASSLAND_SCENES
    } else {
        QUIET_SCENES
    };
    pick(chance, pool).copied().unwrap_or_default().to_string()
}

fn mentions_any(place_words: &[String], marks: &[&str]) -> bool {
    place_words.iter().any(|w| marks.contains(&w.as_str()))
}

fn flavor(mode: SweepMode, place: &str, chance: &dyn Chance) -> (String, String) {
    match mode {
        SweepMode::Full => (
            pick(chance, SWEEP_WEATHER).copied().unwrap_or_default().to_string(),
            place_scene(place, chance),
        ),
        SweepMode::OnDemand => (
            pick(chance, ON_DEMAND_WEATHER).copied().unwrap_or_default().to_string(),
            pick(chance, SCENE_TEMPLATES).copied().unwrap_or_default().to_string(),
        ),
    }
}

/// One encounter created by a sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EncounterSummary {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub encounter_id: EncounterId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub conversation_id: ConversationId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub bird_id: BirdId,
    pub bird_name: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub met_bird_id: BirdId,
    pub met_bird_name: String,
    pub location: String,
    pub attraction_score: u32,
    pub breakdown: affinity::AffinityBreakdown,
    pub weather: Option<String>,
    pub scene: Option<String>,
}

/// What a sweep did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SweepReport {
    pub new_encounters: Vec<EncounterSummary>,
    pub total_birds: usize,
    /// Distinct pairs looked at, whether or not they met
    pub checked_pairs: usize,
    /// Pairs skipped because of an error
    pub failed_pairs: usize,
}

/// Interest tags per bird, fetched at most once per sweep.
#[derive(Default)]
struct TagCache {
    tags: HashMap<BirdId, Vec<String>>,
}

pub struct EncounterScanner {
    store: Arc<dyn RecordStore>,
    generation: Arc<dyn GenerationService>,
    credentials: CredentialManager,
    queue: ConversationQueue,
    config: FlywayConfig,
    chance: Arc<dyn Chance>,
}

impl EncounterScanner {
    pub fn new(
        store: Arc<dyn RecordStore>,
        generation: Arc<dyn GenerationService>,
        credentials: CredentialManager,
        queue: ConversationQueue,
        config: FlywayConfig,
        chance: Arc<dyn Chance>,
    ) -> Self {
        Self {
            store,
            generation,
            credentials,
            queue,
            config,
            chance,
        }
    }

    /// Compare every pair of birds once.
    pub async fn sweep_all(&self) -> FlywayResult<SweepReport> {
        let birds = self.store.bird_list().await?;
        let mut report = SweepReport {
            total_birds: birds.len(),
            ..SweepReport::default()
        };
        if birds.len() < 2 {
            tracing::debug!(total_birds = birds.len(), "Not enough birds for a sweep");
            return Ok(report);
        }

        let month = current_month();
        let birds = self.relocate_all(birds, month).await;
        let mut tags = TagCache::default();
        let mut seen: HashSet<(BirdId, BirdId)> = HashSet::new();

        for (i, a) in birds.iter().enumerate() {
            for b in &birds[i + 1..] {
                if !seen.insert(unordered_pair(a.bird_id, b.bird_id)) {
                    continue;
                }
                report.checked_pairs += 1;
                self.record(
                    self.evaluate_pair(a, b, month, SweepMode::Full, &mut tags).await,
                    a,
                    b,
                    &mut report,
                );
            }
        }

        tracing::info!(
            total_birds = report.total_birds,
            checked_pairs = report.checked_pairs,
            new_encounters = report.new_encounters.len(),
            failed_pairs = report.failed_pairs,
            "Full sweep finished"
        );
        Ok(report)
    }

    /// Compare the user's bird against every other bird.
    pub async fn sweep_for_user(&self, user_id: UserId) -> FlywayResult<SweepReport> {
        let bird = self
            .store
            .bird_get_by_user(user_id)
            .await?
            .ok_or(FlywayError::Storage(StorageError::NotFound {
                entity_type: EntityType::Bird,
                id: user_id,
            }))?;
        self.sweep_for_bird(bird.bird_id).await
    }

    /// Compare one bird against every other bird.
    pub async fn sweep_for_bird(&self, bird_id: BirdId) -> FlywayResult<SweepReport> {
        let month = current_month();
        let me = self
            .store
            .bird_get(bird_id)
            .await?
            .ok_or(FlywayError::Storage(StorageError::NotFound {
                entity_type: EntityType::Bird,
                id: bird_id,
            }))?;
        let me = relocate(self.store.as_ref(), me, Some(month)).await?;

        let others: Vec<Bird> = self
            .store
            .bird_list()
            .await?
            .into_iter()
            .filter(|b| b.bird_id != bird_id)
            .collect();
        let others = self.relocate_all(others, month).await;

        let mut report = SweepReport {
            total_birds: others.len() + 1,
            ..SweepReport::default()
        };
        let mut tags = TagCache::default();
        for other in &others {
            report.checked_pairs += 1;
            self.record(
                self.evaluate_pair(&me, other, month, SweepMode::OnDemand, &mut tags).await,
                &me,
                other,
                &mut report,
            );
        }

        tracing::info!(
            %bird_id,
            checked_pairs = report.checked_pairs,
            new_encounters = report.new_encounters.len(),
            "On-demand sweep finished"
        );
        Ok(report)
    }

    fn record(
        &self,
        result: FlywayResult<Option<EncounterSummary>>,
        a: &Bird,
        b: &Bird,
        report: &mut SweepReport,
    ) {
        match result {
            Ok(Some(summary)) => report.new_encounters.push(summary),
            Ok(None) => {}
            Err(e) => {
                report.failed_pairs += 1;
                tracing::warn!(
                    bird_id = %a.bird_id,
                    other_bird_id = %b.bird_id,
                    error = %e,
                    "Pair skipped"
                );
            }
        }
    }

    async fn relocate_all(&self, birds: Vec<Bird>, month: u32) -> Vec<Bird> {
        let mut moved = Vec::with_capacity(birds.len());
        for bird in birds {
            let fallback = bird.clone();
            match relocate(self.store.as_ref(), bird, Some(month)).await {
                Ok(bird) => moved.push(bird),
                Err(e) => {
                    tracing::warn!(bird_id = %fallback.bird_id, error = %e, "Location refresh failed");
                    moved.push(fallback);
                }
            }
        }
        moved
    }

    /// Run the admission checks for `a` meeting `b`; `a` is the initiator.
    async fn evaluate_pair(
        &self,
        a: &Bird,
        b: &Bird,
        month: u32,
        mode: SweepMode,
        tags: &mut TagCache,
    ) -> FlywayResult<Option<EncounterSummary>> {
        let distance = a.location.distance_to(&b.location);
        if distance > self.config.encounter_distance {
            tracing::trace!(bird_id = %a.bird_id, other_bird_id = %b.bird_id, distance, "Too far apart");
            return Ok(None);
        }

        let since = chrono::Utc::now() - self.config.dedup_window_chrono();
        if self
            .store
            .encounter_find_recent_between(a.bird_id, b.bird_id, since)
            .await?
            .is_some()
        {
            tracing::debug!(bird_id = %a.bird_id, other_bird_id = %b.bird_id, "Met recently");
            return Ok(None);
        }

        let tags_a = self.tags_for(a, tags).await;
        let tags_b = self.tags_for(b, tags).await;
        let scored = affinity::score(
            &AffinityProfile {
                tags: &tags_a,
                traits: &a.personality,
                species_id: &a.species_id,
            },
            &AffinityProfile {
                tags: &tags_b,
                traits: &b.personality,
                species_id: &b.species_id,
            },
            distance,
        );
        if scored.score < self.config.conversation_threshold {
            tracing::debug!(
                bird_id = %a.bird_id,
                other_bird_id = %b.bird_id,
                score = scored.score,
                "Below conversation threshold"
            );
            return Ok(None);
        }

        let (weather, scene) = flavor(mode, &a.location.place, self.chance.as_ref());
        let encounter = Encounter::new(a.bird_id, b.bird_id, &a.location)
            .with_weather(weather)
            .with_scene(scene);
        let conversation = Conversation::pending(encounter.encounter_id, scored.score);
        self.store
            .encounter_create_with_conversation(&encounter, &conversation)
            .await?;
        tracing::info!(
            encounter_id = %encounter.encounter_id,
            bird_id = %a.bird_id,
            other_bird_id = %b.bird_id,
            score = scored.score,
            "Encounter created"
        );

        let context = ConversationContext {
            location: a.location.place.clone(),
            activity: current_activity(&a.species_id, Some(month)).unwrap_or_else(|| "resting".to_string()),
            weather: encounter.weather.clone(),
            scene: encounter.scene.clone(),
        };
        let dispatched = self.queue.enqueue(ConversationJob {
            conversation_id: conversation.conversation_id,
            initiator: a.bird_id,
            responder: b.bird_id,
            context,
        });
        if !dispatched {
            self.store
                .conversation_update_status(conversation.conversation_id, ConversationStatus::Failed)
                .await?;
            return Err(ConversationError::QueueClosed {
                conversation_id: conversation.conversation_id,
            }
            .into());
        }

        Ok(Some(EncounterSummary {
            encounter_id: encounter.encounter_id,
            conversation_id: conversation.conversation_id,
            bird_id: a.bird_id,
            bird_name: a.name.clone(),
            met_bird_id: b.bird_id,
            met_bird_name: b.name.clone(),
            location: encounter.location,
            attraction_score: scored.score,
            breakdown: scored.breakdown,
            weather: encounter.weather,
            scene: encounter.scene,
        }))
    }

    /// Interest tags for `bird`'s owner; any failure yields no tags.
    async fn tags_for(&self, bird: &Bird, cache: &mut TagCache) -> Vec<String> {
        if let Some(cached) = cache.tags.get(&bird.bird_id) {
            return cached.clone();
        }
        let fetched = match self.credentials.get_valid_access_token(bird.user_id).await {
            Ok(token) => self.generation.interest_tags(&token).await,
            Err(e) => Err(e),
        };
        let tags = fetched.unwrap_or_else(|e| {
            tracing::warn!(bird_id = %bird.bird_id, error = %e, "Interest tags unavailable");
            Vec::new()
        });
        cache.tags.insert(bird.bird_id, tags.clone());
        tags
    }
}

impl std::fmt::Debug for EncounterScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncounterScanner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chance::FixedChance;
    use crate::dispatch::ConversationInbox;
    use flyway_storage::InMemoryStore;
    use flyway_test_utils::{fixtures, ScriptedGeneration, ScriptedRefresher};

    struct Harness {
        store: Arc<InMemoryStore>,
        generation: Arc<ScriptedGeneration>,
        scanner: EncounterScanner,
        inbox: ConversationInbox,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryStore::new());
        let generation = Arc::new(ScriptedGeneration::new());
        let credentials = CredentialManager::new(
            store.clone(),
            Arc::new(ScriptedRefresher::failing()),
            chrono::Duration::minutes(5),
        );
        let (queue, inbox) = ConversationQueue::channel();
        let scanner = EncounterScanner::new(
            store.clone(),
            generation.clone(),
            credentials,
            queue,
            FlywayConfig::default(),
            Arc::new(FixedChance::always()),
        );
        Harness {
            store,
            generation,
            scanner,
            inbox,
        }
    }

    /// Two birds of `species` at the species' current waypoint.
    async fn pair(h: &Harness, species: &str) -> (Bird, Bird) {
        let at = crate::birds::location_for(fixtures::species(species), None).unwrap();
        let (_, a) = fixtures::seed_bird(h.store.as_ref(), "ada", species, at.clone()).await.unwrap();
        let (_, b) = fixtures::seed_bird(h.store.as_ref(), "bo", species, at).await.unwrap();
        (a, b)
    }

    #[test]
    fn test_place_scene_by_kind_of_place() {
        let chance = FixedChance::always();
        assert_eq!(place_scene("Dianchi Lake, Kunming", &chance), WATER_SCENES[0]);
        assert_eq!(place_scene("Bayanbulak Grassland, Xinjiang", &chance), GRASSLAND_SCENES[0]);
        assert_eq!(place_scene("Nagqu, Tibet", &chance), QUIET_SCENES[0]);
    }

    #[test]
    fn test_place_scene_matches_whole_words_only() {
        let chance = FixedChance::always();
        assert_eq!(place_scene("Ross Sea Coast, Antarctica", &chance), WATER_SCENES[0]);
        assert_eq!(place_scene("Yushu Plateau, Qinghai", &chance), GRASSLAND_SCENES[0]);
        // "Bay" and "Sea" inside longer names are not water
        assert_eq!(place_scene("Bayanbulak, Xinjiang", &chance), QUIET_SCENES[0]);
        assert_eq!(place_scene("Seattle", &chance), QUIET_SCENES[0]);
    }

    #[test]
    fn test_on_demand_flavor_uses_templates() {
        let (weather, scene) = flavor(SweepMode::OnDemand, "Nagqu, Tibet", &FixedChance::never());
        assert_eq!(weather, "crisp");
        assert_eq!(scene, SCENE_TEMPLATES[4]);
    }

    #[tokio::test]
    async fn test_single_bird_sweep_is_empty_success() -> Result<(), String> {
        let h = harness();
        let at = fixtures::location(1.0, 1.0, "Somewhere");
        fixtures::seed_bird(h.store.as_ref(), "solo", "mute-swan", at)
            .await
            .map_err(|e| e.to_string())?;
        let report = h.scanner.sweep_all().await.map_err(|e| e.to_string())?;
        assert_eq!(report.total_birds, 1);
        assert_eq!(report.checked_pairs, 0);
        assert!(report.new_encounters.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_closed_queue_fails_the_new_conversation() -> Result<(), String> {
        let mut h = harness();
        // the dispatcher's end of the queue goes away
        drop(std::mem::replace(&mut h.inbox, ConversationQueue::channel().1));
        let (a, _) = pair(&h, "mute-swan").await;
        h.generation.set_tags("ada", ["nature", "photography", "lakes"]);
        h.generation.set_tags("bo", ["nature", "photography", "lakes"]);

        let report = h.scanner.sweep_all().await.map_err(|e| e.to_string())?;
        assert!(report.new_encounters.is_empty());
        assert_eq!(report.failed_pairs, 1);

        let encounters = h
            .store
            .encounter_list_for_bird(a.bird_id, 10)
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(encounters.len(), 1);
        let conversation = h
            .store
            .conversation_get_by_encounter(encounters[0].encounter_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or("conversation")?;
        assert_eq!(conversation.status, ConversationStatus::Failed);
        Ok(())
    }

    #[tokio::test]
    async fn test_low_affinity_pair_creates_nothing() -> Result<(), String> {
        let mut h = harness();
        let (a, b) = pair(&h, "mute-swan").await;
        for mut bird in [a, b] {
            bird.personality.clear();
            h.store.bird_update(&bird).await.map_err(|e| e.to_string())?;
        }
        h.generation.set_tags("ada", ["nature"]);
        h.generation.set_tags("bo", ["nature"]);

        // 8 + 10 (no traits) + 15 + 10 = 43
        let report = h.scanner.sweep_all().await.map_err(|e| e.to_string())?;
        assert_eq!(report.checked_pairs, 1);
        assert!(report.new_encounters.is_empty());
        assert!(h.inbox.try_recv().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_qualifying_pair_gets_pending_conversation_and_job() -> Result<(), String> {
        let mut h = harness();
        let (a, b) = pair(&h, "mute-swan").await;
        h.generation.set_tags("ada", ["nature", "photography", "lakes"]);
        h.generation.set_tags("bo", ["nature", "photography", "lakes"]);

        let report = h.scanner.sweep_all().await.map_err(|e| e.to_string())?;
        assert_eq!(report.new_encounters.len(), 1);
        let summary = &report.new_encounters[0];
        assert!(summary.attraction_score >= 60);
        assert!(summary.weather.is_some());

        let conversation = h
            .store
            .conversation_get(summary.conversation_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or("conversation")?;
        assert_eq!(conversation.status, ConversationStatus::Pending);
        assert_eq!(conversation.attraction_score, summary.attraction_score);

        let job = h.inbox.try_recv().ok_or("job")?;
        assert_eq!(job.conversation_id, summary.conversation_id);
        assert!(job.initiator == a.bird_id || job.initiator == b.bird_id);
        assert_eq!(job.context.location, summary.location);
        Ok(())
    }

    #[tokio::test]
    async fn test_second_sweep_within_window_is_deduplicated() -> Result<(), String> {
        let h = harness();
        pair(&h, "mute-swan").await;
        h.generation.set_tags("ada", ["nature", "photography", "lakes"]);
        h.generation.set_tags("bo", ["nature", "photography", "lakes"]);

        let first = h.scanner.sweep_all().await.map_err(|e| e.to_string())?;
        assert_eq!(first.new_encounters.len(), 1);
        let second = h.scanner.sweep_all().await.map_err(|e| e.to_string())?;
        assert!(second.new_encounters.is_empty());
        assert_eq!(second.checked_pairs, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_tag_failure_degrades_to_empty_tags() -> Result<(), String> {
        let h = harness();
        pair(&h, "mute-swan").await;
        h.generation.fail_tags_for("ada");
        h.generation.set_tags("bo", ["nature"]);

        // 10 (empty tags) + 30 + 15 + 10 = 65
        let report = h.scanner.sweep_all().await.map_err(|e| e.to_string())?;
        assert_eq!(report.failed_pairs, 0);
        assert_eq!(report.new_encounters.len(), 1);
        assert_eq!(report.new_encounters[0].breakdown.tag_match, 10);
        Ok(())
    }

    #[tokio::test]
    async fn test_distant_birds_never_meet() -> Result<(), String> {
        let h = harness();
        let near = fixtures::location(0.0, 0.0, "Nowhere");
        fixtures::seed_bird(h.store.as_ref(), "ada", "red-crowned-crane", near.clone())
            .await
            .map_err(|e| e.to_string())?;
        fixtures::seed_bird(h.store.as_ref(), "bo", "black-necked-crane", near)
            .await
            .map_err(|e| e.to_string())?;

        // Locations are recomputed from the route tables; the two cranes stay
        // more than 14 degrees of longitude apart all year.
        let report = h.scanner.sweep_all().await.map_err(|e| e.to_string())?;
        assert!(report.new_encounters.is_empty());
        assert_eq!(h.generation.tag_calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_on_demand_sweep_initiates_from_caller() -> Result<(), String> {
        let mut h = harness();
        let (a, b) = pair(&h, "mute-swan").await;
        h.generation.set_tags("ada", ["nature", "photography", "lakes"]);
        h.generation.set_tags("bo", ["nature", "photography", "lakes"]);

        let report = h
            .scanner
            .sweep_for_user(b.user_id)
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(report.total_birds, 2);
        assert_eq!(report.checked_pairs, 1);
        assert_eq!(report.new_encounters.len(), 1);
        assert_eq!(report.new_encounters[0].bird_id, b.bird_id);
        assert_eq!(report.new_encounters[0].met_bird_id, a.bird_id);
        assert!(SCENE_TEMPLATES.contains(&report.new_encounters[0].scene.as_deref().unwrap_or("")));

        let job = h.inbox.try_recv().ok_or("job")?;
        assert_eq!(job.initiator, b.bird_id);
        Ok(())
    }
}
