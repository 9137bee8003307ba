//! Bird lifecycle: first assignment, species switch, location refresh.

use crate::chance::{pick, Chance};
use crate::credentials::CredentialManager;
use flyway_core::{
    all_species, find_species, locate, Bird, EntityType, FlywayError, FlywayResult, Location,
    Species, StorageError, User, UserId, ValidationError,
};
use flyway_llm::GenerationService;
use flyway_storage::{CascadeSummary, RecordStore};
use serde::Serialize;
use std::sync::Arc;

/// Where `species` is during `month` (current month when `None`).
pub fn location_for(species: &Species, month: Option<u32>) -> FlywayResult<Location> {
    locate(species, month).map(Location::from)
}

/// What a species is doing during `month`, if the species is known.
pub fn current_activity(species_id: &str, month: Option<u32>) -> Option<String> {
    let species = find_species(species_id)?;
    locate(species, month).ok().map(|w| w.activity.clone())
}

/// Species whose trait list best matches `tags`.
///
/// A trait matches a tag when either contains the other (ignoring case).
/// Ties go to the earlier catalog entry; no match at all picks at random.
pub fn assign_species(tags: &[String], chance: &dyn Chance) -> FlywayResult<&'static Species> {
    let lowered: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();
    let mut best: Option<(&'static Species, usize)> = None;
    for species in all_species() {
        let matches = species
            .personality
            .iter()
            .filter(|p| {
                let p = p.to_lowercase();
                lowered
                    .iter()
                    .any(|t| !t.is_empty() && (t.contains(&p) || p.contains(t.as_str())))
            })
            .count();
        if matches > best.map_or(0, |(_, n)| n) {
            best = Some((species, matches));
        }
    }

    match best {
        Some((species, _)) => Ok(species),
        None => pick(chance, all_species()).ok_or_else(|| {
            FlywayError::Validation(ValidationError::UnknownSpecies {
                species_id: "<empty catalog>".to_string(),
            })
        }),
    }
}

/// Result of a species switch.
#[derive(Debug, Clone, Serialize)]
pub struct SpeciesSwitch {
    pub bird: Bird,
    /// Social history removed because the bird changed species
    pub cleared: CascadeSummary,
}

/// Operations on a user's single bird.
pub struct BirdService {
    store: Arc<dyn RecordStore>,
    generation: Arc<dyn GenerationService>,
    credentials: CredentialManager,
    chance: Arc<dyn Chance>,
}

impl BirdService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        generation: Arc<dyn GenerationService>,
        credentials: CredentialManager,
        chance: Arc<dyn Chance>,
    ) -> Self {
        Self {
            store,
            generation,
            credentials,
            chance,
        }
    }

    async fn user(&self, user_id: UserId) -> FlywayResult<User> {
        self.store
            .user_get(user_id)
            .await?
            .ok_or(FlywayError::Storage(StorageError::NotFound {
                entity_type: EntityType::User,
                id: user_id,
            }))
    }

    /// The user's bird, created on first call.
    ///
    /// A new bird gets the species that best fits the owner's interest
    /// tags; if the tags cannot be fetched the choice is random.
    pub async fn ensure_bird(&self, user_id: UserId) -> FlywayResult<Bird> {
        if let Some(bird) = self.store.bird_get_by_user(user_id).await? {
            return self.refresh_location(bird).await;
        }
        let user = self.user(user_id).await?;

        let tags = match self.credentials.get_valid_access_token(user_id).await {
            Ok(token) => self.generation.interest_tags(&token).await.unwrap_or_else(|e| {
                tracing::warn!(%user_id, error = %e, "Interest tags unavailable, assigning at random");
                Vec::new()
            }),
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "No usable token for interest tags");
                Vec::new()
            }
        };

        let species = assign_species(&tags, self.chance.as_ref())?;
        self.store.species_upsert(species).await?;
        let bird = Bird::new(
            user_id,
            species,
            user.name.as_deref(),
            location_for(species, None)?,
        )
        .with_preferences(tags);
        self.store.bird_insert(&bird).await?;
        tracing::info!(%user_id, bird_id = %bird.bird_id, species = %species.id, "Bird assigned");
        Ok(bird)
    }

    /// Turn the user's bird into `species_id`, clearing its social history.
    ///
    /// Creates the bird if the user has none yet.
    pub async fn switch_species(&self, user_id: UserId, species_id: &str) -> FlywayResult<SpeciesSwitch> {
        let species = find_species(species_id).ok_or_else(|| {
            FlywayError::Validation(ValidationError::UnknownSpecies {
                species_id: species_id.to_string(),
            })
        })?;
        let user = self.user(user_id).await?;
        self.store.species_upsert(species).await?;
        let location = location_for(species, None)?;

        match self.store.bird_get_by_user(user_id).await? {
            Some(existing) => {
                let cleared = self.store.clear_social_history(existing.bird_id).await?;
                let fresh = Bird::new(user_id, species, user.name.as_deref(), location);
                let bird = Bird {
                    bird_id: existing.bird_id,
                    preferences: existing.preferences,
                    created_at: existing.created_at,
                    ..fresh
                };
                self.store.bird_update(&bird).await?;
                tracing::info!(
                    %user_id,
                    bird_id = %bird.bird_id,
                    species = %species.id,
                    encounters_cleared = cleared.encounters,
                    relationships_cleared = cleared.relationships,
                    "Bird switched species"
                );
                Ok(SpeciesSwitch { bird, cleared })
            }
            None => {
                let bird = Bird::new(user_id, species, user.name.as_deref(), location);
                self.store.bird_insert(&bird).await?;
                tracing::info!(%user_id, bird_id = %bird.bird_id, species = %species.id, "Bird created by switch");
                Ok(SpeciesSwitch {
                    bird,
                    cleared: CascadeSummary::default(),
                })
            }
        }
    }

    /// The user's bird with its location recomputed for this month.
    pub async fn view_bird(&self, user_id: UserId) -> FlywayResult<Bird> {
        let bird = self
            .store
            .bird_get_by_user(user_id)
            .await?
            .ok_or(FlywayError::Storage(StorageError::NotFound {
                entity_type: EntityType::Bird,
                id: user_id,
            }))?;
        self.refresh_location(bird).await
    }

    /// Move `bird` to its species' waypoint for the current month and persist.
    ///
    /// A bird of an unknown species keeps its stored location.
    pub async fn refresh_location(&self, bird: Bird) -> FlywayResult<Bird> {
        relocate(self.store.as_ref(), bird, None).await
    }
}

impl std::fmt::Debug for BirdService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BirdService").finish_non_exhaustive()
    }
}

/// Recompute and persist `bird`'s location for `month`.
pub(crate) async fn relocate(
    store: &dyn RecordStore,
    mut bird: Bird,
    month: Option<u32>,
) -> FlywayResult<Bird> {
    let Some(species) = find_species(&bird.species_id) else {
        tracing::debug!(bird_id = %bird.bird_id, species = %bird.species_id, "Unknown species, location kept");
        return Ok(bird);
    };
    let location = location_for(species, month)?;
    if location != bird.location {
        store.bird_update_location(bird.bird_id, &location).await?;
        bird.location = location;
    }
    Ok(bird)
}
