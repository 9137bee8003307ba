//! Row codec for the storage boundary.
//!
//! Birds keep their traits and interest tags as `Vec<String>` in memory. At
//! rest, personality is a single `、`-joined string and preferences are a JSON
//! document `{"traits": [...]}`. Anything that fails to parse decodes to an
//! empty collection.

use flyway_core::{Bird, BirdId, Location, Timestamp, UserId};
use serde::Deserialize;

/// Separator used for the flat personality column.
pub const TRAIT_SEPARATOR: &str = "、";

/// Join trait labels into the flat personality column.
pub fn join_traits(traits: &[String]) -> String {
    traits.join(TRAIT_SEPARATOR)
}

/// Split the flat personality column, dropping blank entries.
pub fn split_traits(raw: &str) -> Vec<String> {
    raw.split(TRAIT_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Encode interest tags as the preferences document.
pub fn encode_preferences(tags: &[String]) -> String {
    serde_json::json!({ "traits": tags }).to_string()
}

#[derive(Deserialize)]
struct PreferencesDoc {
    #[serde(default)]
    traits: Option<Vec<String>>,
    #[serde(default)]
    shades: Option<Vec<String>>,
}

/// Decode the preferences document. Older rows used a `shades` key.
pub fn decode_preferences(raw: &str) -> Vec<String> {
    match serde_json::from_str::<PreferencesDoc>(raw) {
        Ok(doc) => doc.traits.or(doc.shades).unwrap_or_default(),
        Err(_) => Vec::new(),
    }
}

/// A bird as it sits in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct BirdRow {
    pub bird_id: BirdId,
    pub user_id: UserId,
    pub species_id: String,
    pub name: String,
    pub personality: String,
    pub preferences: String,
    pub current_lat: f64,
    pub current_lng: f64,
    pub current_location: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&Bird> for BirdRow {
    fn from(bird: &Bird) -> Self {
        Self {
            bird_id: bird.bird_id,
            user_id: bird.user_id,
            species_id: bird.species_id.clone(),
            name: bird.name.clone(),
            personality: join_traits(&bird.personality),
            preferences: encode_preferences(&bird.preferences),
            current_lat: bird.location.lat,
            current_lng: bird.location.lng,
            current_location: bird.location.place.clone(),
            created_at: bird.created_at,
            updated_at: bird.updated_at,
        }
    }
}

impl From<&BirdRow> for Bird {
    fn from(row: &BirdRow) -> Self {
        Self {
            bird_id: row.bird_id,
            user_id: row.user_id,
            species_id: row.species_id.clone(),
            name: row.name.clone(),
            personality: split_traits(&row.personality),
            preferences: decode_preferences(&row.preferences),
            location: Location {
                lat: row.current_lat,
                lng: row.current_lng,
                place: row.current_location.clone(),
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
