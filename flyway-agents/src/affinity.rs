//! Affinity scoring between two birds.
//!
//! The score is the plain sum of four capped components: interest tags
//! (0-40), personality traits (0-30), species (5, 12 or 15) and distance
//! (0, 4, 7 or 10). Both lookup tables below are hand-curated and not
//! symmetric; lookups check both directions where noted.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const TAG_MATCH_MAX: u32 = 40;
pub const TRAIT_MATCH_MAX: u32 = 30;
/// Component value used when either side has no tags / no traits.
pub const EMPTY_SET_DEFAULT: u32 = 10;

const TAG_EXACT: u32 = 8;
const TAG_PARTIAL: u32 = 4;
const TRAIT_EXACT: u32 = 8;
const TRAIT_COMPATIBLE: u32 = 5;

const SAME_SPECIES: u32 = 15;
const AFFINE_SPECIES: u32 = 12;
const OTHER_SPECIES: u32 = 5;

/// Hard gate: birds farther apart than this (degrees) never meet.
pub const ENCOUNTER_DISTANCE: f64 = 5.0;
/// Minimum score that admits a pair into the conversation pipeline.
pub const CONVERSATION_THRESHOLD: u32 = 60;

static TRAIT_AFFINITY: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    HashMap::from([
        ("elegant", &["noble", "romantic", "elegant", "refined"][..]),
        ("sociable", &["lively", "friendly", "optimistic", "united"][..]),
        ("lively", &["sociable", "nimble", "optimistic", "curious"][..]),
        ("curious", &["lively", "clever", "adventurous", "free"][..]),
        ("loyal", &["devoted", "steadfast", "faithful", "constant"][..]),
        ("steadfast", &["loyal", "brave", "strong", "persistent"][..]),
        ("united", &["sociable", "team-spirited", "protective", "caring"][..]),
        ("steady", &["dignified", "protective", "caring"][..]),
        ("noble", &["elegant", "pure", "ethereal", "refined"][..]),
        ("romantic", &["elegant", "devoted", "faithful"][..]),
        ("devoted", &["loyal", "romantic", "faithful", "constant"][..]),
        ("nimble", &["lively", "diligent", "clever"][..]),
        ("diligent", &["nimble", "steadfast", "persistent"][..]),
        ("friendly", &["sociable", "optimistic", "caring"][..]),
        ("optimistic", &["lively", "friendly", "free"][..]),
        ("mysterious", &["independent", "clever", "sacred"][..]),
        ("independent", &["mysterious", "free", "pure"][..]),
        ("clever", &["curious", "nimble", "mysterious"][..]),
        ("free", &["adventurous", "independent", "optimistic"][..]),
        ("auspicious", &["dignified", "protective", "long-lived", "sacred"][..]),
        ("dignified", &["auspicious", "steady", "refined"][..]),
        ("protective", &["caring", "auspicious", "united"][..]),
        ("caring", &["protective", "friendly", "united"][..]),
        ("resilient", &["strong", "persistent", "brave"][..]),
        ("adventurous", &["free", "daring", "brave"][..]),
        ("persistent", &["resilient", "diligent", "constant"][..]),
        ("brave", &["strong", "adventurous", "daring"][..]),
        ("strong", &["brave", "resilient", "steadfast"][..]),
        ("daring", &["brave", "adventurous", "team-spirited"][..]),
        ("team-spirited", &["daring", "united"][..]),
        ("sacred", &["mysterious", "pure", "auspicious"][..]),
        ("faithful", &["loyal", "devoted", "constant"][..]),
        ("pure", &["noble", "sacred", "independent"][..]),
        ("long-lived", &["auspicious", "refined", "ethereal"][..]),
        ("refined", &["noble", "elegant", "long-lived", "dignified"][..]),
        ("ethereal", &["noble", "long-lived", "sacred"][..]),
        ("constant", &["devoted", "faithful", "loyal"][..]),
    ])
});

static SPECIES_AFFINITY: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    HashMap::from([
        ("red-billed-gull", &["mute-swan", "swan-goose"][..]),
        ("swan-goose", &["mute-swan", "red-billed-gull", "bar-headed-goose"][..]),
        ("mute-swan", &["swan-goose", "red-billed-gull", "red-crowned-crane"][..]),
        ("barn-swallow", &["common-cuckoo"][..]),
        ("common-cuckoo", &["barn-swallow"][..]),
        ("white-stork", &["red-crowned-crane", "black-necked-crane"][..]),
        ("arctic-tern", &["red-billed-gull"][..]),
        ("bar-headed-goose", &["swan-goose", "black-necked-crane"][..]),
        ("black-necked-crane", &["red-crowned-crane", "white-stork", "bar-headed-goose"][..]),
        ("red-crowned-crane", &["black-necked-crane", "white-stork", "mute-swan"][..]),
    ])
});

/// One side of a scoring call.
#[derive(Debug, Clone, Copy)]
pub struct AffinityProfile<'a> {
    pub tags: &'a [String],
    pub traits: &'a [String],
    pub species_id: &'a str,
}

/// Per-component contributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AffinityBreakdown {
    pub tag_match: u32,
    pub trait_match: u32,
    pub species_affinity: u32,
    pub location_bonus: u32,
}

impl AffinityBreakdown {
    pub fn total(&self) -> u32 {
        self.tag_match + self.trait_match + self.species_affinity + self.location_bonus
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AffinityScore {
    pub score: u32,
    pub breakdown: AffinityBreakdown,
    /// Distance gate, independent of `score`
    pub can_encounter: bool,
}

/// Score a pair of birds `distance` degrees apart.
pub fn score(a: &AffinityProfile<'_>, b: &AffinityProfile<'_>, distance: f64) -> AffinityScore {
    let breakdown = AffinityBreakdown {
        tag_match: tag_match(a.tags, b.tags),
        trait_match: trait_match(a.traits, b.traits),
        species_affinity: species_affinity(a.species_id, b.species_id),
        location_bonus: location_bonus(distance),
    };
    AffinityScore {
        score: breakdown.total(),
        breakdown,
        can_encounter: can_encounter(distance),
    }
}

/// Fuzzy interest overlap. Every pair across the two sets is compared,
/// case-insensitively: equal scores 8, containment either way scores 4.
pub fn tag_match(a: &[String], b: &[String]) -> u32 {
    if a.is_empty() || b.is_empty() {
        return EMPTY_SET_DEFAULT;
    }
    let b_lower: Vec<String> = b.iter().map(|t| t.to_lowercase()).collect();
    let mut total = 0u32;
    for left in a.iter().map(|t| t.to_lowercase()) {
        for right in &b_lower {
            if left == *right {
                total += TAG_EXACT;
            } else if left.contains(right.as_str()) || right.contains(left.as_str()) {
                total += TAG_PARTIAL;
            }
        }
        if total >= TAG_MATCH_MAX {
            break;
        }
    }
    total.min(TAG_MATCH_MAX)
}

/// Personality overlap. A trait of `a` that `b` also has scores 8 and skips
/// the table; otherwise each of `b`'s traits listed as compatible with it
/// scores 5.
pub fn trait_match(a: &[String], b: &[String]) -> u32 {
    if a.is_empty() || b.is_empty() {
        return EMPTY_SET_DEFAULT;
    }
    let mut total = 0u32;
    for left in a {
        if b.contains(left) {
            total += TRAIT_EXACT;
            continue;
        }
        let compatible = TRAIT_AFFINITY.get(left.as_str()).copied().unwrap_or(&[]);
        total += b
            .iter()
            .filter(|right| compatible.contains(&right.as_str()))
            .count() as u32
            * TRAIT_COMPATIBLE;
    }
    total.min(TRAIT_MATCH_MAX)
}

/// 15 for the same species, 12 if either lists the other, 5 otherwise.
pub fn species_affinity(a: &str, b: &str) -> u32 {
    if a == b {
        return SAME_SPECIES;
    }
    let lists = |from: &str, to: &str| {
        SPECIES_AFFINITY
            .get(from)
            .is_some_and(|list| list.contains(&to))
    };
    if lists(a, b) || lists(b, a) {
        AFFINE_SPECIES
    } else {
        OTHER_SPECIES
    }
}

pub fn location_bonus(distance: f64) -> u32 {
    if distance <= 1.0 {
        10
    } else if distance <= 3.0 {
        7
    } else if distance <= ENCOUNTER_DISTANCE {
        4
    } else {
        0
    }
}

pub fn can_encounter(distance: f64) -> bool {
    distance <= ENCOUNTER_DISTANCE
}

pub fn should_trigger_conversation(score: u32) -> bool {
    score >= CONVERSATION_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use flyway_core::all_species;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_tag_match_exact_and_partial() {
        let a = strings(&["Photography", "hiking"]);
        let b = strings(&["photography", "night hiking"]);
        // photography == photography (8), hiking inside "night hiking" (4)
        assert_eq!(tag_match(&a, &b), 12);
    }

    #[test]
    fn test_tag_match_defaults_when_empty() {
        assert_eq!(tag_match(&[], &strings(&["x"])), EMPTY_SET_DEFAULT);
        assert_eq!(tag_match(&strings(&["x"]), &[]), EMPTY_SET_DEFAULT);
    }

    #[test]
    fn test_tag_match_is_capped() {
        let a = strings(&["a", "b", "c", "d", "e", "f"]);
        assert_eq!(tag_match(&a, &a), TAG_MATCH_MAX);
    }

    #[test]
    fn test_trait_match_exact_skips_table() {
        // "elegant" is in its own compatibility list; exact match must only count once
        let a = strings(&["elegant"]);
        let b = strings(&["elegant"]);
        assert_eq!(trait_match(&a, &b), 8);
    }

    #[test]
    fn test_trait_match_uses_table_of_left_side() {
        // steady -> dignified is listed; dignified -> steady is listed too
        assert_eq!(trait_match(&strings(&["steady"]), &strings(&["dignified"])), 5);
        // curious lists adventurous, adventurous does not list curious
        assert_eq!(trait_match(&strings(&["curious"]), &strings(&["adventurous"])), 5);
        assert_eq!(trait_match(&strings(&["adventurous"]), &strings(&["curious"])), 0);
        // neither lists the other
        assert_eq!(trait_match(&strings(&["united"]), &strings(&["daring"])), 0);
        assert_eq!(trait_match(&strings(&["daring"]), &strings(&["united"])), 0);
    }

    #[test]
    fn test_trait_match_capped() {
        let swan = strings(&["noble", "elegant", "romantic", "devoted"]);
        let crane = strings(&["sacred", "elegant", "faithful", "pure"]);
        // noble: pure,elegant (10); elegant exact (8); romantic: elegant,faithful (10); devoted: faithful (5)
        assert_eq!(trait_match(&swan, &crane), TRAIT_MATCH_MAX);
    }

    #[test]
    fn test_species_affinity_values() {
        assert_eq!(species_affinity("mute-swan", "mute-swan"), 15);
        assert_eq!(species_affinity("barn-swallow", "common-cuckoo"), 12);
        // arctic-tern lists the gull, the gull does not list the tern
        assert_eq!(species_affinity("red-billed-gull", "arctic-tern"), 12);
        assert_eq!(species_affinity("arctic-tern", "red-billed-gull"), 12);
        assert_eq!(species_affinity("barn-swallow", "white-stork"), 5);
    }

    #[test]
    fn test_species_table_covers_catalog() {
        for species in all_species() {
            assert!(SPECIES_AFFINITY.contains_key(species.id.as_str()));
        }
    }

    #[test]
    fn test_trait_table_covers_catalog_traits() {
        for species in all_species() {
            for t in &species.personality {
                assert!(TRAIT_AFFINITY.contains_key(t.as_str()), "missing trait {}", t);
            }
        }
    }

    #[test]
    fn test_location_bonus_steps() {
        assert_eq!(location_bonus(0.0), 10);
        assert_eq!(location_bonus(1.0), 10);
        assert_eq!(location_bonus(2.5), 7);
        assert_eq!(location_bonus(3.0), 7);
        assert_eq!(location_bonus(5.0), 4);
        assert_eq!(location_bonus(5.0001), 0);
    }

    #[test]
    fn test_can_encounter_boundary() {
        assert!(can_encounter(0.0));
        assert!(can_encounter(5.0));
        assert!(!can_encounter(5.0001));
    }

    #[test]
    fn test_should_trigger_boundary() {
        assert!(should_trigger_conversation(60));
        assert!(!should_trigger_conversation(59));
    }

    #[test]
    fn test_same_spot_single_shared_tag_stays_below_threshold() {
        let tags = strings(&["nature"]);
        let a = AffinityProfile { tags: &tags, traits: &[], species_id: "mute-swan" };
        let b = AffinityProfile { tags: &tags, traits: &[], species_id: "mute-swan" };
        let result = score(&a, &b, 0.0);
        assert_eq!(
            result.breakdown,
            AffinityBreakdown { tag_match: 8, trait_match: 10, species_affinity: 15, location_bonus: 10 }
        );
        assert_eq!(result.score, 43);
        assert!(result.can_encounter);
        assert!(!should_trigger_conversation(result.score));
    }
}
