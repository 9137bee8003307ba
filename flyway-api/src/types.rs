//! Request and response bodies of the REST API.

use flyway_agents::{EncounterRecord, EncounterSummary, SweepReport};
use flyway_core::{Bird, BirdId, Species};
use flyway_storage::{CascadeSummary, ResetSummary};
use serde::{Deserialize, Serialize};

// ============================================================================
// SWEEPS
// ============================================================================

/// Result of the scheduled full sweep.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CronSweepResponse {
    pub success: bool,
    /// Number of encounters created by this sweep
    pub new_encounters: usize,
    pub encounters: Vec<EncounterSummary>,
    pub total_birds: usize,
    pub checked_pairs: usize,
    pub failed_pairs: usize,
}

impl From<SweepReport> for CronSweepResponse {
    fn from(report: SweepReport) -> Self {
        Self {
            success: true,
            new_encounters: report.new_encounters.len(),
            encounters: report.new_encounters,
            total_birds: report.total_birds,
            checked_pairs: report.checked_pairs,
            failed_pairs: report.failed_pairs,
        }
    }
}

/// Result of an on-demand sweep for the caller's bird.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EncounterCheckResponse {
    pub success: bool,
    pub new_encounters: usize,
    pub encounters: Vec<EncounterSummary>,
}

impl From<SweepReport> for EncounterCheckResponse {
    fn from(report: SweepReport) -> Self {
        Self {
            success: true,
            new_encounters: report.new_encounters.len(),
            encounters: report.new_encounters,
        }
    }
}

// ============================================================================
// HISTORY
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EncounterHistoryResponse {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub bird_id: BirdId,
    pub encounters: Vec<EncounterRecord>,
}

// ============================================================================
// RELATIONSHIPS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RemoveRelationshipRequest {
    /// The bird to drop from the caller's relationships
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub other_bird_id: BirdId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RemoveRelationshipResponse {
    pub success: bool,
    /// Directed edges deleted (0, 1 or 2)
    pub removed: usize,
}

// ============================================================================
// BIRDS AND SPECIES
// ============================================================================

/// Catalog entry for one species.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SpeciesView {
    pub id: String,
    pub name: String,
    pub scientific_name: String,
    pub description: String,
    pub habitat: String,
    pub personality: Vec<String>,
    pub glyph: String,
}

impl From<&Species> for SpeciesView {
    fn from(species: &Species) -> Self {
        Self {
            id: species.id.clone(),
            name: species.name.clone(),
            scientific_name: species.scientific_name.clone(),
            description: species.description.clone(),
            habitat: species.habitat.clone(),
            personality: species.personality.clone(),
            glyph: species.glyph.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SpeciesCatalogResponse {
    pub species: Vec<SpeciesView>,
}

/// The caller's bird with its species card and what it is doing this month.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BirdResponse {
    pub bird: Bird,
    pub species: Option<SpeciesView>,
    pub activity: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ChangeSpeciesRequest {
    pub species_id: String,
}

/// Rows removed together with a bird's social history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ClearedHistory {
    pub encounters: usize,
    pub conversations: usize,
    pub messages: usize,
    pub relationships: usize,
}

impl From<CascadeSummary> for ClearedHistory {
    fn from(summary: CascadeSummary) -> Self {
        Self {
            encounters: summary.encounters,
            conversations: summary.conversations,
            messages: summary.messages,
            relationships: summary.relationships,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ChangeSpeciesResponse {
    pub success: bool,
    pub bird: Bird,
    pub cleared: ClearedHistory,
}

// ============================================================================
// ADMIN
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ResetCounts {
    pub messages: usize,
    pub conversations: usize,
    pub encounters: usize,
    pub relationships: usize,
    pub birds: usize,
}

impl From<ResetSummary> for ResetCounts {
    fn from(summary: ResetSummary) -> Self {
        Self {
            messages: summary.messages,
            conversations: summary.conversations,
            encounters: summary.encounters,
            relationships: summary.relationships,
            birds: summary.birds,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ResetBirdsResponse {
    pub success: bool,
    pub deleted: ResetCounts,
}
