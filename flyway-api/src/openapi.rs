//! OpenAPI Specification for the Flyway API
//!
//! Generated with utoipa from the route annotations and schema derives.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::{ApiError, ErrorCode};
use crate::jobs::EncounterSweepSnapshot;
use crate::routes::health::{
    ConversationCounters, HealthDetails, HealthResponse, HealthStatus, StoreHealth,
};
use crate::routes::{bird, conversations, cron, encounters, health, relationships};
use crate::types::*;

use flyway_agents::{
    AffinityBreakdown, EncounterRecord, EncounterSummary, Transcript,
};
use flyway_agents::history::BirdCard;
use flyway_core::{
    Bird, Conversation, ConversationStatus, Encounter, Location, Message, Relationship,
    RelationshipType,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Flyway API",
        version = "0.1.0",
        description = "Migratory birds that meet by season and talk when they get along",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Encounters", description = "Encounter sweeps and history"),
        (name = "Conversations", description = "Transcripts of bird conversations"),
        (name = "Relationships", description = "Bird-to-bird relationship edges"),
        (name = "Birds", description = "The caller's bird and the species catalog"),
        (name = "Admin", description = "Maintenance endpoints guarded by the cron secret"),
        (name = "Health", description = "Liveness and readiness probes")
    ),
    paths(
        cron::check_encounters,
        cron::reset_birds,
        encounters::check,
        encounters::history,
        conversations::get_conversation,
        relationships::remove_relationship,
        bird::get_bird,
        bird::list_species,
        bird::change_species,
        health::ping,
        health::liveness,
        health::readiness,
    ),
    components(schemas(
        ApiError,
        ErrorCode,
        CronSweepResponse,
        EncounterCheckResponse,
        EncounterHistoryResponse,
        RemoveRelationshipRequest,
        RemoveRelationshipResponse,
        SpeciesView,
        SpeciesCatalogResponse,
        BirdResponse,
        ChangeSpeciesRequest,
        ChangeSpeciesResponse,
        ClearedHistory,
        ResetCounts,
        ResetBirdsResponse,
        EncounterSummary,
        EncounterRecord,
        AffinityBreakdown,
        Transcript,
        BirdCard,
        Bird,
        Location,
        Encounter,
        Conversation,
        ConversationStatus,
        Message,
        Relationship,
        RelationshipType,
        HealthResponse,
        HealthStatus,
        HealthDetails,
        StoreHealth,
        ConversationCounters,
        EncounterSweepSnapshot,
    )),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the bearer scheme used by the cron and admin endpoints.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "cron_secret",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some("FLYWAY_CRON_SECRET"))
                        .build(),
                ),
            );
        }
    }
}

impl ApiDoc {
    /// Pretty-printed JSON document.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}
